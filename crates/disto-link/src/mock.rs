//! Mock 链路
//!
//! 无硬件依赖的内存链路，用于测试握手时序和测量周期。
//! 所有操作都带 `tokio::time::Instant` 时间戳，配合暂停时钟
//! （`#[tokio::test(start_paused = true)]`）可以精确断言时序。
//!
//! `MockLinkAdapter` 可以廉价克隆，克隆体共享同一份内部状态：
//! 一份交给会话，另一份留在测试中注入通知、切换存活状态、检查已发送命令。

use crate::{Characteristic, DistoFrame, LinkAdapter, LinkDeviceError, LinkDeviceErrorKind};
use crate::{LinkError, NotificationStream};
use async_trait::async_trait;
use disto_protocol::DISTO_SERVICE_UUID;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::time::Instant;
use uuid::Uuid;

/// Mock 链路操作类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperationKind {
    Open,
    DiscoverServices,
    Subscribe(Characteristic),
    Write {
        characteristic: Characteristic,
        payload: Vec<u8>,
    },
    Close,
}

/// 带时间戳的链路操作记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockOperation {
    pub at: Instant,
    pub kind: MockOperationKind,
}

struct MockInner {
    address: String,
    services: Mutex<Vec<Uuid>>,
    connected: AtomicBool,
    fail_open: AtomicBool,
    fail_writes: AtomicBool,
    fail_subscribe: Mutex<Option<Characteristic>>,
    subscribed: Mutex<Vec<Characteristic>>,
    pushed_on_subscribe: Mutex<Vec<DistoFrame>>,
    operations: Mutex<Vec<MockOperation>>,
    tx: Mutex<Option<UnboundedSender<DistoFrame>>>,
    rx: Mutex<Option<UnboundedReceiver<DistoFrame>>>,
}

/// 内存模拟链路
#[derive(Clone)]
pub struct MockLinkAdapter {
    inner: Arc<MockInner>,
}

impl Default for MockLinkAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLinkAdapter {
    /// 创建提供 DISTO 服务的模拟设备
    pub fn new() -> Self {
        Self::with_services(vec![DISTO_SERVICE_UUID])
    }

    /// 创建提供指定服务的模拟设备
    pub fn with_services(services: Vec<Uuid>) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            inner: Arc::new(MockInner {
                address: "00:11:22:33:44:55".to_string(),
                services: Mutex::new(services),
                connected: AtomicBool::new(false),
                fail_open: AtomicBool::new(false),
                fail_writes: AtomicBool::new(false),
                fail_subscribe: Mutex::new(None),
                subscribed: Mutex::new(Vec::new()),
                pushed_on_subscribe: Mutex::new(Vec::new()),
                operations: Mutex::new(Vec::new()),
                tx: Mutex::new(Some(tx)),
                rx: Mutex::new(Some(rx)),
            }),
        }
    }

    /// 让 `open()` 失败
    pub fn set_fail_open(&self, fail: bool) {
        self.inner.fail_open.store(fail, Ordering::SeqCst);
    }

    /// 让所有写操作失败（链路保持连接）
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// 让指定特征的订阅失败
    pub fn fail_subscribe(&self, characteristic: Characteristic) {
        *self.inner.fail_subscribe.lock() = Some(characteristic);
    }

    /// 订阅指定特征时立即推送一帧（模拟设备在启用通知后推送当前值）
    pub fn push_on_subscribe(&self, characteristic: Characteristic, payload: &[u8]) {
        self.inner
            .pushed_on_subscribe
            .lock()
            .push(DistoFrame::new(characteristic, payload));
    }

    /// 切换存活信号（不关闭通知流）
    pub fn set_connected(&self, connected: bool) {
        self.inner.connected.store(connected, Ordering::SeqCst);
    }

    /// 注入一帧通知
    ///
    /// 只有已订阅的特征、并且通知流已被取走时才会交付，返回是否交付成功。
    /// 与真实后端一致：取流之前到达的通知会丢失。
    pub fn inject(&self, frame: DistoFrame) -> bool {
        if !self.inner.subscribed.lock().contains(&frame.characteristic) {
            return false;
        }
        if self.inner.rx.lock().is_some() {
            return false;
        }
        match self.inner.tx.lock().as_ref() {
            Some(tx) => tx.send(frame).is_ok(),
            None => false,
        }
    }

    /// 注入距离通知
    pub fn inject_distance(&self, value: f32) -> bool {
        self.inject(DistoFrame::distance(value))
    }

    /// 注入单位通知
    pub fn inject_unit(&self, code: u8) -> bool {
        self.inject(DistoFrame::unit(code))
    }

    /// 注入原始负载（用于畸形负载测试）
    pub fn inject_raw(&self, characteristic: Characteristic, payload: &[u8]) -> bool {
        self.inject(DistoFrame::new(characteristic, payload))
    }

    /// 结束通知流（模拟链路断开后通知停止）
    pub fn end_notifications(&self) {
        self.inner.tx.lock().take();
    }

    /// 全部操作记录
    pub fn operations(&self) -> Vec<MockOperation> {
        self.inner.operations.lock().clone()
    }

    /// 已订阅的特征（按订阅顺序）
    pub fn subscriptions(&self) -> Vec<Characteristic> {
        self.inner.subscribed.lock().clone()
    }

    /// 成功写入 `COMMAND` 特征的负载及时间
    pub fn sent_commands(&self) -> Vec<(Vec<u8>, Instant)> {
        self.inner
            .operations
            .lock()
            .iter()
            .filter_map(|op| match &op.kind {
                MockOperationKind::Write {
                    characteristic: Characteristic::Command,
                    payload,
                } => Some((payload.clone(), op.at)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, kind: MockOperationKind) {
        self.inner.operations.lock().push(MockOperation {
            at: Instant::now(),
            kind,
        });
    }
}

#[async_trait]
impl LinkAdapter for MockLinkAdapter {
    fn address(&self) -> String {
        self.inner.address.clone()
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    async fn open(&self) -> Result<(), LinkError> {
        if self.inner.fail_open.load(Ordering::SeqCst) {
            return Err(LinkError::Device(LinkDeviceError::new(
                LinkDeviceErrorKind::NotFound,
                "mock device unreachable",
            )));
        }
        self.inner.connected.store(true, Ordering::SeqCst);
        self.record(MockOperationKind::Open);
        Ok(())
    }

    async fn discover_services(&self) -> Result<Vec<Uuid>, LinkError> {
        if !self.is_connected() {
            return Err(LinkError::NotConnected);
        }
        self.record(MockOperationKind::DiscoverServices);
        Ok(self.inner.services.lock().clone())
    }

    async fn subscribe(&self, characteristic: Characteristic) -> Result<(), LinkError> {
        if !self.is_connected() {
            return Err(LinkError::NotConnected);
        }
        if *self.inner.fail_subscribe.lock() == Some(characteristic) {
            return Err(LinkError::CharacteristicMissing(characteristic.uuid()));
        }
        self.inner.subscribed.lock().push(characteristic);
        self.record(MockOperationKind::Subscribe(characteristic));

        let pushed: Vec<DistoFrame> = self
            .inner
            .pushed_on_subscribe
            .lock()
            .iter()
            .filter(|frame| frame.characteristic == characteristic)
            .copied()
            .collect();
        for frame in pushed {
            self.inject(frame);
        }
        Ok(())
    }

    async fn write(
        &self,
        characteristic: Characteristic,
        payload: &[u8],
    ) -> Result<(), LinkError> {
        if !self.is_connected() {
            return Err(LinkError::NotConnected);
        }
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(LinkError::Device(LinkDeviceError::new(
                LinkDeviceErrorKind::Backend,
                "injected write failure",
            )));
        }
        self.record(MockOperationKind::Write {
            characteristic,
            payload: payload.to_vec(),
        });
        Ok(())
    }

    async fn notifications(&self) -> Result<NotificationStream, LinkError> {
        let rx = self
            .inner
            .rx
            .lock()
            .take()
            .ok_or(LinkError::NotificationsTaken)?;
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|frame| (frame, rx))
        });
        Ok(Box::pin(stream))
    }

    async fn close(&self) -> Result<(), LinkError> {
        self.inner.connected.store(false, Ordering::SeqCst);
        self.inner.tx.lock().take();
        self.record(MockOperationKind::Close);
        Ok(())
    }
}
