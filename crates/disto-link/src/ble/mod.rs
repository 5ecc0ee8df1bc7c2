//! btleplug 后端
//!
//! 基于 btleplug 的跨平台 BLE 链路实现（Linux BlueZ / macOS CoreBluetooth / Windows WinRT）。
//!
//! # 存活信号
//!
//! btleplug 的 `is_connected()` 是异步调用，不适合在命令发送前做快速检查。
//! 这里在 `open()` 时启动一个监听任务，订阅适配器的 `DeviceDisconnected`
//! 事件并更新原子标志，`is_connected()` 只做一次原子读取。

mod scanner;

pub use scanner::{DiscoveredDevice, find_device, scan};

use crate::{
    Characteristic, DistoFrame, LinkAdapter, LinkDeviceError, LinkDeviceErrorKind, LinkError,
    NotificationStream,
};
use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, Characteristic as GattCharacteristic, Peripheral as _, WriteType,
};
use btleplug::platform::{Adapter, Peripheral};
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

impl From<btleplug::Error> for LinkError {
    fn from(err: btleplug::Error) -> Self {
        use btleplug::Error as BleError;

        match err {
            BleError::NotConnected => LinkError::NotConnected,
            BleError::TimedOut(_) => LinkError::Timeout,
            BleError::DeviceNotFound => LinkError::Device(LinkDeviceError::new(
                LinkDeviceErrorKind::NotFound,
                "device not found",
            )),
            BleError::PermissionDenied => LinkError::Device(LinkDeviceError::new(
                LinkDeviceErrorKind::AccessDenied,
                "permission denied",
            )),
            other => LinkError::Device(LinkDeviceError::new(
                LinkDeviceErrorKind::Backend,
                other.to_string(),
            )),
        }
    }
}

/// btleplug 链路适配器
pub struct BleLinkAdapter {
    peripheral: Peripheral,
    central: Adapter,
    name: Option<String>,
    connected: Arc<AtomicBool>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl BleLinkAdapter {
    /// 由扫描结果创建（尚未连接）
    pub fn new(central: Adapter, peripheral: Peripheral, name: Option<String>) -> Self {
        Self {
            peripheral,
            central,
            name,
            connected: Arc::new(AtomicBool::new(false)),
            watcher: Mutex::new(None),
        }
    }

    /// 广播名称
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn find_characteristic(&self, uuid: Uuid) -> Result<GattCharacteristic, LinkError> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid)
            .ok_or(LinkError::CharacteristicMissing(uuid))
    }

    /// 启动断连监听任务
    async fn spawn_watcher(&self) -> Result<(), LinkError> {
        let mut events = self.central.events().await?;
        let id = self.peripheral.id();
        let connected = Arc::clone(&self.connected);

        let handle = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let CentralEvent::DeviceDisconnected(peer) = event {
                    if peer == id {
                        connected.store(false, Ordering::Release);
                        warn!("BLE peripheral disconnected");
                        break;
                    }
                }
            }
        });

        if let Some(previous) = self.watcher.lock().replace(handle) {
            previous.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl LinkAdapter for BleLinkAdapter {
    fn address(&self) -> String {
        self.peripheral.address().to_string()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn open(&self) -> Result<(), LinkError> {
        info!(
            "Connecting to {} ({})",
            self.name.as_deref().unwrap_or("<unnamed>"),
            self.address()
        );
        self.peripheral.connect().await?;
        self.connected.store(true, Ordering::Release);
        self.spawn_watcher().await
    }

    async fn discover_services(&self) -> Result<Vec<Uuid>, LinkError> {
        self.peripheral.discover_services().await?;
        let services: Vec<Uuid> = self.peripheral.services().iter().map(|s| s.uuid).collect();
        debug!("Discovered {} services", services.len());
        Ok(services)
    }

    async fn subscribe(&self, characteristic: Characteristic) -> Result<(), LinkError> {
        let gatt = self.find_characteristic(characteristic.uuid())?;
        self.peripheral.subscribe(&gatt).await?;
        debug!("Subscribed to {}", characteristic);
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
        let gatt = self.find_characteristic(characteristic.uuid())?;
        self.peripheral
            .write(&gatt, payload, WriteType::WithResponse)
            .await?;
        trace!("Wrote {:?} to {}", payload, characteristic);
        Ok(())
    }

    async fn notifications(&self) -> Result<NotificationStream, LinkError> {
        let stream = self.peripheral.notifications().await?;
        let frames = stream.filter_map(|notification| {
            let frame = match Characteristic::from_uuid(notification.uuid) {
                Ok(characteristic) => Some(DistoFrame::new(characteristic, &notification.value)),
                Err(e) => {
                    trace!("Ignoring notification: {}", e);
                    None
                },
            };
            futures::future::ready(frame)
        });
        Ok(Box::pin(frames))
    }

    async fn close(&self) -> Result<(), LinkError> {
        if let Some(watcher) = self.watcher.lock().take() {
            watcher.abort();
        }
        let was_connected = self.connected.swap(false, Ordering::AcqRel);
        if was_connected {
            self.peripheral.disconnect().await?;
            info!("Disconnected from {}", self.address());
        }
        Ok(())
    }
}

impl Drop for BleLinkAdapter {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.get_mut().take() {
            watcher.abort();
        }
    }
}
