//! 测量引擎
//!
//! 两类任务共享同一个 `EngineContext`：
//!
//! - 通知循环：按到达顺序消费会话的通知流（唯一）
//! - 延迟测量任务：每个周期一个，按周期 ID 标记
//!
//! 状态只在 `parking_lot::Mutex` 的短临界区内修改，锁从不跨越 `.await`。
//! 延迟任务在每个恢复点重新检查自己的周期 ID 是否仍是当前周期，
//! 旧任务不会被主动取消，ID 检查就是唯一的裁决。

use crate::config::{EngineConfig, MeasurementMode};
use crate::error::ClientError;
use crate::event::{EngineEvent, EventReceiver};
use crate::state::{CycleId, DistanceOutcome, EngineSnapshot, EngineState};
use disto_driver::{CommandDispatcher, SendError, Session};
use disto_link::{Characteristic, DistoFrame, LinkAdapter, LinkError, NotificationStream};
use disto_protocol::{DistoCommand, decode_distance, decode_unit};
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// 引擎共享上下文
struct EngineContext<L: ?Sized> {
    config: EngineConfig,
    dispatcher: CommandDispatcher<L>,
    state: Mutex<EngineState>,
    events: UnboundedSender<EngineEvent>,
}

/// 发送结果
enum Issued {
    Sent,
    /// 暂时性失败（已上报），过程继续，超时保证最终恢复
    Failed,
    /// 链路丢失，周期已清理
    Abandoned,
}

impl<L> EngineContext<L>
where
    L: LinkAdapter + ?Sized + 'static,
{
    fn emit(&self, event: EngineEvent) {
        if self.events.send(event).is_err() {
            trace!("Event receiver dropped");
        }
    }

    fn handle_frame(self: &Arc<Self>, frame: DistoFrame) {
        match frame.characteristic() {
            Characteristic::Distance => self.handle_distance(&frame),
            Characteristic::DistanceUnit => self.handle_unit(frame.data_slice()),
            Characteristic::Command => trace!("Ignoring notification on COMMAND characteristic"),
        }
    }

    fn handle_unit(&self, payload: &[u8]) {
        let code = decode_unit(payload).unwrap_or_else(|e| {
            warn!("Unit decode failed: {}, assuming code 0", e);
            0
        });
        self.state.lock().on_unit(code);
        debug!("Unit code: {}", code);
        self.emit(EngineEvent::UnitChanged { unit_code: code });
    }

    fn handle_distance(self: &Arc<Self>, frame: &DistoFrame) {
        let value = match decode_distance(frame.data_slice()) {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    "Distance decode failed: {} ({} bytes received), treating as 0.0",
                    e,
                    frame.payload_len()
                );
                self.emit(EngineEvent::DecodeWarning {
                    characteristic: Characteristic::Distance,
                    len: frame.payload_len(),
                });
                0.0
            },
        };

        let outcome = self.state.lock().on_distance(value);
        match outcome {
            DistanceOutcome::Direct(sample) => {
                debug!("Direct measurement: {}", sample);
                self.emit(EngineEvent::Finalized {
                    sample,
                    cycle: None,
                });
            },
            DistanceOutcome::Started { cycle, sample } => {
                debug!("Cycle {} started (button reading {})", cycle, sample);
                self.emit(EngineEvent::ButtonPressed { cycle, sample });

                let task = tokio::spawn(run_cycle(Arc::clone(self), cycle));
                let orphan = self.state.lock().attach_task(cycle, task);
                if orphan.is_some() {
                    trace!("Cycle {} retired before its task was attached", cycle);
                }
            },
            DistanceOutcome::Finalized { cycle, sample } => {
                debug!("Cycle {} finalized: {}", cycle, sample);
                self.emit(EngineEvent::Finalized {
                    sample,
                    cycle: Some(cycle),
                });
            },
            DistanceOutcome::Ignored { cycle } => {
                debug!("Ignoring distance {} while cycle {} is pending", value, cycle);
            },
        }
    }

    /// 清理周期并上报链路丢失
    fn lose_link(&self, cycle: CycleId) {
        let retired = self.state.lock().retire(cycle);
        if retired.is_some() {
            warn!("Connection lost during cycle {}", cycle);
            self.emit(EngineEvent::LinkLost { cycle });
        }
    }

    /// 延迟测量过程中的命令发送
    async fn issue(&self, cycle: CycleId, command: DistoCommand) -> Issued {
        match self.dispatcher.send(command).await {
            Ok(()) => Issued::Sent,
            Err(e) if e.is_link_lost() => {
                self.lose_link(cycle);
                Issued::Abandoned
            },
            Err(e) => {
                error!("Cycle {}: {}", cycle, e);
                self.emit(EngineEvent::CommandFailed {
                    command,
                    error: e.to_string(),
                });
                Issued::Failed
            },
        }
    }
}

/// 延迟测量过程（每个周期一次）
///
/// 1. 链路已断开 → 清理，上报 `LinkLost`
/// 2. 打开激光
/// 3. 等待 D
/// 4. 不再是当前周期 → 静默退出；链路已断开 → 清理，上报 `LinkLost`
/// 5. 发送测量命令
/// 6. 等待 T
/// 7. 仍在等待本周期 → 清理，上报 `MeasurementTimeout`
async fn run_cycle<L>(ctx: Arc<EngineContext<L>>, cycle: CycleId)
where
    L: LinkAdapter + ?Sized + 'static,
{
    if !ctx.dispatcher.is_connected() {
        ctx.lose_link(cycle);
        return;
    }

    match ctx.issue(cycle, DistoCommand::LaserOn).await {
        Issued::Sent => ctx.emit(EngineEvent::LaserActivated { cycle }),
        Issued::Failed => {},
        Issued::Abandoned => return,
    }

    tokio::time::sleep(ctx.config.delay).await;

    if !ctx.state.lock().is_current(cycle) {
        debug!("Cycle {} superseded, abandoning", cycle);
        return;
    }
    if !ctx.dispatcher.is_connected() {
        ctx.lose_link(cycle);
        return;
    }

    // 先标记再发送：测量结果可能在写入返回之前到达
    let armed = ctx.state.lock().arm(cycle);
    if !armed {
        return;
    }
    ctx.emit(EngineEvent::MeasureTriggered { cycle });
    if let Issued::Abandoned = ctx.issue(cycle, DistoCommand::Measure).await {
        return;
    }

    tokio::time::sleep(ctx.config.timeout).await;

    let retired = ctx.state.lock().retire(cycle);
    if retired.is_some() {
        warn!("Timeout - no measurement received for cycle {}, resetting", cycle);
        ctx.emit(EngineEvent::MeasurementTimeout { cycle });
    }
}

async fn notification_loop<L>(ctx: Arc<EngineContext<L>>, mut notifications: NotificationStream)
where
    L: LinkAdapter + ?Sized + 'static,
{
    while let Some(frame) = notifications.next().await {
        trace!("Notification on {}: {:?}", frame.characteristic(), frame.data_slice());
        ctx.handle_frame(frame);
    }
    info!("Notification stream ended");
    ctx.emit(EngineEvent::Disconnected);
}

/// 测量引擎
///
/// # Example
///
/// ```no_run
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// use disto_client::{EngineConfig, EngineEvent, MeasurementEngine};
/// use disto_driver::DistoBuilder;
///
/// let session = DistoBuilder::new().connect().await?;
/// let (handle, mut events) = MeasurementEngine::new(EngineConfig::timer()).spawn(session)?;
///
/// while let Some(event) = events.recv().await {
///     if let EngineEvent::Finalized { sample, .. } = event {
///         println!("{}", sample);
///     }
/// }
/// handle.shutdown().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MeasurementEngine {
    config: EngineConfig,
}

impl MeasurementEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 在会话上启动引擎
    ///
    /// 需要在 tokio 运行时中调用。会话的通知流会被取走。
    pub fn spawn<L>(
        self,
        mut session: Session<L>,
    ) -> Result<(EngineHandle<L>, EventReceiver), ClientError>
    where
        L: LinkAdapter + ?Sized + 'static,
    {
        let notifications = session
            .take_notifications()
            .ok_or(ClientError::NotificationsTaken)?;
        let (tx, rx) = unbounded_channel();

        let ctx = Arc::new(EngineContext {
            config: self.config,
            dispatcher: session.dispatcher().clone(),
            state: Mutex::new(EngineState::new(self.config.mode)),
            events: tx,
        });

        let notification_task = tokio::spawn(notification_loop(Arc::clone(&ctx), notifications));
        info!(
            "Measurement engine started ({} mode, delay {:?})",
            self.config.mode, self.config.delay
        );

        Ok((
            EngineHandle {
                ctx,
                session,
                notification_task,
            },
            rx,
        ))
    }
}

/// 引擎句柄
///
/// 持有会话；丢弃句柄会取消进行中的周期，但不会断开链路，
/// 断开请调用 [`shutdown`](Self::shutdown)。
pub struct EngineHandle<L: ?Sized> {
    ctx: Arc<EngineContext<L>>,
    session: Session<L>,
    notification_task: JoinHandle<()>,
}

impl<L> EngineHandle<L>
where
    L: LinkAdapter + ?Sized + 'static,
{
    pub fn config(&self) -> &EngineConfig {
        &self.ctx.config
    }

    pub fn mode(&self) -> MeasurementMode {
        self.ctx.config.mode
    }

    /// 直接发送命令（不影响周期状态）
    pub async fn send(&self, command: DistoCommand) -> Result<(), SendError> {
        self.ctx.dispatcher.send(command).await
    }

    /// 按命令字或命令名发送
    pub async fn send_token(&self, token: &str) -> Result<DistoCommand, SendError> {
        self.ctx.dispatcher.send_token(token).await
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.ctx.state.lock().snapshot()
    }

    /// 链路存活信号
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    pub fn address(&self) -> String {
        self.session.address()
    }

    /// 停止引擎并断开链路
    ///
    /// 清空周期状态、中止通知循环和延迟任务，然后关闭会话。
    pub async fn shutdown(self) -> Result<(), LinkError> {
        self.notification_task.abort();
        let cycle = self.ctx.state.lock().reset();
        if let Some(cycle) = cycle {
            debug!("Dropping cycle {} on shutdown", cycle.id);
            if let Some(task) = cycle.task {
                task.abort();
            }
        }
        self.session.close().await
    }
}

impl<L: ?Sized> Drop for EngineHandle<L> {
    fn drop(&mut self) {
        self.notification_task.abort();
        let cycle = self.ctx.state.lock().reset();
        if let Some(task) = cycle.and_then(|cycle| cycle.task) {
            task.abort();
        }
    }
}
