//! 驱动层模块
//!
//! 本模块提供激光测距仪的会话管理功能，包括：
//! - 连接握手（服务检查 + 固件要求的订阅时序）
//! - 命令发送（不排队、不重试）
//! - 会话生命周期（建立、通知流、关闭）
//!
//! # 使用场景
//!
//! 适用于需要直接收发 GATT 帧的场景。
//! 大多数用户应该使用 `disto-client` 提供的测量引擎。

mod builder;
pub mod dispatcher;
mod error;
pub mod sequencer;
mod session;

pub use builder::DistoBuilder;
pub use dispatcher::CommandDispatcher;
pub use error::{ConnectError, DriverError, SendError};
pub use sequencer::{HandshakeTiming, INTER_SUBSCRIBE_DELAY, SETTLE_DELAY, handshake};
pub use session::Session;
