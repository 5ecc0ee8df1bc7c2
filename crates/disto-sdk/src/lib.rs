//! DISTO SDK - BLE 激光测距仪 Rust SDK
//!
//! 连接 Leica DISTO（以及 STABILA、WDM 等兼容设备），遵守固件要求的握手时序，
//! 并把异步的硬件通知还原为一次次完整的用户测量。
//!
//! # 架构设计
//!
//! 本 SDK 采用分层架构，从底层到高层：
//!
//! - **协议层** (`protocol`): GATT UUID、命令词表、负载解析
//! - **链路层** (`link`): BLE 链路抽象，btleplug 后端与 Mock
//! - **驱动层** (`driver`): 握手时序、会话、命令发送
//! - **客户端层** (`client`): 测量周期引擎（直接模式 / 定时模式）
//!
//! # 快速开始
//!
//! ```no_run
//! use disto_sdk::prelude::*;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! disto_sdk::init_logger();
//!
//! let session = DistoBuilder::new().connect().await?;
//! let (handle, mut events) = MeasurementEngine::new(EngineConfig::timer()).spawn(session)?;
//!
//! while let Some(event) = events.recv().await {
//!     if let EngineEvent::Finalized { sample, .. } = event {
//!         println!("{}", sample);
//!     }
//! }
//! handle.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod logging;
pub mod prelude;

// 分层模块：通过模块路径访问完整 API
pub use disto_client as client;
pub use disto_driver as driver;
pub use disto_link as link;
pub use disto_protocol as protocol;

// --- 用户以此为界 ---
// 以下是通过 Facade Pattern 提供的公共 API

// 协议层
pub use protocol::{DistanceUnit, DistoCommand, MeasurementSample, ProtocolError};

// 链路层
pub use link::{LinkAdapter, LinkError, ScanOptions};

// 驱动层
pub use driver::{ConnectError, DistoBuilder, DriverError, SendError, Session};

// 客户端层（推荐入口）
pub use client::{
    ClientError, EngineConfig, EngineEvent, EngineHandle, EventReceiver, MeasurementEngine,
    MeasurementMode,
};

// 日志
pub use logging::{init_logger, init_logger_with};
