//! 客户端接口模块
//!
//! 本模块提供测量周期引擎，包括：
//! - 直接模式 / 定时模式（会话开始时选定）
//! - 周期 ID 分配与校验（防止过期周期污染输出）
//! - 延迟测量过程（开激光 → 延时 → 触发测量 → 超时恢复）
//! - 事件通道（交给展示层）
//!
//! # 使用场景
//!
//! 这是大多数用户应该使用的模块。
//! 如果需要直接收发 GATT 帧，可以使用 `disto-driver` 提供的 [`Session`](disto_driver::Session)。

pub mod config;
mod engine;
mod error;
pub mod event;
pub mod state;

// 重新导出常用类型
pub use config::{DEFAULT_DELAY, EngineConfig, MEASUREMENT_TIMEOUT, MeasurementMode};
pub use engine::{EngineHandle, MeasurementEngine};
pub use error::ClientError;
pub use event::{EngineEvent, EventReceiver};
pub use state::{Cycle, CycleId, CyclePhase, DistanceOutcome, EngineSnapshot, EngineState};
