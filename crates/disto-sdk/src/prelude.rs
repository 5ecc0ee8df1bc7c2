//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use disto_sdk::prelude::*;
//! ```

// 客户端层（推荐使用）
pub use crate::client::{
    CycleId, EngineConfig, EngineEvent, EngineHandle, EngineSnapshot, EventReceiver,
    MeasurementEngine, MeasurementMode,
};

// 驱动层
pub use crate::driver::{DistoBuilder, HandshakeTiming, Session};

// 链路层（常用 Trait）
pub use crate::link::{LinkAdapter, ScanOptions};

// 协议层
pub use crate::protocol::{DistanceUnit, DistoCommand, MeasurementSample};

// 错误类型
pub use crate::client::ClientError;
pub use crate::driver::{ConnectError, DriverError, SendError};
pub use crate::link::LinkError;
pub use crate::protocol::ProtocolError;
