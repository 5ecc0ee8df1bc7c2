//! 测量引擎配置

use crate::error::ClientError;
use std::time::Duration;

/// 按下按键后、触发精确测量前的默认延时（供用户重新瞄准）
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// 触发测量后等待结果的超时时间
pub const MEASUREMENT_TIMEOUT: Duration = Duration::from_secs(3);

/// 工作模式（会话开始时选定，之后不变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeasurementMode {
    /// 每个距离通知立即作为最终测量值
    Direct,
    /// 两阶段周期：按键 → 开激光 → 延时 → 触发测量 → 最终值
    #[default]
    Timer,
}

impl std::fmt::Display for MeasurementMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeasurementMode::Direct => write!(f, "direct"),
            MeasurementMode::Timer => write!(f, "timer"),
        }
    }
}

/// 测量引擎配置
///
/// # Example
///
/// ```
/// use disto_client::{EngineConfig, MeasurementMode};
/// use std::time::Duration;
///
/// let config = EngineConfig::default().with_delay_secs(2.5).unwrap();
/// assert_eq!(config.mode, MeasurementMode::Timer);
/// assert_eq!(config.delay, Duration::from_millis(2500));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub mode: MeasurementMode,
    /// 开激光到触发测量之间的延时 D
    pub delay: Duration,
    /// 触发测量后的超时 T
    pub timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: MeasurementMode::Timer,
            delay: DEFAULT_DELAY,
            timeout: MEASUREMENT_TIMEOUT,
        }
    }
}

impl EngineConfig {
    /// 直接模式
    pub fn direct() -> Self {
        Self::default().with_mode(MeasurementMode::Direct)
    }

    /// 定时模式（默认延时）
    pub fn timer() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: MeasurementMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// 以秒为单位设置延时
    ///
    /// 负数、NaN、无穷大都会被拒绝。
    pub fn with_delay_secs(self, secs: f64) -> Result<Self, ClientError> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(ClientError::InvalidDelay(secs));
        }
        Duration::try_from_secs_f64(secs)
            .map(|delay| self.with_delay(delay))
            .map_err(|_| ClientError::InvalidDelay(secs))
    }

    /// 覆盖超时（仅用于模拟链路测试，真实设备使用固定的 3 秒）
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
