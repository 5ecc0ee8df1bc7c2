//! 通知负载解析
//!
//! - 距离：4 字节 IEEE-754 单精度浮点数，小端
//! - 单位：首字节为单位代码

use crate::{DistanceUnit, ProtocolError};

/// 距离负载长度
pub const DISTANCE_PAYLOAD_LEN: usize = 4;

/// 测量样本
///
/// 由通知负载解码得到，构造后不可变。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeasurementSample {
    /// 距离值（单位由 `unit_code` 决定）
    pub value: f32,
    /// 单位代码
    pub unit_code: u8,
}

impl MeasurementSample {
    pub fn new(value: f32, unit_code: u8) -> Self {
        Self { value, unit_code }
    }

    /// 单位
    pub fn unit(&self) -> DistanceUnit {
        DistanceUnit::from_code(self.unit_code)
    }
}

impl std::fmt::Display for MeasurementSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3} {}", self.value, self.unit())
    }
}

/// 解析距离负载
///
/// # Errors
/// - `ProtocolError::InvalidLength`: 负载不是 4 字节
///
/// ```rust
/// use disto_protocol::decode_distance;
///
/// assert_eq!(decode_distance(&[0x00, 0x00, 0x40, 0x40]), Ok(3.0));
/// assert!(decode_distance(&[0x00, 0x00]).is_err());
/// ```
pub fn decode_distance(data: &[u8]) -> Result<f32, ProtocolError> {
    let bytes: [u8; DISTANCE_PAYLOAD_LEN] =
        data.try_into().map_err(|_| ProtocolError::InvalidLength {
            expected: DISTANCE_PAYLOAD_LEN,
            actual: data.len(),
        })?;
    Ok(f32::from_le_bytes(bytes))
}

/// 解析单位负载（只读取首字节，多余字节忽略）
///
/// # Errors
/// - `ProtocolError::EmptyPayload`: 负载为空
pub fn decode_unit(data: &[u8]) -> Result<u8, ProtocolError> {
    data.first().copied().ok_or(ProtocolError::EmptyPayload)
}
