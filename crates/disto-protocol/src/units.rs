//! 距离单位
//!
//! 单位代码只用于显示标签，不做任何换算。

use std::fmt;

/// 距离单位
///
/// | 代码 | 单位 |
/// |------|------|
/// | 0 | m |
/// | 1 | ft |
/// | 2 | in |
/// | 3, 4, 5 | mm |
/// | 6 | yd |
/// | 7, 8, 9 | ft+in |
///
/// 设备对同一单位有多个代码（显示精度不同），这里统一归并。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DistanceUnit {
    /// 默认单位（代码 0）
    #[default]
    Meter,
    Foot,
    Inch,
    Millimeter,
    Yard,
    FootInch,
    /// 未收录的单位代码
    Unknown(u8),
}

impl DistanceUnit {
    /// 从单位代码转换
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => DistanceUnit::Meter,
            1 => DistanceUnit::Foot,
            2 => DistanceUnit::Inch,
            3..=5 => DistanceUnit::Millimeter,
            6 => DistanceUnit::Yard,
            7..=9 => DistanceUnit::FootInch,
            other => DistanceUnit::Unknown(other),
        }
    }

    /// 已知单位的标签；未知单位返回 `None`
    pub fn symbol(self) -> Option<&'static str> {
        match self {
            DistanceUnit::Meter => Some("m"),
            DistanceUnit::Foot => Some("ft"),
            DistanceUnit::Inch => Some("in"),
            DistanceUnit::Millimeter => Some("mm"),
            DistanceUnit::Yard => Some("yd"),
            DistanceUnit::FootInch => Some("ft+in"),
            DistanceUnit::Unknown(_) => None,
        }
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceUnit::Unknown(code) => write!(f, "unknown({})", code),
            known => f.write_str(known.symbol().unwrap_or("?")),
        }
    }
}
