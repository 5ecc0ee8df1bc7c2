//! GATT UUID 常量定义
//!
//! UUID 来源于官方 Android 应用的反编译结果，DISTO D1/D110 及兼容设备
//! （STABILA、WDM 系列）共用同一套服务布局。

use crate::ProtocolError;
use uuid::Uuid;

/// DISTO 测量服务
///
/// 设备广播的服务列表中缺少此服务时，连接流程必须终止（`CapabilityMissing`）。
pub const DISTO_SERVICE_UUID: Uuid = Uuid::from_u128(0x3ab10100_f831_4395_b29d_570977d5bf94);

/// 距离值特征（Indicate/Notify，4 字节小端 f32）
pub const DISTANCE_CHAR_UUID: Uuid = Uuid::from_u128(0x3ab10101_f831_4395_b29d_570977d5bf94);

/// 距离单位特征（Indicate/Notify，首字节为单位代码）
pub const DISTANCE_UNIT_CHAR_UUID: Uuid =
    Uuid::from_u128(0x3ab10102_f831_4395_b29d_570977d5bf94);

/// 命令特征（Write，ASCII 指令）
pub const COMMAND_CHAR_UUID: Uuid = Uuid::from_u128(0x3ab10109_f831_4395_b29d_570977d5bf94);

/// 设备名称过滤关键字（大小写不敏感）
pub const DEVICE_NAME_FILTERS: [&str; 3] = ["disto", "stabila", "wdm"];

/// DISTO 服务下的特征
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Characteristic {
    /// 距离值通知
    Distance,
    /// 距离单位通知
    DistanceUnit,
    /// 命令写入
    Command,
}

impl Characteristic {
    /// 特征 UUID
    pub fn uuid(self) -> Uuid {
        match self {
            Characteristic::Distance => DISTANCE_CHAR_UUID,
            Characteristic::DistanceUnit => DISTANCE_UNIT_CHAR_UUID,
            Characteristic::Command => COMMAND_CHAR_UUID,
        }
    }

    /// 根据 UUID 查找特征
    pub fn from_uuid(uuid: Uuid) -> Result<Self, ProtocolError> {
        match uuid {
            DISTANCE_CHAR_UUID => Ok(Characteristic::Distance),
            DISTANCE_UNIT_CHAR_UUID => Ok(Characteristic::DistanceUnit),
            COMMAND_CHAR_UUID => Ok(Characteristic::Command),
            other => Err(ProtocolError::UnknownCharacteristic(other)),
        }
    }

    /// 日志中使用的名称
    pub fn name(self) -> &'static str {
        match self {
            Characteristic::Distance => "DISTANCE",
            Characteristic::DistanceUnit => "DISTANCE_UNIT",
            Characteristic::Command => "COMMAND",
        }
    }
}

impl std::fmt::Display for Characteristic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 判断广播名称是否属于支持的设备
///
/// ```rust
/// use disto_protocol::is_supported_device_name;
///
/// assert!(is_supported_device_name("DISTO 2938471"));
/// assert!(is_supported_device_name("Stabila LD 520"));
/// assert!(!is_supported_device_name("Aranet4 12345"));
/// ```
pub fn is_supported_device_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    DEVICE_NAME_FILTERS
        .iter()
        .any(|pattern| lower.contains(pattern))
}
