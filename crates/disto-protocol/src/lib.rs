//! # DISTO Protocol
//!
//! 激光测距仪 BLE GATT 协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `ids`: GATT 服务/特征 UUID 常量
//! - `control`: 命令词表（ASCII 指令）
//! - `feedback`: 通知负载解析（距离、单位）
//! - `units`: 单位代码与显示标签
//!
//! ## 字节序
//!
//! 距离值为 IEEE-754 单精度浮点数，小端字节序（Little Endian）。
//! 与大多数 BLE 设备一致，本模块不做额外的字节序转换。

pub mod control;
pub mod feedback;
pub mod ids;
pub mod units;

// 重新导出常用类型
pub use control::*;
pub use feedback::*;
pub use ids::*;
pub use units::*;

use thiserror::Error;

/// 通知帧负载的最大长度
///
/// BLE 默认 ATT MTU 为 23 字节，扣除 3 字节头部后单次通知最多 20 字节。
pub const MAX_PAYLOAD_LEN: usize = 20;

/// BLE 通知帧的统一抽象
///
/// # 设计目的
///
/// `DistoFrame` 是协议层和链路层之间的中间抽象：
/// - **层次解耦**：协议层不依赖具体 BLE 实现（btleplug/Mock）
/// - **统一接口**：上层通过 `LinkAdapter` 的通知流获得统一的帧类型
/// - **无堆分配**：固定 20 字节缓冲区，`Copy` 语义
///
/// # 在架构中的位置
///
/// ```text
/// Protocol Layer (disto-protocol)
///     ↓ decode_distance() / decode_unit()
/// DistoFrame (此类型)
///     ↓ 转换逻辑在链路层实现
/// Link Layer (disto-link)
///     ↓ btleplug / Mock 适配器
/// Hardware
/// ```
///
/// # 转换示例
///
/// ```rust
/// use disto_protocol::{Characteristic, DistoFrame};
///
/// let frame = DistoFrame::new(Characteristic::Distance, &[0x00, 0x00, 0x40, 0x40]);
/// assert_eq!(frame.characteristic(), Characteristic::Distance);
/// assert_eq!(frame.data_slice(), &[0x00, 0x00, 0x40, 0x40]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistoFrame {
    /// 来源特征
    pub characteristic: Characteristic,

    /// 负载数据（固定 20 字节，未使用部分为 0）
    pub data: [u8; MAX_PAYLOAD_LEN],

    /// 原始负载长度
    ///
    /// 可能大于 `MAX_PAYLOAD_LEN`（超长负载被截断，但长度保留用于校验）。
    pub len: u16,
}

impl DistoFrame {
    /// 从原始通知负载创建帧
    pub fn new(characteristic: Characteristic, data: &[u8]) -> Self {
        let mut fixed_data = [0u8; MAX_PAYLOAD_LEN];
        let copied = data.len().min(MAX_PAYLOAD_LEN);
        fixed_data[..copied].copy_from_slice(&data[..copied]);

        Self {
            characteristic,
            data: fixed_data,
            len: data.len().min(u16::MAX as usize) as u16,
        }
    }

    /// 距离通知帧（小端 f32）
    pub fn distance(value: f32) -> Self {
        Self::new(Characteristic::Distance, &value.to_le_bytes())
    }

    /// 单位通知帧
    pub fn unit(code: u8) -> Self {
        Self::new(Characteristic::DistanceUnit, &[code])
    }

    /// 获取来源特征
    pub fn characteristic(&self) -> Characteristic {
        self.characteristic
    }

    /// 获取数据切片（只包含有效数据）
    pub fn data_slice(&self) -> &[u8] {
        &self.data[..(self.len as usize).min(MAX_PAYLOAD_LEN)]
    }

    /// 原始负载长度
    pub fn payload_len(&self) -> usize {
        self.len as usize
    }
}

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid payload length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Empty payload")]
    EmptyPayload,

    #[error("Unknown command: {0:?}")]
    UnknownCommand(String),

    #[error("Unknown characteristic: {0}")]
    UnknownCharacteristic(uuid::Uuid),
}
