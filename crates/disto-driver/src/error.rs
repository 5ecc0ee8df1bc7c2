//! 驱动层错误类型定义

use disto_link::{Characteristic, LinkError};
use disto_protocol::{DistoCommand, ProtocolError};
use thiserror::Error;
use uuid::Uuid;

/// 连接握手错误（终止性，会话不会建立）
#[derive(Error, Debug)]
pub enum ConnectError {
    /// 打开链路或服务发现失败
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// 设备没有提供测量服务
    #[error("Required service {service} not found ({} services advertised)", .available.len())]
    CapabilityMissing { service: Uuid, available: Vec<Uuid> },

    /// 启用通知失败（不支持部分订阅的会话）
    #[error("Failed to enable notifications on {characteristic}: {source}")]
    Subscribe {
        characteristic: Characteristic,
        #[source]
        source: LinkError,
    },
}

/// 命令发送错误（可恢复）
#[derive(Error, Debug)]
pub enum SendError {
    /// 未知命令
    #[error("{0}")]
    UnknownCommand(#[from] ProtocolError),

    /// 链路写入失败
    #[error("Failed to send {command}: {source}")]
    Link {
        command: DistoCommand,
        #[source]
        source: LinkError,
    },
}

impl SendError {
    /// 是否由链路丢失引起
    pub fn is_link_lost(&self) -> bool {
        matches!(self, SendError::Link { source, .. } if source.is_link_lost())
    }
}

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 链路错误（扫描、适配器）
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// 握手失败
    #[error("Connect error: {0}")]
    Connect(#[from] ConnectError),

    /// 扫描结束仍未找到设备
    #[error("No matching device found{}", at_address(.address))]
    DeviceNotFound { address: Option<String> },

    /// 命令发送失败
    #[error("Send error: {0}")]
    Send(#[from] SendError),
}

fn at_address(address: &Option<String>) -> String {
    address
        .as_ref()
        .map(|a| format!(" at {}", a))
        .unwrap_or_default()
}
