//! # DISTO Link Layer
//!
//! BLE 链路抽象层，提供统一的链路接口抽象。
//!
//! - [`LinkAdapter`]: 打开链路、服务发现、订阅通知、写命令、存活信号
//! - `ble`: btleplug 后端与设备扫描（feature `ble`）
//! - `mock`: 内存模拟链路（feature `mock`）

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;
use uuid::Uuid;

// 重新导出 disto-protocol 中的帧类型
pub use disto_protocol::{Characteristic, DistoFrame};

#[cfg(feature = "ble")]
pub mod ble;

#[cfg(feature = "ble")]
pub use ble::{BleLinkAdapter, DiscoveredDevice};

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockLinkAdapter, MockOperation, MockOperationKind};

mod scan;
pub use scan::{DEFAULT_SCAN_TIMEOUT, ScanOptions};

/// 链路层统一错误类型
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] LinkDeviceError),
    #[error("Operation timeout")]
    Timeout,
    #[error("Link not connected")]
    NotConnected,
    #[error("Characteristic not found: {0}")]
    CharacteristicMissing(Uuid),
    #[error("Notification stream already taken")]
    NotificationsTaken,
}

impl LinkError {
    /// 是否意味着链路已经不可用
    ///
    /// 延迟测量流程据此把发送失败转换为 `LinkLost`。
    pub fn is_link_lost(&self) -> bool {
        match self {
            LinkError::NotConnected => true,
            LinkError::Device(e) => e.is_fatal(),
            _ => false,
        }
    }
}

/// 设备/后端错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDeviceErrorKind {
    Unknown,
    NotFound,
    AdapterUnavailable,
    AccessDenied,
    Disconnected,
    Unsupported,
    InvalidResponse,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct LinkDeviceError {
    pub kind: LinkDeviceErrorKind,
    pub message: String,
}

impl LinkDeviceError {
    pub fn new(kind: LinkDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            LinkDeviceErrorKind::NotFound
                | LinkDeviceErrorKind::AdapterUnavailable
                | LinkDeviceErrorKind::AccessDenied
                | LinkDeviceErrorKind::Disconnected
        )
    }
}

impl From<String> for LinkDeviceError {
    fn from(message: String) -> Self {
        Self::new(LinkDeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for LinkDeviceError {
    fn from(message: &str) -> Self {
        Self::new(LinkDeviceErrorKind::Unknown, message)
    }
}

/// 通知流（按到达顺序交付，不重排）
pub type NotificationStream = Pin<Box<dyn Stream<Item = DistoFrame> + Send>>;

/// 链路适配器
///
/// 一个实例对应一个已解析地址的设备。所有方法都以 `&self` 调用，
/// 以便驱动层把同一个实例通过 `Arc` 同时交给通知处理和命令发送。
#[async_trait]
pub trait LinkAdapter: Send + Sync {
    /// 设备标识（地址或平台 ID），用于日志
    fn address(&self) -> String;

    /// 存活信号
    ///
    /// 断开后返回 false。实现必须是非阻塞的（原子读取）。
    fn is_connected(&self) -> bool;

    /// 建立链路
    async fn open(&self) -> Result<(), LinkError>;

    /// 服务发现，返回设备提供的服务 UUID 列表
    async fn discover_services(&self) -> Result<Vec<Uuid>, LinkError>;

    /// 启用特征通知
    async fn subscribe(&self, characteristic: Characteristic) -> Result<(), LinkError>;

    /// 写入特征（带响应）
    async fn write(&self, characteristic: Characteristic, payload: &[u8])
    -> Result<(), LinkError>;

    /// 获取通知流
    ///
    /// 每个链路只能获取一次，重复调用返回 `LinkError::NotificationsTaken`。
    async fn notifications(&self) -> Result<NotificationStream, LinkError>;

    /// 关闭链路
    async fn close(&self) -> Result<(), LinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_error_display() {
        assert_eq!(LinkError::NotConnected.to_string(), "Link not connected");
        assert_eq!(LinkError::Timeout.to_string(), "Operation timeout");

        let err = LinkError::Device(LinkDeviceError::new(
            LinkDeviceErrorKind::AdapterUnavailable,
            "no adapter",
        ));
        assert_eq!(err.to_string(), "Device Error: AdapterUnavailable: no adapter");
    }

    #[test]
    fn test_link_lost_classification() {
        assert!(LinkError::NotConnected.is_link_lost());
        assert!(
            LinkError::Device(LinkDeviceError::new(LinkDeviceErrorKind::Disconnected, "gone"))
                .is_link_lost()
        );
        assert!(!LinkError::Timeout.is_link_lost());
        assert!(!LinkError::Device(LinkDeviceError::from("busy")).is_link_lost());
    }
}
