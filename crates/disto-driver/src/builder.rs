//! Builder 模式实现
//!
//! 提供链式构造 [`Session`] 的便捷方式：扫描 → 选择设备 → 握手。

use crate::error::DriverError;
use crate::sequencer::HandshakeTiming;
use crate::session::Session;
use disto_link::{LinkAdapter, ScanOptions};
use std::sync::Arc;
use std::time::Duration;
#[cfg(feature = "ble")]
use tracing::info;

#[cfg(feature = "ble")]
use disto_link::{BleLinkAdapter, DiscoveredDevice};

/// 会话 Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// # async fn demo() -> Result<(), disto_driver::DriverError> {
/// use disto_driver::DistoBuilder;
/// use std::time::Duration;
///
/// // 扫描第一个名称命中过滤条件的设备
/// let session = DistoBuilder::new().connect().await?;
///
/// // 指定设备地址和扫描时长
/// let session = DistoBuilder::new()
///     .address("AA:BB:CC:DD:EE:FF")
///     .scan_timeout(Duration::from_secs(5))
///     .connect()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct DistoBuilder {
    /// 设备地址（macOS 上为平台 UUID）
    address: Option<String>,
    /// 扫描参数
    scan: ScanOptions,
    /// 握手时序
    timing: HandshakeTiming,
}

impl DistoBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定设备地址（跳过名称过滤）
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// 可选地址（便于从配置文件透传）
    pub fn maybe_address(mut self, address: Option<String>) -> Self {
        self.address = address;
        self
    }

    pub fn scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan.timeout = timeout;
        self
    }

    /// 名称过滤关键字（大小写不敏感）
    pub fn name_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scan = self.scan.name_filters(filters);
        self
    }

    pub fn scan_options(mut self, options: ScanOptions) -> Self {
        self.scan = options;
        self
    }

    pub fn handshake_timing(mut self, timing: HandshakeTiming) -> Self {
        self.timing = timing;
        self
    }

    /// 当前的扫描参数
    pub fn scan_options_ref(&self) -> &ScanOptions {
        &self.scan
    }

    /// 在给定链路上握手（不扫描）
    pub async fn connect_with<L>(&self, link: L) -> Result<Session<L>, DriverError>
    where
        L: LinkAdapter,
    {
        Ok(Session::establish(Arc::new(link), &self.timing).await?)
    }

    /// 扫描并返回选中的设备（不连接）
    #[cfg(feature = "ble")]
    pub async fn discover(&self) -> Result<DiscoveredDevice, DriverError> {
        disto_link::ble::find_device(&self.scan, self.address.as_deref())
            .await?
            .ok_or_else(|| DriverError::DeviceNotFound {
                address: self.address.clone(),
            })
    }

    /// 扫描、选择设备并握手
    #[cfg(feature = "ble")]
    pub async fn connect(&self) -> Result<Session<BleLinkAdapter>, DriverError> {
        let device = self.discover().await?;
        info!("Selected device: {}", device);
        self.connect_with(device.into_link()).await
    }
}
