//! 设备扫描
//!
//! 扫描附近的 BLE 设备，按广播名称或地址筛选。

use super::BleLinkAdapter;
use crate::{LinkDeviceError, LinkDeviceErrorKind, LinkError, ScanOptions};
use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// 轮询间隔（查找单个设备时提前结束扫描）
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 扫描结果
#[derive(Clone)]
pub struct DiscoveredDevice {
    /// 广播名称
    pub name: Option<String>,
    /// 蓝牙地址（macOS 上为全 0）
    pub address: String,
    /// 平台设备 ID（macOS 上为 CoreBluetooth UUID）
    pub id: String,
    central: Adapter,
    peripheral: Peripheral,
}

impl DiscoveredDevice {
    /// 地址或平台 ID 是否与给定字符串匹配（大小写不敏感）
    pub fn matches_address(&self, address: &str) -> bool {
        let needle = address.trim();
        self.address.eq_ignore_ascii_case(needle) || self.id.eq_ignore_ascii_case(needle)
    }

    /// 转换为链路适配器（尚未连接）
    pub fn into_link(self) -> BleLinkAdapter {
        BleLinkAdapter::new(self.central, self.peripheral, self.name)
    }
}

impl std::fmt::Debug for DiscoveredDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveredDevice")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("id", &self.id)
            .finish()
    }
}

impl std::fmt::Display for DiscoveredDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({})",
            self.name.as_deref().unwrap_or("<unnamed>"),
            self.address
        )
    }
}

/// 获取第一个蓝牙适配器
async fn first_adapter() -> Result<Adapter, LinkError> {
    let manager = Manager::new().await?;
    manager.adapters().await?.into_iter().next().ok_or_else(|| {
        LinkError::Device(LinkDeviceError::new(
            LinkDeviceErrorKind::AdapterUnavailable,
            "no Bluetooth adapter found",
        ))
    })
}

async fn describe(central: &Adapter, peripheral: Peripheral) -> Result<DiscoveredDevice, LinkError> {
    let name = peripheral
        .properties()
        .await?
        .and_then(|props| props.local_name);
    Ok(DiscoveredDevice {
        name,
        address: peripheral.address().to_string(),
        id: format!("{:?}", peripheral.id()),
        central: central.clone(),
        peripheral,
    })
}

/// 合并一轮轮询结果
///
/// 读取失败的设备跳过，已记录（`key` 相同）或不满足 `predicate` 的设备忽略。
fn merge_round<T, K, F>(
    found: &mut Vec<T>,
    round: Vec<Result<T, LinkError>>,
    key: K,
    predicate: &mut F,
) where
    K: Fn(&T) -> &str,
    F: FnMut(&T) -> bool,
{
    for result in round {
        let device = match result {
            Ok(device) => device,
            Err(e) => {
                warn!("Skipping device with unreadable properties: {}", e);
                continue;
            },
        };
        if found.iter().any(|d| key(d) == key(&device)) || !predicate(&device) {
            continue;
        }
        found.push(device);
    }
}

async fn poll_devices<F>(
    central: &Adapter,
    options: &ScanOptions,
    stop_at_first: bool,
    mut predicate: F,
) -> Result<Vec<DiscoveredDevice>, LinkError>
where
    F: FnMut(&DiscoveredDevice) -> bool,
{
    let deadline = Instant::now() + options.timeout;
    let mut found: Vec<DiscoveredDevice> = Vec::new();

    loop {
        tokio::time::sleep(POLL_INTERVAL.min(options.timeout)).await;

        let mut round = Vec::new();
        for peripheral in central.peripherals().await? {
            round.push(describe(central, peripheral).await);
        }
        let before = found.len();
        merge_round(&mut found, round, |d| d.id.as_str(), &mut predicate);
        for device in &found[before..] {
            debug!("Found device: {}", device);
        }

        if (stop_at_first && !found.is_empty()) || Instant::now() >= deadline {
            return Ok(found);
        }
    }
}

/// 扫描直到超时，或在 `stop_at_first` 时遇到第一个命中的设备
///
/// 无论轮询是否出错，返回前都会停止扫描。
async fn scan_with<F>(
    options: &ScanOptions,
    stop_at_first: bool,
    predicate: F,
) -> Result<Vec<DiscoveredDevice>, LinkError>
where
    F: FnMut(&DiscoveredDevice) -> bool,
{
    let central = first_adapter().await?;
    central.start_scan(ScanFilter::default()).await?;
    info!("Scanning for devices ({:?})...", options.timeout);

    let result = poll_devices(&central, options, stop_at_first, predicate).await;

    if let Err(e) = central.stop_scan().await {
        warn!("Failed to stop scan: {}", e);
    }
    result
}

/// 扫描所有名称命中过滤条件的设备
pub async fn scan(options: &ScanOptions) -> Result<Vec<DiscoveredDevice>, LinkError> {
    scan_with(options, false, |device| {
        options.matches_name(device.name.as_deref())
    })
    .await
}

/// 查找单个设备
///
/// - 指定 `address` 时按地址/平台 ID 匹配，不检查名称
/// - 否则返回第一个名称命中过滤条件的设备
pub async fn find_device(
    options: &ScanOptions,
    address: Option<&str>,
) -> Result<Option<DiscoveredDevice>, LinkError> {
    let found = match address {
        Some(address) => scan_with(options, true, |device| device.matches_address(address)).await?,
        None => {
            scan_with(options, true, |device| {
                options.matches_name(device.name.as_deref())
            })
            .await?
        },
    };
    Ok(found.into_iter().next())
}
