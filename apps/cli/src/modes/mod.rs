//! 运行模式
//!
//! - 监听模式（`listen`）：定时模式引擎，按设备上的按键触发测量
//! - 交互模式（`shell`）：直接模式引擎，由提示符下发命令

pub mod listen;
pub mod shell;

use crate::commands::config::Defaults;
use anyhow::{Context, Result};
use clap::Args;
use disto_sdk::link::BleLinkAdapter;
use disto_sdk::{ConnectError, DistoBuilder, DriverError, Session};
use std::time::Duration;

/// 链路存活检查间隔
pub const LIVENESS_INTERVAL: Duration = Duration::from_millis(500);

/// 设备选择参数
#[derive(Args, Debug, Clone, Default)]
pub struct DeviceArgs {
    /// 设备地址（跳过名称过滤；macOS 上为 CoreBluetooth UUID）
    #[arg(long)]
    pub address: Option<String>,

    /// 扫描时长（秒）
    #[arg(long)]
    pub scan_timeout: Option<f64>,
}

impl DeviceArgs {
    /// 合并配置文件默认值（命令行优先）
    pub fn builder(&self, defaults: &Defaults) -> Result<DistoBuilder> {
        let mut builder = DistoBuilder::new()
            .maybe_address(self.address.clone().or_else(|| defaults.address.clone()));
        if let Some(secs) = self.scan_timeout.or(defaults.scan_timeout) {
            builder = builder.scan_timeout(scan_duration(secs)?);
        }
        Ok(builder)
    }
}

/// 秒数 → 扫描时长（必须为正）
pub fn scan_duration(secs: f64) -> Result<Duration> {
    if !(secs.is_finite() && secs > 0.0) {
        anyhow::bail!("Scan timeout must be a positive number of seconds, got {}", secs);
    }
    Duration::try_from_secs_f64(secs).context("Scan timeout out of range")
}

/// 扫描并连接
///
/// 找不到设备或设备缺少 DISTO 服务时打印提示并返回 `None`。
pub async fn connect(builder: &DistoBuilder) -> Result<Option<Session<BleLinkAdapter>>> {
    println!("🔍 Scanning for DISTO device...");
    let device = match builder.discover().await {
        Ok(device) => device,
        Err(DriverError::DeviceNotFound { address }) => {
            match address {
                Some(address) => println!("❌ No DISTO device found at {}!", address),
                None => println!("❌ No DISTO device found!"),
            }
            println!("   Make sure the device is powered on and in range.");
            return Ok(None);
        },
        Err(e) => return Err(e).context("Device discovery failed"),
    };

    println!("✓ Found device: {}", device);
    println!("🔗 Connecting...");

    match builder.connect_with(device.into_link()).await {
        Ok(session) => {
            println!("✓ Connected to {}", session.address());
            Ok(Some(session))
        },
        Err(DriverError::Connect(ConnectError::CapabilityMissing { service, available })) => {
            println!("❌ Error: DISTO service {} not found!", service);
            println!("Available services:");
            for uuid in available {
                println!("  - {}", uuid);
            }
            Ok(None)
        },
        Err(e) => Err(e).context("Connection failed"),
    }
}

/// Ctrl+C
///
/// 信号处理器安装失败时永不完成（只能靠断线或退出命令结束）。
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}
