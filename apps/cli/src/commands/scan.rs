//! 设备扫描命令

use anyhow::Result;
use clap::Args;
use disto_sdk::ScanOptions;
use disto_sdk::link::ble;

/// 扫描参数
#[derive(Args, Debug)]
pub struct ScanCommand {
    /// 扫描时长（秒）
    #[arg(short, long)]
    pub timeout: Option<f64>,

    /// 列出所有设备（不按名称过滤）
    #[arg(short, long)]
    pub all: bool,
}

impl ScanCommand {
    /// 实际使用的扫描参数
    pub fn options(&self, configured_timeout: Option<f64>) -> Result<ScanOptions> {
        let mut options = ScanOptions::default();
        if let Some(secs) = self.timeout.or(configured_timeout) {
            options = options.timeout(crate::modes::scan_duration(secs)?);
        }
        if self.all {
            options = options.any_device();
        }
        Ok(options)
    }

    pub async fn execute(self, configured_timeout: Option<f64>) -> Result<()> {
        let options = self.options(configured_timeout)?;

        println!(
            "🔍 Scanning for {:.0} seconds...",
            options.timeout.as_secs_f64()
        );
        let devices = ble::scan(&options).await?;

        if devices.is_empty() {
            println!("❌ No DISTO device found!");
            println!("   Make sure the device is powered on and in range.");
            return Ok(());
        }

        println!("✓ Found {} device(s):", devices.len());
        for device in &devices {
            if device.id != device.address {
                println!("  {}  [id {}]", device, device.id);
            } else {
                println!("  {}", device);
            }
        }
        Ok(())
    }
}
