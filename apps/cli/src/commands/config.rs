//! 配置管理命令
//!
//! 持久化默认参数（设备地址、延迟、小数分隔符等），命令行参数优先于配置文件。

use crate::output::Separator;
use anyhow::{Context, Result};
use clap::Subcommand;
use disto_sdk::EngineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 默认配置文件路径：`<config_dir>/disto/config.toml`
pub fn default_config_path() -> Result<PathBuf> {
    let mut path =
        dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine config directory"))?;
    path.push("disto");
    path.push("config.toml");
    Ok(path)
}

/// 实际使用的配置文件路径（`--config` 优先）
pub fn resolve_config_path(overridden: Option<&Path>) -> Result<PathBuf> {
    match overridden {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_path(),
    }
}

/// `[default]` 段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// 设备地址（跳过名称过滤）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// 定时模式延迟（秒）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
    /// 小数分隔符
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separator: Option<Separator>,
    /// 自动键入最终值
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_type: Option<bool>,
    /// 扫描时长（秒）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_timeout: Option<f64>,
}

/// CLI 配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub default: Defaults,
}

impl CliConfig {
    /// 加载配置（文件不存在时返回默认值）
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// 保存配置（自动创建目录）
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }

        let body = toml::to_string_pretty(self).context("Failed to serialize config")?;
        let content = format!("# DISTO CLI Configuration\n\n{}", body);
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// 检查取值是否合法，返回问题列表
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if let Some(delay) = self.default.delay {
            if let Err(e) = EngineConfig::timer().with_delay_secs(delay) {
                problems.push(format!("delay: {}", e));
            }
        }

        if let Some(timeout) = self.default.scan_timeout {
            if !(timeout.is_finite() && timeout > 0.0) {
                problems.push(format!(
                    "scan_timeout: must be a positive number of seconds, got {}",
                    timeout
                ));
            }
        }

        problems
    }
}

fn show<T: std::fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "(not set)".to_string(),
    }
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 设置配置项
    Set {
        /// 设备地址（macOS 上为 CoreBluetooth UUID）
        #[arg(short, long)]
        address: Option<String>,

        /// 定时模式延迟（秒）
        #[arg(short, long)]
        delay: Option<f64>,

        /// 小数分隔符
        #[arg(short, long, value_enum)]
        separator: Option<Separator>,

        /// 自动键入最终值
        #[arg(short = 't', long)]
        auto_type: Option<bool>,

        /// 扫描时长（秒）
        #[arg(long)]
        scan_timeout: Option<f64>,
    },

    /// 获取配置项
    Get {
        /// 配置项名称（address / delay / separator / auto_type / scan_timeout / all）
        #[arg(default_value = "all")]
        key: String,
    },

    /// 检查配置
    Check,
}

impl ConfigCommand {
    pub fn execute(self, path: &Path) -> Result<()> {
        match self {
            ConfigCommand::Set {
                address,
                delay,
                separator,
                auto_type,
                scan_timeout,
            } => {
                let mut config = CliConfig::load(path)?;
                let update = Defaults {
                    address,
                    delay,
                    separator,
                    auto_type,
                    scan_timeout,
                };
                Self::set_(&mut config, update)?;
                config.save(path)
            },

            ConfigCommand::Get { key } => Self::get_(&CliConfig::load(path)?, &key),

            ConfigCommand::Check => Self::check_(path),
        }
    }

    fn set_(config: &mut CliConfig, update: Defaults) -> Result<()> {
        let mut staged = config.clone();
        let d = &mut staged.default;
        d.address = update.address.clone().or(d.address.take());
        d.delay = update.delay.or(d.delay);
        d.separator = update.separator.or(d.separator);
        d.auto_type = update.auto_type.or(d.auto_type);
        d.scan_timeout = update.scan_timeout.or(d.scan_timeout);

        let problems = staged.validate();
        if !problems.is_empty() {
            anyhow::bail!("Invalid configuration: {}", problems.join("; "));
        }

        if let Some(address) = &update.address {
            println!("✅ Default address: {}", address);
        }
        if let Some(delay) = update.delay {
            println!("✅ Default delay: {} s", delay);
        }
        if let Some(separator) = update.separator {
            println!("✅ Decimal separator: {}", separator);
        }
        if let Some(auto_type) = update.auto_type {
            println!("✅ Auto-type: {}", auto_type);
        }
        if let Some(timeout) = update.scan_timeout {
            println!("✅ Scan timeout: {} s", timeout);
        }

        *config = staged;
        Ok(())
    }

    fn get_(config: &CliConfig, key: &str) -> Result<()> {
        let d = &config.default;
        match key {
            "address" => println!("{}", show(&d.address)),
            "delay" => println!("{}", show(&d.delay)),
            "separator" => println!("{}", show(&d.separator)),
            "auto_type" | "auto-type" => println!("{}", show(&d.auto_type)),
            "scan_timeout" | "scan-timeout" => println!("{}", show(&d.scan_timeout)),
            "all" => {
                println!("DISTO CLI configuration:");
                println!("  address:      {}", show(&d.address));
                println!("  delay:        {}", show(&d.delay));
                println!("  separator:    {}", show(&d.separator));
                println!("  auto_type:    {}", show(&d.auto_type));
                println!("  scan_timeout: {}", show(&d.scan_timeout));
            },
            other => anyhow::bail!("Unknown config key: {}", other),
        }
        Ok(())
    }

    fn check_(path: &Path) -> Result<()> {
        println!("Config file: {}", path.display());
        if !path.exists() {
            println!("  (not found, using built-in defaults)");
            return Ok(());
        }

        let config = CliConfig::load(path)?;
        let problems = config.validate();
        if problems.is_empty() {
            println!("✅ Configuration OK");
            Ok(())
        } else {
            for problem in &problems {
                println!("❌ {}", problem);
            }
            anyhow::bail!("{} problem(s) found", problems.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_section() {
        let config = CliConfig::parse(
            r#"
[default]
address = "AA:BB:CC:DD:EE:FF"
delay = 2.5
separator = "."
auto_type = true
"#,
        )
        .unwrap();

        assert_eq!(config.default.address.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
        assert_eq!(config.default.delay, Some(2.5));
        assert_eq!(config.default.separator, Some(Separator::Dot));
        assert_eq!(config.default.auto_type, Some(true));
        assert_eq!(config.default.scan_timeout, None);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(CliConfig::parse("").unwrap(), CliConfig::default());
    }

    #[test]
    fn test_rejects_unknown_separator() {
        assert!(CliConfig::parse("[default]\nseparator = \";\"\n").is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = CliConfig::default();
        config.default.delay = Some(1.5);
        config.default.separator = Some(Separator::Comma);
        config.save(&path).unwrap();

        assert_eq!(CliConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_validate() {
        let mut config = CliConfig::default();
        assert!(config.validate().is_empty());

        config.default.delay = Some(-1.0);
        config.default.scan_timeout = Some(0.0);
        let problems = config.validate();
        assert_eq!(problems.len(), 2);
        assert!(problems[0].starts_with("delay"));
        assert!(problems[1].starts_with("scan_timeout"));
    }

    #[test]
    fn test_set_rejects_invalid_delay_without_changes() {
        let mut config = CliConfig::default();
        let update = Defaults {
            address: Some("AA".into()),
            delay: Some(f64::NAN),
            ..Defaults::default()
        };
        assert!(ConfigCommand::set_(&mut config, update).is_err());
        assert_eq!(config, CliConfig::default());
    }
}
