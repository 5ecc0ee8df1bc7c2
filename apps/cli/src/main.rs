//! # DISTO CLI
//!
//! Command-line reader for Leica DISTO and compatible BLE laser distance meters.
//!
//! ## 运行模式
//!
//! ### 监听模式（设备按键触发）
//!
//! ```bash
//! # 按键 1 秒后自动测量，并把结果键入当前窗口
//! disto-cli listen --delay 1.0 --auto-type --separator ,
//! ```
//!
//! ### 交互模式（由电脑触发）
//!
//! ```bash
//! $ disto-cli shell
//! disto> m
//! 📡 Sending measure command...
//! 📏 Distance: 2,431 m
//! disto> q
//! ```
//!
//! ### 配置默认值
//!
//! ```bash
//! disto-cli config set --address AA:BB:CC:DD:EE:FF --separator .
//! disto-cli config get
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

mod commands;
mod modes;
mod output;
mod typer;

use commands::config::resolve_config_path;
use commands::{CliConfig, ConfigCommand, ScanCommand};
use modes::listen::ListenArgs;
use modes::shell::ShellArgs;

/// 退出时等待后台阻塞任务（输入线程读取）的上限
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// DISTO CLI - BLE 激光测距仪命令行工具
#[derive(Parser, Debug)]
#[command(name = "disto-cli")]
#[command(about = "Command-line reader for Leica DISTO BLE laser distance meters", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 <config_dir>/disto/config.toml）
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 监听设备按键（定时模式）
    Listen(ListenArgs),

    /// 交互式 Shell，由电脑触发测量（直接模式）
    Shell(ShellArgs),

    /// 扫描附近的 DISTO 设备
    Scan(ScanCommand),

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn main() -> ExitCode {
    disto_sdk::init_logger_with("warn,disto_cli=info");

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("❌ Error: failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        },
    };

    let result = runtime.block_on(run(cli));
    // 输入线程可能仍阻塞在读取上，不等待它
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let path = resolve_config_path(cli.config.as_deref())?;

    match cli.command {
        Commands::Config(cmd) => {
            cmd.execute(&path)?;
            Ok(ExitCode::SUCCESS)
        },
        Commands::Listen(args) => {
            let config = CliConfig::load(&path)?;
            modes::listen::run(args, &config.default).await
        },
        Commands::Shell(args) => {
            let config = CliConfig::load(&path)?;
            modes::shell::run(args, &config.default).await
        },
        Commands::Scan(cmd) => {
            let config = CliConfig::load(&path)?;
            cmd.execute(config.default.scan_timeout).await?;
            Ok(ExitCode::SUCCESS)
        },
    }
}
