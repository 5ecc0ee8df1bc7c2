//! 监听模式（定时模式）
//!
//! 设备按键触发测量：粗测值到达后开激光，延迟后下发测量命令，
//! 把第二个读数作为最终值输出（可选自动键入）。

use super::{DeviceArgs, LIVENESS_INTERVAL};
use crate::commands::config::Defaults;
use crate::output::{Presenter, Separator, delay_text, format_value};
use crate::typer::AutoTyper;
use anyhow::Result;
use clap::Args;
use disto_sdk::client::DEFAULT_DELAY;
use disto_sdk::{EngineConfig, EngineEvent, EngineHandle, EventReceiver, LinkAdapter, MeasurementEngine};
use std::future::Future;
use std::process::ExitCode;
use tokio::time::MissedTickBehavior;
use tracing::warn;

/// 监听参数
#[derive(Args, Debug, Clone)]
pub struct ListenArgs {
    /// 按键后到测量的延迟（秒）
    #[arg(short, long)]
    pub delay: Option<f64>,

    /// 把最终值键入当前活动窗口
    #[arg(short = 't', long)]
    pub auto_type: bool,

    /// 小数分隔符
    #[arg(short, long, value_enum)]
    pub separator: Option<Separator>,

    #[command(flatten)]
    pub device: DeviceArgs,
}

/// 合并后的监听设置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListenSettings {
    pub engine: EngineConfig,
    pub separator: Separator,
    pub auto_type: bool,
}

impl ListenArgs {
    /// 合并配置文件默认值（命令行优先）
    pub fn settings(&self, defaults: &Defaults) -> Result<ListenSettings> {
        let delay = self
            .delay
            .or(defaults.delay)
            .unwrap_or(DEFAULT_DELAY.as_secs_f64());

        Ok(ListenSettings {
            engine: EngineConfig::timer().with_delay_secs(delay)?,
            separator: self.separator.or(defaults.separator).unwrap_or_default(),
            auto_type: self.auto_type || defaults.auto_type.unwrap_or(false),
        })
    }
}

pub async fn run(args: ListenArgs, defaults: &Defaults) -> Result<ExitCode> {
    let settings = args.settings(defaults)?;
    let builder = args.device.builder(defaults)?;

    println!("{}", "=".repeat(60));
    println!("Leica DISTO BLE Reader");
    println!(
        "Mode: Passive (listen to button, delay: {}s)",
        settings.engine.delay.as_secs_f64()
    );
    let typer = if settings.auto_type {
        match AutoTyper::spawn() {
            Ok(typer) => {
                println!("Auto-type: ENABLED - measurements will be typed automatically");
                Some(typer)
            },
            Err(e) => {
                println!("⚠️  Warning: {}, auto-type won't work", e);
                None
            },
        }
    } else {
        None
    };
    println!("{}\n", "=".repeat(60));

    let Some(session) = super::connect(&builder).await? else {
        return Ok(ExitCode::FAILURE);
    };
    let (handle, events) = MeasurementEngine::new(settings.engine).spawn(session)?;

    println!("\n{}", "=".repeat(60));
    println!("✓ Ready! Press the button on the DISTO device to measure.");
    println!(
        "  Timer mode enabled: automatic measurement {} after button press",
        delay_text(settings.engine.delay)
    );
    println!("  Press Ctrl+C to exit.");
    println!("{}\n", "=".repeat(60));

    let presenter = Presenter::new(settings.separator, settings.engine.delay);
    let code = event_loop(handle, events, presenter, typer.as_ref(), super::ctrl_c()).await;

    if let Some(typer) = typer {
        // 等待已提交的键入完成
        if tokio::task::spawn_blocking(move || typer.finish()).await.is_err() {
            warn!("Typing thread did not finish cleanly");
        }
    }
    Ok(code)
}

/// 事件循环
///
/// `shutdown` 完成（Ctrl+C）时正常退出；链路丢失或断开时以失败退出。
/// 两种情况都会关闭引擎。
pub async fn event_loop<L, F>(
    handle: EngineHandle<L>,
    mut events: EventReceiver,
    presenter: Presenter,
    typer: Option<&AutoTyper>,
    shutdown: F,
) -> ExitCode
where
    L: LinkAdapter + ?Sized + 'static,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut liveness = tokio::time::interval(LIVENESS_INTERVAL);
    liveness.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let code = loop {
        tokio::select! {
            _ = &mut shutdown => {
                println!("\n\n👋 Disconnecting...");
                break ExitCode::SUCCESS;
            }

            event = events.recv() => {
                let Some(event) = event else {
                    break ExitCode::FAILURE;
                };
                if let Some(line) = presenter.render(&event) {
                    println!("{}", line);
                }
                match event {
                    EngineEvent::Finalized { sample, cycle: Some(_) } => {
                        if let Some(typer) = typer {
                            let text = format_value(sample.value, presenter.separator);
                            if let Err(e) = typer.submit(text) {
                                println!("❌ Typing error: {}", e);
                            }
                        }
                    },
                    EngineEvent::LinkLost { .. } | EngineEvent::Disconnected => {
                        break ExitCode::FAILURE;
                    },
                    _ => {},
                }
            }

            _ = liveness.tick() => {
                if !handle.is_connected() {
                    println!("❌ Device disconnected");
                    break ExitCode::FAILURE;
                }
            }
        }
    };

    if let Err(e) = handle.shutdown().await {
        warn!("Error while disconnecting: {}", e);
    }
    code
}
