//! 交互模式（直接模式）
//!
//! 专用输入线程 + crossbeam 通道：rustyline 在自己的线程里阻塞读取，
//! 主循环同时等待输入、引擎事件和 Ctrl+C，保留历史记录，不阻塞 tokio。

use super::{DeviceArgs, LIVENESS_INTERVAL};
use crate::commands::config::Defaults;
use crate::output::{Presenter, Separator};
use anyhow::Result;
use clap::Args;
use crossbeam_channel::{Receiver, bounded};
use disto_sdk::{
    DistoCommand, EngineConfig, EngineEvent, EngineHandle, EventReceiver, LinkAdapter,
    MeasurementEngine,
};
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::warn;

/// 交互参数
#[derive(Args, Debug, Clone)]
pub struct ShellArgs {
    /// 小数分隔符
    #[arg(short, long, value_enum)]
    pub separator: Option<Separator>,

    #[command(flatten)]
    pub device: DeviceArgs,
}

/// 一行输入对应的操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// 发送命令
    Send(DistoCommand),
    /// `send <token>`：按命令字或命令名发送
    Raw(String),
    Help,
    Status,
    Quit,
    Empty,
    Unknown(String),
}

/// 解析一行输入（大小写不敏感）
pub fn parse_shell_line(line: &str) -> ShellCommand {
    let line = line.trim();
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return ShellCommand::Empty;
    };

    match head.to_lowercase().as_str() {
        "m" => ShellCommand::Send(DistoCommand::Measure),
        "a" => ShellCommand::Send(DistoCommand::MeasureWithAngle),
        "l" => ShellCommand::Send(DistoCommand::LaserOn),
        "o" => ShellCommand::Send(DistoCommand::LaserOff),
        "q" | "quit" | "exit" => ShellCommand::Quit,
        "help" | "?" => ShellCommand::Help,
        "status" => ShellCommand::Status,
        "send" => match (parts.next(), parts.next()) {
            (Some(token), None) => ShellCommand::Raw(token.to_string()),
            _ => ShellCommand::Unknown(line.to_string()),
        },
        _ => ShellCommand::Unknown(line.to_string()),
    }
}

/// 命令执行后的走向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
    LinkLost,
}

fn progress_text(command: DistoCommand) -> &'static str {
    match command {
        DistoCommand::Measure => "📡 Sending measure command...",
        DistoCommand::MeasureWithAngle => "📡 Sending measure distance+angle command...",
        DistoCommand::MeasureAngle => "📡 Sending angle command...",
        DistoCommand::LaserOn => "📡 Turning laser on...",
        DistoCommand::LaserOff => "📡 Turning laser off...",
    }
}

fn print_help() {
    println!("Commands:");
    println!("  m            - Measure distance");
    println!("  a            - Measure distance + angle");
    println!("  l            - Laser on");
    println!("  o            - Laser off");
    println!("  send <token> - Send a raw command (g, gi, iv, o, p)");
    println!("  status       - Show engine state");
    println!("  q            - Quit");
}

/// 执行一条交互命令
pub async fn execute<L>(handle: &EngineHandle<L>, command: ShellCommand) -> Flow
where
    L: LinkAdapter + ?Sized + 'static,
{
    let result = match command {
        ShellCommand::Send(command) => {
            println!("{}", progress_text(command));
            handle.send(command).await
        },
        ShellCommand::Raw(token) => handle.send_token(&token).await.map(|command| {
            println!("📡 Sent {}", command);
        }),
        ShellCommand::Help => {
            print_help();
            return Flow::Continue;
        },
        ShellCommand::Status => {
            let snapshot = handle.snapshot();
            println!("📊 Device: {}", handle.address());
            println!("   Connected: {}", handle.is_connected());
            println!("   Mode: {}", snapshot.mode);
            println!("   Unit code: {}", snapshot.unit_code);
            return Flow::Continue;
        },
        ShellCommand::Quit => return Flow::Quit,
        ShellCommand::Empty => return Flow::Continue,
        ShellCommand::Unknown(_) => {
            println!("⚠️  Unknown command. Use: m, a, l, o, or q");
            return Flow::Continue;
        },
    };

    match result {
        Ok(()) => Flow::Continue,
        Err(e) => {
            println!("⚠️  Error sending command: {}", e);
            if e.is_link_lost() {
                Flow::LinkLost
            } else {
                Flow::Continue
            }
        },
    }
}

fn history_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("disto").join("shell_history"))
}

/// 专用输入线程
///
/// Editor 在线程内创建，生命周期与会话相同。Ctrl+C / Ctrl+D 结束输入，
/// 通道关闭即视为退出。
pub fn spawn_input() -> Receiver<String> {
    let (line_tx, line_rx) = bounded::<String>(10);

    thread::spawn(move || {
        let mut rl = match Editor::<(), DefaultHistory>::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            },
        };

        let history = history_path();
        if let Some(path) = &history {
            rl.load_history(path).ok(); // 首次运行没有历史
        }

        loop {
            match rl.readline("disto> ") {
                Ok(line) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(line.clone());
                    if line_tx.send(line).is_err() {
                        break; // 主循环已退出
                    }
                },
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => {
                    eprintln!("Error: {:?}", e);
                    break;
                },
            }
        }

        if let Some(path) = &history {
            if let Some(dir) = path.parent() {
                let _ = std::fs::create_dir_all(dir);
            }
            rl.save_history(path).ok();
        }
    });

    line_rx
}

pub async fn run(args: ShellArgs, defaults: &Defaults) -> Result<ExitCode> {
    let separator = args.separator.or(defaults.separator).unwrap_or_default();
    let builder = args.device.builder(defaults)?;

    println!("{}", "=".repeat(60));
    println!("Leica DISTO BLE Reader");
    println!("Mode: Active (trigger from PC)");
    println!("{}\n", "=".repeat(60));

    let Some(session) = super::connect(&builder).await? else {
        return Ok(ExitCode::FAILURE);
    };
    let config = EngineConfig::direct();
    let (handle, events) = MeasurementEngine::new(config).spawn(session)?;

    println!("\n{}", "=".repeat(60));
    println!("✓ Ready! Commands:");
    println!("  m  - Measure distance");
    println!("  a  - Measure distance + angle");
    println!("  l  - Laser on");
    println!("  o  - Laser off");
    println!("  q  - Quit");
    println!("{}\n", "=".repeat(60));

    let presenter = Presenter::new(separator, config.delay);
    Ok(shell_loop(handle, events, presenter, spawn_input(), super::ctrl_c()).await)
}

enum Step {
    Input(Option<String>),
    Event(Option<EngineEvent>),
    Shutdown,
    Tick,
}

/// 交互主循环
///
/// 输入结束（`q`、Ctrl+C、Ctrl+D）正常退出；链路丢失以失败退出。
pub async fn shell_loop<L, F>(
    handle: EngineHandle<L>,
    mut events: EventReceiver,
    presenter: Presenter,
    input: Receiver<String>,
    shutdown: F,
) -> ExitCode
where
    L: LinkAdapter + ?Sized + 'static,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut liveness = tokio::time::interval(LIVENESS_INTERVAL);
    liveness.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // 跨迭代保留同一个阻塞读取，避免丢行
    let mut pending: Option<JoinHandle<Option<String>>> = None;

    let code = loop {
        let recv = pending.get_or_insert_with(|| {
            let rx = input.clone();
            tokio::task::spawn_blocking(move || rx.recv().ok())
        });

        let step = tokio::select! {
            line = recv => Step::Input(line.ok().flatten()),
            event = events.recv() => Step::Event(event),
            _ = &mut shutdown => Step::Shutdown,
            _ = liveness.tick() => Step::Tick,
        };

        match step {
            Step::Input(line) => {
                pending = None;
                let flow = match line {
                    Some(line) => execute(&handle, parse_shell_line(&line)).await,
                    None => Flow::Quit,
                };
                match flow {
                    Flow::Continue => {},
                    Flow::Quit => {
                        println!("\n👋 Disconnecting...");
                        break ExitCode::SUCCESS;
                    },
                    Flow::LinkLost => break ExitCode::FAILURE,
                }
            },
            Step::Event(Some(event)) => {
                if let Some(line) = presenter.render(&event) {
                    println!("{}", line);
                }
                if matches!(event, EngineEvent::LinkLost { .. } | EngineEvent::Disconnected) {
                    break ExitCode::FAILURE;
                }
            },
            Step::Event(None) => break ExitCode::FAILURE,
            Step::Shutdown => {
                println!("\n\n👋 Disconnecting...");
                break ExitCode::SUCCESS;
            },
            Step::Tick => {
                if !handle.is_connected() {
                    println!("❌ Device disconnected");
                    break ExitCode::FAILURE;
                }
            },
        }
    };

    if let Err(e) = handle.shutdown().await {
        warn!("Error while disconnecting: {}", e);
    }
    code
}
