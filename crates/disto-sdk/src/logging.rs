//! 日志初始化
//!
//! 库代码只使用 `tracing` 宏，不安装任何订阅者。应用在启动时调用一次
//! [`init_logger`] 或 [`init_logger_with`]：
//!
//! - `tracing_subscriber::fmt` 输出到 stderr
//! - `EnvFilter` 优先读取 `RUST_LOG`，否则使用给定的默认指令
//! - `LogTracer` 把 `log` 记录（btleplug 使用 `log`）转发到 `tracing`
//!
//! 重复调用是安全的：第二次及之后的调用不做任何事。

use tracing::debug;
use tracing_subscriber::EnvFilter;

/// 默认过滤指令
pub const DEFAULT_DIRECTIVES: &str = "info";

/// 以默认指令（`info`）初始化日志
pub fn init_logger() -> bool {
    init_logger_with(DEFAULT_DIRECTIVES)
}

/// 以给定默认指令初始化日志（`RUST_LOG` 优先）
///
/// 返回是否由本次调用完成了安装。
pub fn init_logger_with(directives: &str) -> bool {
    // 已有其他 log 实现时桥接失败，但 tracing 订阅者仍然可以安装
    let bridged = tracing_log::LogTracer::init().is_ok();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(build_filter(directives))
        .with_writer(std::io::stderr)
        .finish();
    let installed = tracing::subscriber::set_global_default(subscriber).is_ok();

    if installed {
        debug!("Logger initialized (log bridge: {})", bridged);
    }
    installed
}

/// `RUST_LOG` 优先，未设置或无法解析时退回到默认指令
fn build_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}
