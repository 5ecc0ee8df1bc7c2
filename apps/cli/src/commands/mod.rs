//! 命令定义和实现

pub mod config;
pub mod scan;

pub use config::{CliConfig, ConfigCommand};
pub use scan::ScanCommand;
