//! 客户端层错误类型

use disto_driver::SendError;
use disto_link::LinkError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// 延时不是有限的非负数
    #[error("Invalid delay: {0} (must be a finite, non-negative number of seconds)")]
    InvalidDelay(f64),

    /// 会话的通知流已被取走，无法启动引擎
    #[error("Notification stream already taken from session")]
    NotificationsTaken,

    #[error("Send error: {0}")]
    Send(#[from] SendError),

    #[error("Link error: {0}")]
    Link(#[from] LinkError),
}
