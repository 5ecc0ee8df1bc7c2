//! 已建立的会话
//!
//! [`Session`] 只能通过完整握手得到：拿到 `Session` 就意味着两个通知都已启用。

use crate::dispatcher::CommandDispatcher;
use crate::error::{ConnectError, SendError};
use crate::sequencer::{HandshakeTiming, handshake};
use disto_link::{LinkAdapter, NotificationStream};
use disto_protocol::DistoCommand;
use std::sync::Arc;
use tracing::{info, warn};

/// 已建立的测量会话
pub struct Session<L: ?Sized> {
    link: Arc<L>,
    dispatcher: CommandDispatcher<L>,
    notifications: Option<NotificationStream>,
}

impl<L> Session<L>
where
    L: LinkAdapter + ?Sized,
{
    /// 在链路上执行握手并建立会话
    ///
    /// 握手失败时尽力关闭链路，然后返回原始错误。
    pub async fn establish(link: Arc<L>, timing: &HandshakeTiming) -> Result<Self, ConnectError> {
        let notifications = match handshake(link.as_ref(), timing).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Handshake failed: {}", e);
                if let Err(close_err) = link.close().await {
                    warn!("Failed to close link after handshake failure: {}", close_err);
                }
                return Err(e);
            },
        };

        info!("Session established with {}", link.address());
        Ok(Self {
            dispatcher: CommandDispatcher::new(Arc::clone(&link)),
            link,
            notifications: Some(notifications),
        })
    }

    /// 底层链路
    pub fn link(&self) -> &Arc<L> {
        &self.link
    }

    /// 命令发送器
    pub fn dispatcher(&self) -> &CommandDispatcher<L> {
        &self.dispatcher
    }

    /// 取走通知流（只能取一次）
    pub fn take_notifications(&mut self) -> Option<NotificationStream> {
        self.notifications.take()
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    pub fn address(&self) -> String {
        self.link.address()
    }

    pub async fn send(&self, command: DistoCommand) -> Result<(), SendError> {
        self.dispatcher.send(command).await
    }

    /// 关闭链路
    pub async fn close(&self) -> Result<(), disto_link::LinkError> {
        info!("Closing session with {}", self.link.address());
        self.link.close().await
    }
}

impl<L: ?Sized> std::fmt::Debug for Session<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("notifications_taken", &self.notifications.is_none())
            .finish()
    }
}
