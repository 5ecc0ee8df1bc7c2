//! 命令发送
//!
//! 把词表中的命令写入 `COMMAND` 特征。不排队、不合并、不去重、不重试：
//! 每次调用恰好对应一次写入。

use crate::error::SendError;
use disto_link::{Characteristic, LinkAdapter};
use disto_protocol::DistoCommand;
use std::sync::Arc;
use tracing::{debug, warn};

/// 命令发送器
///
/// 持有链路的共享引用，可以廉价克隆后交给延迟测量任务使用。
pub struct CommandDispatcher<L: ?Sized> {
    link: Arc<L>,
}

impl<L: ?Sized> Clone for CommandDispatcher<L> {
    fn clone(&self) -> Self {
        Self {
            link: Arc::clone(&self.link),
        }
    }
}

impl<L> CommandDispatcher<L>
where
    L: LinkAdapter + ?Sized,
{
    pub fn new(link: Arc<L>) -> Self {
        Self { link }
    }

    /// 发送一条命令
    ///
    /// 写入失败时返回 [`SendError::Link`]，调用方可用
    /// [`SendError::is_link_lost`] 区分链路丢失和暂时性失败。
    pub async fn send(&self, command: DistoCommand) -> Result<(), SendError> {
        debug!("Sending command: {}", command);
        self.link
            .write(Characteristic::Command, command.payload())
            .await
            .map_err(|source| {
                warn!("Failed to send {}: {}", command, source);
                SendError::Link { command, source }
            })
    }

    /// 按命令字或命令名发送
    ///
    /// 不在词表中的字符串在写入前被拒绝。
    pub async fn send_token(&self, token: &str) -> Result<DistoCommand, SendError> {
        let command: DistoCommand = token.parse()?;
        self.send(command).await?;
        Ok(command)
    }

    /// 链路存活信号
    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use disto_link::{LinkError, MockLinkAdapter};

    async fn connected_mock() -> MockLinkAdapter {
        let mock = MockLinkAdapter::new();
        mock.open().await.unwrap();
        mock
    }

    #[tokio::test]
    async fn test_send_writes_exactly_once() {
        let mock = connected_mock().await;
        let dispatcher = CommandDispatcher::new(Arc::new(mock.clone()));

        dispatcher.send(DistoCommand::LaserOn).await.unwrap();
        dispatcher.send(DistoCommand::LaserOn).await.unwrap();
        dispatcher.send(DistoCommand::Measure).await.unwrap();

        let sent: Vec<Vec<u8>> = mock.sent_commands().into_iter().map(|(p, _)| p).collect();
        assert_eq!(sent, vec![b"o".to_vec(), b"o".to_vec(), b"g".to_vec()]);
    }

    #[tokio::test]
    async fn test_send_token() {
        let mock = connected_mock().await;
        let dispatcher = CommandDispatcher::new(Arc::new(mock.clone()));

        assert_eq!(dispatcher.send_token("gi").await.unwrap(), DistoCommand::MeasureWithAngle);
        assert_eq!(dispatcher.send_token("laser-off").await.unwrap(), DistoCommand::LaserOff);

        let err = dispatcher.send_token("zz").await.unwrap_err();
        assert!(matches!(err, SendError::UnknownCommand(_)));
        assert_eq!(mock.sent_commands().len(), 2);
    }

    #[tokio::test]
    async fn test_send_on_dead_link() {
        let mock = connected_mock().await;
        let dispatcher = CommandDispatcher::new(Arc::new(mock.clone()));
        mock.set_connected(false);

        assert!(!dispatcher.is_connected());
        let err = dispatcher.send(DistoCommand::Measure).await.unwrap_err();
        assert!(err.is_link_lost());
        assert!(matches!(
            err,
            SendError::Link {
                command: DistoCommand::Measure,
                source: LinkError::NotConnected,
            }
        ));
    }

    #[tokio::test]
    async fn test_transient_write_failure() {
        let mock = connected_mock().await;
        let dispatcher = CommandDispatcher::new(Arc::new(mock.clone()));
        mock.set_fail_writes(true);

        let err = dispatcher.send(DistoCommand::LaserOff).await.unwrap_err();
        assert!(!err.is_link_lost());
        assert!(dispatcher.is_connected());
    }
}
