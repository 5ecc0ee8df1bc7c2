//! 自动键入
//!
//! 把最终测量值键入当前活动窗口并按回车（电子表格逐格录入）。
//!
//! 键盘模拟在专用线程里执行，主循环只通过 crossbeam 通道提交文本，
//! 不会被 200ms 的等待阻塞。真实后端需要 `auto-type` feature（enigo）。

#![cfg_attr(not(feature = "auto-type"), allow(dead_code))]

use crossbeam_channel::{Sender, bounded, unbounded};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// 键入前等待窗口就绪的时间
pub const SETTLE_DELAY: Duration = Duration::from_millis(200);

#[derive(Error, Debug)]
pub enum TyperError {
    #[error("auto-type is not available in this build (enable the `auto-type` feature)")]
    Unavailable,
    #[error("keyboard backend error: {0}")]
    Backend(String),
    #[error("typing thread exited")]
    ThreadGone,
}

/// 键盘后端
pub trait KeyboardBackend {
    fn type_text(&mut self, text: &str) -> Result<(), TyperError>;
    fn press_enter(&mut self) -> Result<(), TyperError>;
}

#[cfg(feature = "auto-type")]
mod enigo_backend {
    use super::{KeyboardBackend, TyperError};
    use enigo::{Direction, Enigo, Key, Keyboard, Settings};

    pub struct EnigoBackend(Enigo);

    impl EnigoBackend {
        pub fn new() -> Result<Self, TyperError> {
            Enigo::new(&Settings::default())
                .map(EnigoBackend)
                .map_err(|e| TyperError::Backend(e.to_string()))
        }
    }

    impl KeyboardBackend for EnigoBackend {
        fn type_text(&mut self, text: &str) -> Result<(), TyperError> {
            self.0
                .text(text)
                .map_err(|e| TyperError::Backend(e.to_string()))
        }

        fn press_enter(&mut self) -> Result<(), TyperError> {
            self.0
                .key(Key::Return, Direction::Click)
                .map_err(|e| TyperError::Backend(e.to_string()))
        }
    }
}

/// 自动键入器
pub struct AutoTyper {
    tx: Sender<String>,
    thread: thread::JoinHandle<()>,
}

impl AutoTyper {
    /// 使用系统键盘后端
    #[cfg(feature = "auto-type")]
    pub fn spawn() -> Result<Self, TyperError> {
        Self::with_backend(enigo_backend::EnigoBackend::new, SETTLE_DELAY)
    }

    /// 未启用 `auto-type` feature 时不可用
    #[cfg(not(feature = "auto-type"))]
    pub fn spawn() -> Result<Self, TyperError> {
        Err(TyperError::Unavailable)
    }

    /// 使用给定后端启动键入线程
    ///
    /// 后端在线程内创建（部分平台的键盘句柄不能跨线程移动），
    /// 创建失败时返回错误。
    pub fn with_backend<B, F>(factory: F, settle: Duration) -> Result<Self, TyperError>
    where
        B: KeyboardBackend,
        F: FnOnce() -> Result<B, TyperError> + Send + 'static,
    {
        let (tx, rx) = unbounded::<String>();
        let (ready_tx, ready_rx) = bounded::<Result<(), TyperError>>(1);

        let thread = thread::spawn(move || {
            let mut backend = match factory() {
                Ok(backend) => {
                    let _ = ready_tx.send(Ok(()));
                    backend
                },
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                },
            };

            for text in rx {
                thread::sleep(settle);
                let result = backend
                    .type_text(&text)
                    .and_then(|()| backend.press_enter());
                match result {
                    Ok(()) => println!("✅ Typing complete"),
                    Err(e) => println!("❌ Typing error: {}", e),
                }
            }
        });

        ready_rx.recv().map_err(|_| TyperError::ThreadGone)??;
        Ok(Self { tx, thread })
    }

    /// 提交一次键入（立即返回）
    pub fn submit(&self, text: impl Into<String>) -> Result<(), TyperError> {
        self.tx.send(text.into()).map_err(|_| TyperError::ThreadGone)
    }

    /// 等待已提交的键入完成后退出线程
    pub fn finish(self) {
        drop(self.tx);
        if self.thread.join().is_err() {
            tracing::warn!("Typing thread panicked");
        }
    }
}
