//! Transport seam.
//!
//! The engine only ever talks to this trait; the Telegram adapter lives
//! in `telegram.rs` and the tests drive an in-memory implementation.

use async_trait::async_trait;
use servicefix_common::{ChatId, MenuButton, ServiceFixError};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Plain text message to one channel.
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), ServiceFixError>;

    /// Text plus button rows; each button carries a typed action.
    async fn send_menu(
        &self,
        chat: ChatId,
        text: &str,
        rows: Vec<Vec<MenuButton>>,
    ) -> Result<(), ServiceFixError>;

    /// Downloadable artifact (CSV exports).
    async fn send_document(
        &self,
        chat: ChatId,
        filename: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> Result<(), ServiceFixError>;
}

/// Everything a transport was asked to deliver, for assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text {
        chat: ChatId,
        text: String,
    },
    Menu {
        chat: ChatId,
        text: String,
        rows: Vec<Vec<MenuButton>>,
    },
    Document {
        chat: ChatId,
        filename: String,
        bytes: Vec<u8>,
    },
}

/// In-memory transport used by the integration tests.
#[derive(Default)]
pub struct MemoryTransport {
    sent: tokio::sync::Mutex<Vec<Sent>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything sent so far.
    pub async fn take(&self) -> Vec<Sent> {
        std::mem::take(&mut *self.sent.lock().await)
    }

    /// Text bodies (plain and menu) delivered to one chat, in order.
    pub async fn texts_for(&self, chat: ChatId) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|s| match s {
                Sent::Text { chat: c, text } if *c == chat => Some(text.clone()),
                Sent::Menu { chat: c, text, .. } if *c == chat => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Most recent menu sent to one chat.
    pub async fn last_menu(&self, chat: ChatId) -> Option<(String, Vec<Vec<MenuButton>>)> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find_map(|s| match s {
                Sent::Menu {
                    chat: c,
                    text,
                    rows,
                } if *c == chat => Some((text.clone(), rows.clone())),
                _ => None,
            })
    }

    /// Documents delivered to one chat.
    pub async fn documents_for(&self, chat: ChatId) -> Vec<(String, Vec<u8>)> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|s| match s {
                Sent::Document {
                    chat: c,
                    filename,
                    bytes,
                } if *c == chat => Some((filename.clone(), bytes.clone())),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), ServiceFixError> {
        self.sent.lock().await.push(Sent::Text {
            chat,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_menu(
        &self,
        chat: ChatId,
        text: &str,
        rows: Vec<Vec<MenuButton>>,
    ) -> Result<(), ServiceFixError> {
        self.sent.lock().await.push(Sent::Menu {
            chat,
            text: text.to_string(),
            rows,
        });
        Ok(())
    }

    async fn send_document(
        &self,
        chat: ChatId,
        filename: &str,
        bytes: Vec<u8>,
        _caption: &str,
    ) -> Result<(), ServiceFixError> {
        self.sent.lock().await.push(Sent::Document {
            chat,
            filename: filename.to_string(),
            bytes,
        });
        Ok(())
    }
}
