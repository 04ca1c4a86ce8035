//! Telegram Bot API transport adapter.
//!
//! Long-polls `getUpdates` and decodes each update into a typed
//! [`InboundEvent`] right here at the boundary: commands are split into
//! name/args, callback data is parsed into [`ButtonAction`], and anything
//! unrecognized is dropped. Outbound messages go through the Bot API
//! (`sendMessage`, `sendDocument`).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use servicefix_common::{
    ButtonAction, ChatId, InboundEvent, InboundKind, MenuButton, ServiceFixError,
};

use crate::engine::Engine;
use crate::transport::Transport;

// ---------- wire types ----------

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: ChatId,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<ReplyMarkup>,
}

#[derive(Debug, Serialize)]
struct ReplyMarkup {
    inline_keyboard: Vec<Vec<InlineButton>>,
}

#[derive(Debug, Serialize)]
struct InlineButton {
    text: String,
    callback_data: String,
}

#[derive(Debug, Serialize)]
struct GetUpdates {
    offset: i64,
    timeout: u64,
}

#[derive(Debug, Serialize)]
struct AnswerCallback<'a> {
    callback_query_id: &'a str,
}

// ---------- adapter ----------

pub struct TelegramTransport {
    client: reqwest::Client,
    token: String,
    poll_timeout_secs: u64,
}

impl TelegramTransport {
    pub fn new(token: String, poll_timeout_secs: u64) -> Result<Self, ServiceFixError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + 10))
            .build()
            .map_err(|e| ServiceFixError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            token,
            poll_timeout_secs,
        })
    }

    fn url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.token)
    }

    async fn call<T, P>(&self, method: &str, payload: &P) -> Result<T, ServiceFixError>
    where
        T: serde::de::DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let response = self
            .client
            .post(self.url(method))
            .json(payload)
            .send()
            .await
            .map_err(|e| ServiceFixError::Transport(format!("{method}: {e}")))?;

        let body: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| ServiceFixError::Transport(format!("{method}: {e}")))?;

        if !body.ok {
            return Err(ServiceFixError::Transport(format!(
                "{method}: {}",
                body.description.unwrap_or_else(|| "unknown error".into())
            )));
        }
        body.result
            .ok_or_else(|| ServiceFixError::Transport(format!("{method}: empty result")))
    }

    /// Long-poll loop: fetch updates, decode, hand to the engine. Updates
    /// for one chat arrive in order and are handled to completion before
    /// the next, matching the per-channel ordering the engine assumes.
    pub async fn run(&self, engine: &Engine) -> Result<(), ServiceFixError> {
        let mut offset = 0i64;
        loop {
            let updates: Vec<Update> = match self
                .call(
                    "getUpdates",
                    &GetUpdates {
                        offset,
                        timeout: self.poll_timeout_secs,
                    },
                )
                .await
            {
                Ok(u) => u,
                Err(err) => {
                    error!("getUpdates failed: {err}");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);

                if let Some(cb) = &update.callback_query {
                    // ack the press so the client stops its spinner
                    let ack: Result<bool, _> = self
                        .call("answerCallbackQuery", &AnswerCallback {
                            callback_query_id: &cb.id,
                        })
                        .await;
                    if let Err(err) = ack {
                        warn!("answerCallbackQuery failed: {err}");
                    }
                }

                if let Some(event) = decode_update(update) {
                    engine.handle(event).await;
                }
            }
        }
    }
}

/// Decode one raw update into a typed event. Returns `None` for updates
/// the bot does not react to (stickers, edits, malformed callbacks).
pub fn decode_update(update: Update) -> Option<InboundEvent> {
    if let Some(message) = update.message {
        let text = message.text?;
        let kind = match parse_command(&text) {
            Some((name, args)) => InboundKind::Command { name, args },
            None => InboundKind::Text(text),
        };
        return Some(InboundEvent {
            chat: message.chat.id,
            kind,
        });
    }

    if let Some(callback) = update.callback_query {
        let chat = callback
            .message
            .as_ref()
            .map(|m| m.chat.id)
            .unwrap_or(callback.from.id);
        let data = callback.data?;
        let Some(action) = ButtonAction::decode(&data) else {
            debug!("dropping unknown callback data: {data}");
            return None;
        };
        return Some(InboundEvent {
            chat,
            kind: InboundKind::Button(action),
        });
    }

    None
}

/// "/closeticket 3" -> ("closeticket", ["3"]). Handles the "@botname"
/// suffix Telegram appends in group chats. Returns `None` for plain text.
fn parse_command(text: &str) -> Option<(String, Vec<String>)> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;
    let mut parts = rest.split_whitespace();
    let head = parts.next()?;
    let name = head
        .split('@')
        .next()
        .unwrap_or(head)
        .to_lowercase();
    if name.is_empty() {
        return None;
    }
    let args = parts.map(str::to_string).collect();
    Some((name, args))
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), ServiceFixError> {
        let _: Message = self
            .call(
                "sendMessage",
                &SendMessage {
                    chat_id: chat,
                    text,
                    reply_markup: None,
                },
            )
            .await?;
        Ok(())
    }

    async fn send_menu(
        &self,
        chat: ChatId,
        text: &str,
        rows: Vec<Vec<MenuButton>>,
    ) -> Result<(), ServiceFixError> {
        let inline_keyboard = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|button| InlineButton {
                        callback_data: button.action.encode(),
                        text: button.label,
                    })
                    .collect()
            })
            .collect();

        let _: Message = self
            .call(
                "sendMessage",
                &SendMessage {
                    chat_id: chat,
                    text,
                    reply_markup: Some(ReplyMarkup { inline_keyboard }),
                },
            )
            .await?;
        Ok(())
    }

    async fn send_document(
        &self,
        chat: ChatId,
        filename: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> Result<(), ServiceFixError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("text/csv")
            .map_err(|e| ServiceFixError::Transport(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat.to_string())
            .text("caption", caption.to_string())
            .part("document", part);

        let response = self
            .client
            .post(self.url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ServiceFixError::Transport(format!("sendDocument: {e}")))?;

        let body: ApiResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| ServiceFixError::Transport(format!("sendDocument: {e}")))?;
        if !body.ok {
            return Err(ServiceFixError::Transport(format!(
                "sendDocument: {}",
                body.description.unwrap_or_else(|| "unknown error".into())
            )));
        }
        Ok(())
    }
}
