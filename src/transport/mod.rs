//! Messaging transport contract
//!
//! The engine and dispatcher only ever see these types and the `Transport`
//! trait; the concrete chat platform lives behind it (`telegram`).

pub mod telegram;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatId(pub i64);

/// Address of a message we can later edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub chat: ChatId,
    pub message_id: i64,
}

/// One inline button: visible label plus opaque callback payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

impl Button {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

/// A grid of buttons attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        self.rows.push(buttons);
        self
    }
}

#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }
}

/// Reference to a media object the transport can download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub file_id: String,
}

/// An inbound chat message (text or voice).
#[derive(Debug, Clone)]
pub struct Incoming {
    pub user: String,
    pub chat: ChatId,
    pub text: Option<String>,
    pub media: Option<MediaRef>,
}

/// An inbound button press.
#[derive(Debug, Clone)]
pub struct CallbackQuery {
    pub id: String,
    pub user: String,
    pub message: MessageRef,
    pub data: String,
}

/// One transport event.
#[derive(Debug, Clone)]
pub enum Update {
    Message(Incoming),
    Callback(CallbackQuery),
    /// Seen but not consumed (edits, joins, ...); dropped silently.
    Other,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport I/O error: {0}")]
    Io(String),
    #[error("transport API error: {0}")]
    Api(String),
}

/// The messaging platform seam.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Long-poll the next batch of updates. Returns an empty batch on idle.
    async fn poll(&self) -> Result<Vec<Update>, TransportError>;

    async fn send(
        &self,
        chat: ChatId,
        message: OutgoingMessage,
    ) -> Result<MessageRef, TransportError>;

    async fn edit(
        &self,
        target: MessageRef,
        message: OutgoingMessage,
    ) -> Result<(), TransportError>;

    /// Acknowledge a button press, optionally with a popup alert.
    async fn answer_callback(
        &self,
        callback_id: &str,
        alert: Option<&str>,
    ) -> Result<(), TransportError>;

    async fn download(&self, media: &MediaRef) -> Result<Vec<u8>, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn poll(&self) -> Result<Vec<Update>, TransportError> {
        (**self).poll().await
    }

    async fn send(
        &self,
        chat: ChatId,
        message: OutgoingMessage,
    ) -> Result<MessageRef, TransportError> {
        (**self).send(chat, message).await
    }

    async fn edit(
        &self,
        target: MessageRef,
        message: OutgoingMessage,
    ) -> Result<(), TransportError> {
        (**self).edit(target, message).await
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        alert: Option<&str>,
    ) -> Result<(), TransportError> {
        (**self).answer_callback(callback_id, alert).await
    }

    async fn download(&self, media: &MediaRef) -> Result<Vec<u8>, TransportError> {
        (**self).download(media).await
    }
}
