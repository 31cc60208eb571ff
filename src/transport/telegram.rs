//! Bot API transport adapter
//!
//! Thin long-polling client for the chat platform: receive updates, send and
//! edit messages, answer button presses, download voice files. No business
//! logic lives here.

use super::{
    Button, CallbackQuery, ChatId, Incoming, Keyboard, MediaRef, MessageRef, OutgoingMessage,
    Transport, TransportError, Update,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Server-side long-poll hold time.
const POLL_TIMEOUT_SECS: u64 = 50;
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Telegram {
    client: reqwest::Client,
    api_base: String,
    file_base: String,
    /// Next update id to request; advanced after every poll.
    offset: AtomicI64,
}

impl Telegram {
    pub fn new(token: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(CALL_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Io(format!("build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: format!("https://api.telegram.org/bot{token}"),
            file_base: format!("https://api.telegram.org/file/bot{token}"),
            offset: AtomicI64::new(0),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: Value,
        timeout: Option<Duration>,
    ) -> Result<T, TransportError> {
        let mut request = self
            .client
            .post(format!("{}/{}", self.api_base, method))
            .json(&payload);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Io(format!("{method}: {e}")))?;
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| TransportError::Io(format!("{method}: decode: {e}")))?;

        if !envelope.ok {
            return Err(TransportError::Api(format!(
                "{method}: {}",
                envelope.description.unwrap_or_else(|| "unknown error".to_string())
            )));
        }
        envelope
            .result
            .ok_or_else(|| TransportError::Api(format!("{method}: empty result")))
    }
}

#[async_trait]
impl Transport for Telegram {
    async fn poll(&self) -> Result<Vec<Update>, TransportError> {
        let offset = self.offset.load(Ordering::SeqCst);
        let wire: Vec<WireUpdate> = self
            .call(
                "getUpdates",
                json!({
                    "offset": offset,
                    "timeout": POLL_TIMEOUT_SECS,
                    "allowed_updates": ["message", "callback_query"],
                }),
                Some(Duration::from_secs(POLL_TIMEOUT_SECS + 10)),
            )
            .await?;

        let mut updates = Vec::with_capacity(wire.len());
        for item in wire {
            let next = item.update_id + 1;
            if next > self.offset.load(Ordering::SeqCst) {
                self.offset.store(next, Ordering::SeqCst);
            }
            updates.push(map_update(item));
        }
        Ok(updates)
    }

    async fn send(
        &self,
        chat: ChatId,
        message: OutgoingMessage,
    ) -> Result<MessageRef, TransportError> {
        let mut payload = json!({
            "chat_id": chat.0,
            "text": message.text,
        });
        if let Some(keyboard) = &message.keyboard {
            payload["reply_markup"] = keyboard_json(keyboard);
        }

        let sent: WireMessage = self.call("sendMessage", payload, None).await?;
        Ok(MessageRef {
            chat,
            message_id: sent.message_id,
        })
    }

    async fn edit(
        &self,
        target: MessageRef,
        message: OutgoingMessage,
    ) -> Result<(), TransportError> {
        let mut payload = json!({
            "chat_id": target.chat.0,
            "message_id": target.message_id,
            "text": message.text,
        });
        if let Some(keyboard) = &message.keyboard {
            payload["reply_markup"] = keyboard_json(keyboard);
        }

        // The API answers with the edited message or `true`; either way we
        // only care that the call succeeded.
        let _: Value = self.call("editMessageText", payload, None).await?;
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        alert: Option<&str>,
    ) -> Result<(), TransportError> {
        let mut payload = json!({ "callback_query_id": callback_id });
        if let Some(alert) = alert {
            payload["text"] = json!(alert);
            payload["show_alert"] = json!(true);
        }

        let _: Value = self.call("answerCallbackQuery", payload, None).await?;
        Ok(())
    }

    async fn download(&self, media: &MediaRef) -> Result<Vec<u8>, TransportError> {
        let file: WireFile = self
            .call("getFile", json!({ "file_id": media.file_id }), None)
            .await?;
        let path = file
            .file_path
            .ok_or_else(|| TransportError::Api("getFile: no file path".to_string()))?;

        let response = self
            .client
            .get(format!("{}/{}", self.file_base, path))
            .send()
            .await
            .map_err(|e| TransportError::Io(format!("download: {e}")))?;
        if !response.status().is_success() {
            return Err(TransportError::Api(format!(
                "download: HTTP {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Io(format!("download: {e}")))?;
        Ok(bytes.to_vec())
    }
}

fn keyboard_json(keyboard: &Keyboard) -> Value {
    let rows: Vec<Vec<Value>> = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|Button { label, payload }| {
                    json!({ "text": label, "callback_data": payload })
                })
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}

fn map_update(wire: WireUpdate) -> Update {
    if let Some(message) = wire.message {
        if let Some(from) = message.from {
            return Update::Message(Incoming {
                user: from.id.to_string(),
                chat: ChatId(message.chat.id),
                text: message.text,
                media: message.voice.map(|v| MediaRef { file_id: v.file_id }),
            });
        }
    }

    if let Some(callback) = wire.callback_query {
        if let Some(message) = callback.message {
            return Update::Callback(CallbackQuery {
                id: callback.id,
                user: callback.from.id.to_string(),
                message: MessageRef {
                    chat: ChatId(message.chat.id),
                    message_id: message.message_id,
                },
                data: callback.data.unwrap_or_default(),
            });
        }
    }

    Update::Other
}

// Platform wire types

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUpdate {
    update_id: i64,
    message: Option<WireMessage>,
    callback_query: Option<WireCallback>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    message_id: i64,
    from: Option<WireUser>,
    chat: WireChat,
    text: Option<String>,
    voice: Option<WireVoice>,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct WireChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct WireVoice {
    file_id: String,
}

#[derive(Debug, Deserialize)]
struct WireCallback {
    id: String,
    from: WireUser,
    message: Option<WireMessage>,
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireFile {
    file_path: Option<String>,
}
