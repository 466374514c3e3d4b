//! Wire model of incoming updates.
//!
//! The emulator serves two different message shapes. `message` and
//! `edited_message` carry the Telegram layout (nested `chat.id`), while
//! `callback_query` embeds the emulator's internal message record, where the
//! chat id is a flat `chat_id` field and the message id is `id`. Both shapes
//! are kept as-is here; the classifier is the single place that turns them
//! into routing fields.

use serde::{Deserialize, Serialize};

use crate::domain::UpdateId;

/// One raw update as delivered by the remote side. Immutable once received.
///
/// At most one payload field is populated in practice, but nothing here
/// assumes that; precedence is applied by the classifier.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RawUpdate {
    pub update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<WireMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_message: Option<WireMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_query: Option<WireCallbackQuery>,
}

impl RawUpdate {
    pub fn id(&self) -> UpdateId {
        UpdateId(self.update_id)
    }
}

/// Telegram-shaped message payload.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct WireMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<WireChat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<WireUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct WireChat {
    pub id: i64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct WireUser {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Callback-query payload (inline button press).
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct WireCallbackQuery {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<WireUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<WireCallbackMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Message embedded in a callback query.
///
/// This is the emulator's internal record: the chat id lives in the flat
/// `chat_id` field. It is intentionally not reconstructed from anywhere
/// else; when `chat_id` is absent the update has no usable chat.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct WireCallbackMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}
