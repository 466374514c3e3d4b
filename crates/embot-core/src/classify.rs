//! Update classification.
//!
//! `classify` is a pure function from the raw wire record to a tagged union
//! with the routing fields extracted once. Dispatch logic never digs into
//! the raw payload again.

use crate::domain::{ChatId, MessageId, UpdateId, UserId};
use crate::update::RawUpdate;

/// A raw update plus derived routing fields.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifiedUpdate {
    pub update_id: UpdateId,
    pub kind: UpdateKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum UpdateKind {
    Message(Inbound),
    EditedMessage(Inbound),
    Callback(CallbackPress),
    Unknown,
}

/// An inbound chat message (new or edited).
#[derive(Clone, Debug, PartialEq)]
pub struct Inbound {
    pub chat: ChatId,
    pub from: Option<UserId>,
    pub text: String,
}

/// An inline-button press.
#[derive(Clone, Debug, PartialEq)]
pub struct CallbackPress {
    pub callback_id: String,
    /// Exact routing key for the callback handler table.
    pub data: String,
    /// Extracted from the embedded message's flat `chat_id` field only.
    /// Absent when the payload carries no usable chat; the dispatcher treats
    /// that as a distinct, handleable condition.
    pub chat: Option<ChatId>,
    pub from: Option<UserId>,
    pub message_id: Option<MessageId>,
}

/// Classify a raw update.
///
/// Precedence when multiple payloads are present (the source is not trusted
/// to enforce exclusivity): message > edited_message > callback_query >
/// unknown. First match wins, deterministically.
pub fn classify(raw: &RawUpdate) -> ClassifiedUpdate {
    let update_id = raw.id();

    if let Some(msg) = &raw.message {
        if let Some(chat) = &msg.chat {
            return ClassifiedUpdate {
                update_id,
                kind: UpdateKind::Message(Inbound {
                    chat: ChatId(chat.id),
                    from: msg.from.as_ref().map(|u| UserId(u.id)),
                    text: msg.text.clone().unwrap_or_default(),
                }),
            };
        }
        // A message without a chat cannot be routed anywhere.
        return ClassifiedUpdate {
            update_id,
            kind: UpdateKind::Unknown,
        };
    }

    if let Some(msg) = &raw.edited_message {
        if let Some(chat) = &msg.chat {
            return ClassifiedUpdate {
                update_id,
                kind: UpdateKind::EditedMessage(Inbound {
                    chat: ChatId(chat.id),
                    from: msg.from.as_ref().map(|u| UserId(u.id)),
                    text: msg.text.clone().unwrap_or_default(),
                }),
            };
        }
        return ClassifiedUpdate {
            update_id,
            kind: UpdateKind::Unknown,
        };
    }

    if let Some(cq) = &raw.callback_query {
        let embedded = cq.message.as_ref();
        return ClassifiedUpdate {
            update_id,
            kind: UpdateKind::Callback(CallbackPress {
                callback_id: cq.id.clone(),
                data: cq.data.clone().unwrap_or_default(),
                chat: embedded.and_then(|m| m.chat_id).map(ChatId),
                from: cq.from.as_ref().map(|u| UserId(u.id)),
                message_id: embedded.and_then(|m| m.id).map(MessageId),
            }),
        };
    }

    ClassifiedUpdate {
        update_id,
        kind: UpdateKind::Unknown,
    }
}
