//! Ports (traits) at the seams of the core.
//!
//! The remote messaging API and the handler set are both external
//! collaborators: the core depends on these contracts only, never on a wire
//! encoding or on what a handler does with its reply capability.

use async_trait::async_trait;

use crate::classify::{CallbackPress, Inbound};
use crate::domain::{ChatId, Cursor, UserId};
use crate::keyboard::ReplyMarkup;
use crate::update::RawUpdate;
use crate::Result;

/// Bot profile returned by the identity check at startup.
#[derive(Clone, Debug)]
pub struct BotProfile {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
}

/// Remote messaging API as consumed by the core.
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Fetch the bot's own identity. Failure here is fatal at startup.
    async fn get_me(&self) -> Result<BotProfile>;

    /// Fetch updates with `id >= offset`. `timeout_secs == 0` returns
    /// immediately with whatever is available; `> 0` long-polls. Transport
    /// trouble surfaces as `Error::Transport`.
    async fn get_updates(
        &self,
        offset: Cursor,
        timeout_secs: u64,
        limit: usize,
    ) -> Result<Vec<RawUpdate>>;

    /// Send a reply, optionally with a keyboard layout.
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> Result<()>;

    /// Acknowledge a callback query so the client stops showing the loading
    /// indicator. Distinct from any reply message.
    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<()>;

    async fn set_webhook(&self, url: &str) -> Result<()>;
    async fn delete_webhook(&self) -> Result<()>;
}

/// A parsed slash command handed to a command handler.
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    pub chat: ChatId,
    pub from: Option<UserId>,
    /// Lower-cased command word without the leading slash.
    pub name: String,
    /// Everything after the command word, trimmed.
    pub args: String,
}

/// Acknowledgement content for a callback query.
#[derive(Clone, Debug, Default)]
pub struct CallbackAck {
    pub text: Option<String>,
    pub show_alert: bool,
}

impl CallbackAck {
    pub fn notice(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            show_alert: false,
        }
    }

    pub fn alert(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            show_alert: true,
        }
    }
}

/// Handler for a registered slash command.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, api: &dyn BotApi, cmd: &Command) -> Result<()>;
}

/// Catch-all handler for free text (and unrecognized slash tokens).
#[async_trait]
pub trait TextHandler: Send + Sync {
    async fn handle(&self, api: &dyn BotApi, msg: &Inbound) -> Result<()>;
}

/// Handler for an inline-button press.
///
/// The dispatcher performs the acknowledgement itself, before `handle`, using
/// whatever `ack` returns; `handle` only sends replies. This keeps the
/// "exactly one acknowledgement per callback" invariant in one place.
#[async_trait]
pub trait CallbackHandler: Send + Sync {
    fn ack(&self, press: &CallbackPress) -> CallbackAck {
        let _ = press;
        CallbackAck::default()
    }

    async fn handle(&self, api: &dyn BotApi, press: &CallbackPress) -> Result<()>;
}
