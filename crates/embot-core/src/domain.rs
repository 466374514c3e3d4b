use crate::{errors::Error, Result};

/// Chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// User id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i64);

/// Update id assigned by the remote side, strictly increasing per bot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UpdateId(pub i64);

/// Smallest update id not yet requested/accepted. Never decreases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor(pub i64);

impl Cursor {
    /// Cursor positioned just past `id`.
    pub fn after(id: UpdateId) -> Self {
        Cursor(id.0 + 1)
    }

    /// True if `id` was already requested/accepted under this cursor.
    pub fn covers(&self, id: UpdateId) -> bool {
        id.0 < self.0
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Stable identity of a bot, used to key persisted cursor state so
/// concurrently-run instances for different bots never collide.
///
/// Derived from the numeric prefix of the bot token (`{id}:{secret}`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BotIdentity(String);

impl BotIdentity {
    pub fn from_token(token: &str) -> Result<Self> {
        let prefix = token.split(':').next().unwrap_or_default().trim();
        if prefix.is_empty() {
            return Err(Error::Config("bot token has no identity prefix".into()));
        }
        Ok(BotIdentity(prefix.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BotIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
