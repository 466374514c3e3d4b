//! Update dispatch and cursor reconciliation.
//!
//! One dispatcher serves both ingestion modes; only the cursor-advance
//! policy differs. In polling mode a whole batch is handled in arrival order
//! and the cursor advances once afterwards, to `max(update_id) + 1`,
//! regardless of per-update failures. In webhook mode the cursor advances
//! immediately on receipt, before the handler runs: the remote pushes
//! at-most-once and does not replay from this bot's cursor, so delaying the
//! advance would only risk reprocessing after a local crash between receipt
//! and handling. The asymmetry is intentional; do not unify it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::classify::{classify, CallbackPress, ClassifiedUpdate, Inbound, UpdateKind};
use crate::cursor::CursorStore;
use crate::domain::{BotIdentity, Cursor, UpdateId};
use crate::ports::{BotApi, CallbackHandler, Command, CommandHandler, TextHandler};
use crate::update::RawUpdate;
use crate::{errors::Error, Result};

/// Terminal state of a single update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// A handler ran to completion (including the degraded callback path).
    Handled,
    /// A handler returned an error; logged, never retried by the core.
    Failed,
    /// `update_id` below the cursor; defensively dropped, never dispatched.
    Stale,
    /// No handler applies (edited message, unrecognized kind).
    Ignored,
}

/// Registered handler set. Command and callback lookups are exact matches;
/// command names are case-insensitive.
pub struct HandlerRegistry {
    commands: HashMap<String, Arc<dyn CommandHandler>>,
    text: Arc<dyn TextHandler>,
    callbacks: HashMap<String, Arc<dyn CallbackHandler>>,
    unknown_callback: Arc<dyn CallbackHandler>,
}

impl HandlerRegistry {
    pub fn new(text: Arc<dyn TextHandler>, unknown_callback: Arc<dyn CallbackHandler>) -> Self {
        Self {
            commands: HashMap::new(),
            text,
            callbacks: HashMap::new(),
            unknown_callback,
        }
    }

    pub fn command(mut self, name: &str, handler: Arc<dyn CommandHandler>) -> Self {
        self.commands.insert(name.to_ascii_lowercase(), handler);
        self
    }

    pub fn callback(mut self, data: &str, handler: Arc<dyn CallbackHandler>) -> Self {
        self.callbacks.insert(data.to_string(), handler);
        self
    }
}

/// Summary of one polling batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub handled: usize,
    pub failed: usize,
    pub ignored: usize,
    pub stale: usize,
}

/// Routes classified updates to handlers and owns the cursor.
///
/// `on_update` may be called concurrently for distinct updates; all cursor
/// writes go through one mutex (single-writer discipline), and the store
/// save happens under that same lock so persisted values land in cursor
/// order and never regress.
pub struct Dispatcher {
    bot: BotIdentity,
    api: Arc<dyn BotApi>,
    store: Arc<dyn CursorStore>,
    registry: HandlerRegistry,
    cursor: Mutex<Cursor>,
}

impl Dispatcher {
    /// Loads the persisted cursor for `bot` (soft-failing to 0).
    pub fn new(
        bot: BotIdentity,
        api: Arc<dyn BotApi>,
        store: Arc<dyn CursorStore>,
        registry: HandlerRegistry,
    ) -> Self {
        let cursor = store.load(&bot);
        info!(bot = %bot, cursor = %cursor, "dispatcher ready");
        Self {
            bot,
            api,
            store,
            registry,
            cursor: Mutex::new(cursor),
        }
    }

    /// Current cursor value (for the next fetch and the health endpoint).
    pub async fn cursor(&self) -> Cursor {
        *self.cursor.lock().await
    }

    /// Polling mode: handle a fetched batch in arrival order, then advance
    /// the cursor once past the highest update id seen. Per-update failures
    /// do not halt the batch and do not hold the cursor back.
    pub async fn dispatch_batch(&self, batch: &[RawUpdate]) -> BatchOutcome {
        let start = self.cursor().await;
        let mut outcome = BatchOutcome::default();
        let mut max_id: Option<UpdateId> = None;

        for raw in batch {
            let id = raw.id();
            if start.covers(id) {
                // The remote is supposed to filter below the offset; tolerate
                // it not doing so.
                debug!(update_id = id.0, cursor = %start, "stale update dropped");
                outcome.stale += 1;
                continue;
            }
            max_id = Some(max_id.map_or(id, |m| m.max(id)));

            match self.route(classify(raw)).await {
                Disposition::Handled => outcome.handled += 1,
                Disposition::Failed => outcome.failed += 1,
                Disposition::Ignored => outcome.ignored += 1,
                Disposition::Stale => outcome.stale += 1,
            }
        }

        if let Some(id) = max_id {
            self.advance_to(Cursor::after(id)).await;
        }
        outcome
    }

    /// Webhook mode: accept one pushed update. The cursor advances (and is
    /// persisted) before the handler runs, independent of its outcome;
    /// duplicate pushes below the cursor are dropped.
    pub async fn on_update(&self, raw: RawUpdate) -> Result<()> {
        let id = raw.id();
        {
            let mut cursor = self.cursor.lock().await;
            if cursor.covers(id) {
                debug!(update_id = id.0, cursor = %*cursor, "duplicate push dropped");
                return Ok(());
            }
            *cursor = Cursor::after(id);
            self.persist(*cursor);
        }

        match self.route(classify(&raw)).await {
            Disposition::Failed => Err(Error::Processing(format!(
                "handler failed for update {}",
                id.0
            ))),
            _ => Ok(()),
        }
    }

    async fn advance_to(&self, next: Cursor) {
        let mut cursor = self.cursor.lock().await;
        if next <= *cursor {
            return;
        }
        *cursor = next;
        self.persist(next);
    }

    // Called with the cursor lock held, keeping store writes serialized.
    fn persist(&self, cursor: Cursor) {
        if let Err(e) = self.store.save(&self.bot, cursor) {
            // In-memory state stays authoritative for the running process.
            error!(bot = %self.bot, cursor = %cursor, error = %e, "cursor save failed");
        }
    }

    async fn route(&self, update: ClassifiedUpdate) -> Disposition {
        let id = update.update_id;
        match update.kind {
            UpdateKind::Message(inbound) => self.route_message(id, inbound).await,
            UpdateKind::EditedMessage(inbound) => {
                debug!(update_id = id.0, chat = inbound.chat.0, "edited message ignored");
                Disposition::Ignored
            }
            UpdateKind::Callback(press) => self.route_callback(id, press).await,
            UpdateKind::Unknown => {
                warn!(update_id = id.0, "unrecognized update kind ignored");
                Disposition::Ignored
            }
        }
    }

    async fn route_message(&self, id: UpdateId, inbound: Inbound) -> Disposition {
        if let Some(cmd) = parse_command(&inbound) {
            if let Some(handler) = self.registry.commands.get(&cmd.name) {
                debug!(update_id = id.0, command = %cmd.name, "routing command");
                return self.finish(id, handler.handle(self.api.as_ref(), &cmd).await);
            }
            // Unrecognized slash tokens are not rejected; the catch-all text
            // handler sees the original text.
        }
        self.finish(id, self.registry.text.handle(self.api.as_ref(), &inbound).await)
    }

    async fn route_callback(&self, id: UpdateId, press: CallbackPress) -> Disposition {
        let handler = self
            .registry
            .callbacks
            .get(&press.data)
            .unwrap_or(&self.registry.unknown_callback);

        // Every callback gets exactly one acknowledgement, matched or not;
        // otherwise the client shows a perpetual loading indicator.
        let ack = handler.ack(&press);
        if let Err(e) = self
            .api
            .answer_callback(&press.callback_id, ack.text.as_deref(), ack.show_alert)
            .await
        {
            warn!(update_id = id.0, error = %e, "callback acknowledgement failed");
        }

        if press.chat.is_none() {
            // Degraded path: nowhere to send a reply.
            warn!(update_id = id.0, data = %press.data, "callback without chat id, reply skipped");
            return Disposition::Handled;
        }

        self.finish(id, handler.handle(self.api.as_ref(), &press).await)
    }

    fn finish(&self, id: UpdateId, result: Result<()>) -> Disposition {
        match result {
            Ok(()) => Disposition::Handled,
            Err(e) => {
                error!(update_id = id.0, error = %e, "handler failed");
                Disposition::Failed
            }
        }
    }
}

/// Parse a leading-slash command from a message. Returns `None` for plain
/// text; matching is by the first whitespace-separated token, lower-cased.
fn parse_command(inbound: &Inbound) -> Option<Command> {
    let text = inbound.text.trim();
    let mut parts = text.splitn(2, char::is_whitespace);
    let head = parts.next()?;
    let name = head.strip_prefix('/')?;
    if name.is_empty() {
        return None;
    }
    Some(Command {
        chat: inbound.chat,
        from: inbound.from,
        name: name.to_ascii_lowercase(),
        args: parts.next().unwrap_or("").trim().to_string(),
    })
}
