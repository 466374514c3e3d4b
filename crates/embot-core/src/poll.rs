//! Pull-mode ingestion loop.
//!
//! Fetches batches at the dispatcher's cursor and hands them over whole.
//! Transport trouble never kills the loop; it logs, backs off and retries
//! with the same offset. Shutdown is cooperative via a watch channel and
//! interrupts both the in-flight fetch and any backoff sleep.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::ports::BotApi;

#[derive(Clone, Copy, Debug)]
pub struct PollSettings {
    /// Server-held long-poll timeout; 0 means return immediately.
    pub timeout_secs: u64,
    pub limit: usize,
    /// Pause after an empty immediate fetch (plain polling only).
    pub idle_delay: Duration,
    pub error_backoff: Duration,
}

impl PollSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            timeout_secs: cfg.effective_poll_timeout_secs(),
            limit: cfg.poll_limit,
            idle_delay: cfg.poll_idle_delay,
            error_backoff: cfg.poll_error_backoff,
        }
    }
}

/// Run the fetch/dispatch loop until `shutdown` flips to true.
pub async fn run(
    api: Arc<dyn BotApi>,
    dispatcher: Arc<Dispatcher>,
    settings: PollSettings,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(
        timeout_secs = settings.timeout_secs,
        limit = settings.limit,
        "poll loop started"
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        let offset = dispatcher.cursor().await;
        let fetched = tokio::select! {
            res = api.get_updates(offset, settings.timeout_secs, settings.limit) => res,
            _ = shutdown.changed() => break,
        };

        match fetched {
            Ok(batch) if batch.is_empty() => {
                if settings.timeout_secs == 0
                    && sleep_or_shutdown(settings.idle_delay, &mut shutdown).await
                {
                    break;
                }
            }
            Ok(batch) => {
                debug!(count = batch.len(), offset = %offset, "batch received");
                let outcome = dispatcher.dispatch_batch(&batch).await;
                if outcome.failed > 0 {
                    warn!(failed = outcome.failed, "batch had handler failures");
                }
            }
            Err(e) => {
                warn!(error = %e, offset = %offset, "update fetch failed, backing off");
                if sleep_or_shutdown(settings.error_backoff, &mut shutdown).await {
                    break;
                }
            }
        }
    }

    info!("poll loop stopped");
}

/// Sleep for `duration` unless shutdown arrives first. Returns true on
/// shutdown (including a dropped sender).
async fn sleep_or_shutdown(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = shutdown.changed() => true,
    }
}
