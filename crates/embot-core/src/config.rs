use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// How the process receives updates. The two modes are mutually exclusive
/// for one bot token; running both would race on the cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Repeated `getUpdates` with `timeout=0` plus an idle delay.
    Polling,
    /// `getUpdates` with a server-held timeout.
    LongPolling,
    /// HTTP server registered via `setWebhook`.
    Webhook,
}

impl RunMode {
    fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "polling" => Ok(Self::Polling),
            "long-polling" | "long_polling" | "longpolling" => Ok(Self::LongPolling),
            "webhook" => Ok(Self::Webhook),
            other => Err(Error::Config(format!(
                "RUN_MODE must be polling, long-polling or webhook (got {other:?})"
            ))),
        }
    }
}

/// Typed runtime configuration, loaded from the environment (with an
/// optional `.env` file that never overrides real env vars).
#[derive(Clone, Debug)]
pub struct Config {
    pub token: String,
    pub api_base: String,
    pub mode: RunMode,
    pub state_dir: PathBuf,

    // Polling
    pub poll_timeout_secs: u64,
    pub poll_limit: usize,
    pub poll_idle_delay: Duration,
    pub poll_error_backoff: Duration,

    // Webhook
    pub webhook_port: u16,
    pub webhook_public_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let token = env_str("BOT_TOKEN").unwrap_or_default();
        if token.trim().is_empty() {
            return Err(Error::Config(
                "BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let api_base = env_str("API_BASE_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| "http://localhost:3001".to_string())
            .trim_end_matches('/')
            .to_string();

        let mode = match env_str("RUN_MODE").and_then(non_empty) {
            Some(s) => RunMode::parse(&s)?,
            None => RunMode::LongPolling,
        };

        let state_dir = env_path("STATE_DIR").unwrap_or_else(|| PathBuf::from("."));

        let poll_timeout_secs = env_u64("POLL_TIMEOUT_SECS").unwrap_or(30);
        let poll_limit = env_usize("POLL_LIMIT").unwrap_or(100);
        let poll_idle_delay = Duration::from_millis(env_u64("POLL_IDLE_DELAY_MS").unwrap_or(1000));
        let poll_error_backoff =
            Duration::from_secs(env_u64("POLL_ERROR_BACKOFF_SECS").unwrap_or(5));

        let webhook_port = env_u16("WEBHOOK_PORT").unwrap_or(8080);
        let webhook_public_url = env_str("WEBHOOK_PUBLIC_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| format!("http://localhost:{webhook_port}/webhook"));

        if poll_limit == 0 {
            return Err(Error::Config("POLL_LIMIT must be at least 1".to_string()));
        }

        Ok(Self {
            token,
            api_base,
            mode,
            state_dir,
            poll_timeout_secs,
            poll_limit,
            poll_idle_delay,
            poll_error_backoff,
            webhook_port,
            webhook_public_url,
        })
    }

    /// Effective `getUpdates` timeout for the configured mode: plain polling
    /// always asks for an immediate answer.
    pub fn effective_poll_timeout_secs(&self) -> u64 {
        match self.mode {
            RunMode::Polling => 0,
            _ => self.poll_timeout_secs,
        }
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u16(key: &str) -> Option<u16> {
    env_str(key).and_then(|s| s.trim().parse::<u16>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_mode_parses_all_spellings() {
        assert_eq!(RunMode::parse("polling").unwrap(), RunMode::Polling);
        assert_eq!(RunMode::parse("Long-Polling").unwrap(), RunMode::LongPolling);
        assert_eq!(RunMode::parse("long_polling").unwrap(), RunMode::LongPolling);
        assert_eq!(RunMode::parse("webhook").unwrap(), RunMode::Webhook);
        assert!(RunMode::parse("push").is_err());
    }

    #[test]
    fn plain_polling_forces_zero_timeout() {
        let cfg = Config {
            token: "1:t".into(),
            api_base: "http://localhost:3001".into(),
            mode: RunMode::Polling,
            state_dir: PathBuf::from("."),
            poll_timeout_secs: 30,
            poll_limit: 100,
            poll_idle_delay: Duration::from_millis(1000),
            poll_error_backoff: Duration::from_secs(5),
            webhook_port: 8080,
            webhook_public_url: "http://localhost:8080/webhook".into(),
        };
        assert_eq!(cfg.effective_poll_timeout_secs(), 0);
        let cfg = Config {
            mode: RunMode::LongPolling,
            ..cfg
        };
        assert_eq!(cfg.effective_poll_timeout_secs(), 30);
    }
}
