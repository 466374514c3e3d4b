use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::info;

use embot_api::EmulatorApi;
use embot_core::config::{Config, RunMode};
use embot_core::cursor::FileCursorStore;
use embot_core::dispatch::Dispatcher;
use embot_core::domain::BotIdentity;
use embot_core::poll::{self, PollSettings};
use embot_core::ports::BotApi;

mod handlers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    embot_core::logging::init("embot");

    let cfg = Config::load()?;
    let bot = BotIdentity::from_token(&cfg.token)?;
    let api: Arc<dyn BotApi> = Arc::new(EmulatorApi::new(
        &cfg.api_base,
        &cfg.token,
        cfg.effective_poll_timeout_secs(),
    )?);

    // Identity check before any update work; a bad token or unreachable
    // emulator should fail loudly at startup, not in the loop.
    let profile = api
        .get_me()
        .await
        .with_context(|| format!("getMe against {} failed", cfg.api_base))?;
    info!(
        id = profile.id,
        name = %profile.first_name,
        username = profile.username.as_deref().unwrap_or("-"),
        "bot identity verified"
    );

    let store = Arc::new(FileCursorStore::new(cfg.state_dir.clone()));
    let dispatcher = Arc::new(Dispatcher::new(
        bot,
        api.clone(),
        store,
        handlers::stock_registry(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    match cfg.mode {
        RunMode::Polling | RunMode::LongPolling => {
            poll::run(api, dispatcher, PollSettings::from_config(&cfg), shutdown_rx).await;
        }
        RunMode::Webhook => {
            embot_webhook::serve(
                api,
                dispatcher,
                cfg.webhook_port,
                &cfg.webhook_public_url,
                shutdown_rx,
            )
            .await?;
        }
    }

    Ok(())
}
