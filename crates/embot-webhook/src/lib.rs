//! Push-mode ingestion: an axum server the emulator delivers updates to.
//!
//! Serves:
//! - `POST /webhook`: one update per request
//! - `GET  /health`:  liveness plus the current cursor
//!
//! Registration is part of the server lifecycle: `setWebhook` before
//! accepting traffic, `deleteWebhook` on the way out so a restarted process
//! can switch back to polling without a stale registration.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tokio::sync::watch;
use tracing::{info, warn};

use embot_core::dispatch::Dispatcher;
use embot_core::ports::BotApi;
use embot_core::update::RawUpdate;

#[derive(Clone)]
pub struct WebhookState {
    pub dispatcher: Arc<Dispatcher>,
}

pub fn build_router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", post(receive_update))
        .route("/health", get(health))
        .with_state(state)
}

/// Run the webhook server until `shutdown` flips to true.
pub async fn serve(
    api: Arc<dyn BotApi>,
    dispatcher: Arc<Dispatcher>,
    port: u16,
    public_url: &str,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    api.set_webhook(public_url).await?;
    info!(url = public_url, "webhook registered");

    let app = build_router(WebhookState { dispatcher });
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let served: std::io::Result<()> = async {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(%addr, "webhook server listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await
    }
    .await;

    // Unregister on every exit path, so the next run (possibly in polling
    // mode) never inherits a stale registration.
    if let Err(e) = api.delete_webhook().await {
        warn!(error = %e, "webhook deregistration failed");
    }
    served?;
    info!("webhook server stopped");
    Ok(())
}

/// POST /webhook: dispatch one pushed update.
async fn receive_update(
    State(state): State<WebhookState>,
    Json(raw): Json<RawUpdate>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.dispatcher.on_update(raw).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "ok": true }))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "ok": false, "description": e.to_string() })),
        ),
    }
}

/// GET /health: liveness check, reporting the cursor for observability.
async fn health(State(state): State<WebhookState>) -> Json<serde_json::Value> {
    let cursor = state.dispatcher.cursor().await;
    Json(serde_json::json!({
        "status": "ok",
        "cursor": cursor.0,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Mutex as StdMutex;
    use tower::ServiceExt;

    use embot_core::classify::{CallbackPress, Inbound};
    use embot_core::cursor::CursorStore;
    use embot_core::dispatch::HandlerRegistry;
    use embot_core::domain::{BotIdentity, ChatId, Cursor};
    use embot_core::errors::Error;
    use embot_core::keyboard::ReplyMarkup;
    use embot_core::ports::{BotProfile, CallbackHandler, TextHandler};
    use embot_core::Result;

    #[derive(Default)]
    struct RecordingApi {
        sent: StdMutex<Vec<(i64, String)>>,
        deregistered: StdMutex<bool>,
    }

    #[async_trait]
    impl BotApi for RecordingApi {
        async fn get_me(&self) -> Result<BotProfile> {
            Ok(BotProfile {
                id: 1,
                first_name: "test".into(),
                username: None,
            })
        }

        async fn get_updates(
            &self,
            _offset: Cursor,
            _timeout_secs: u64,
            _limit: usize,
        ) -> Result<Vec<RawUpdate>> {
            Ok(Vec::new())
        }

        async fn send_message(
            &self,
            chat: ChatId,
            text: &str,
            _markup: Option<&ReplyMarkup>,
        ) -> Result<()> {
            self.sent.lock().unwrap().push((chat.0, text.to_string()));
            Ok(())
        }

        async fn answer_callback(
            &self,
            _callback_id: &str,
            _text: Option<&str>,
            _show_alert: bool,
        ) -> Result<()> {
            Ok(())
        }

        async fn set_webhook(&self, _url: &str) -> Result<()> {
            Ok(())
        }

        async fn delete_webhook(&self) -> Result<()> {
            *self.deregistered.lock().unwrap() = true;
            Ok(())
        }
    }

    struct NullStore;

    impl CursorStore for NullStore {
        fn load(&self, _bot: &BotIdentity) -> Cursor {
            Cursor(100)
        }

        fn save(&self, _bot: &BotIdentity, _cursor: Cursor) -> Result<()> {
            Ok(())
        }
    }

    struct EchoText;

    #[async_trait]
    impl TextHandler for EchoText {
        async fn handle(&self, api: &dyn BotApi, msg: &Inbound) -> Result<()> {
            if msg.text == "boom" {
                return Err(Error::Processing("boom".into()));
            }
            api.send_message(msg.chat, &msg.text, None).await
        }
    }

    struct NullCallback;

    #[async_trait]
    impl CallbackHandler for NullCallback {
        async fn handle(&self, _api: &dyn BotApi, _press: &CallbackPress) -> Result<()> {
            Ok(())
        }
    }

    fn state() -> (Arc<RecordingApi>, WebhookState) {
        let api = Arc::new(RecordingApi::default());
        let registry = HandlerRegistry::new(Arc::new(EchoText), Arc::new(NullCallback));
        let dispatcher = Arc::new(Dispatcher::new(
            BotIdentity::from_token("1:t").unwrap(),
            api.clone(),
            Arc::new(NullStore),
            registry,
        ));
        (api, WebhookState { dispatcher })
    }

    fn update_body(id: i64, text: &str) -> String {
        serde_json::json!({
            "update_id": id,
            "message": {
                "message_id": 1,
                "chat": { "id": 7 },
                "text": text,
            }
        })
        .to_string()
    }

    fn post_webhook(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .expect("request")
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn health_reports_cursor() {
        let (_api, state) = state();
        let app = build_router(state);
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .expect("response");

        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["cursor"], 100);
    }

    #[tokio::test]
    async fn push_dispatches_and_advances_cursor() {
        let (api, state) = state();
        let dispatcher = state.dispatcher.clone();
        let app = build_router(state);

        let resp = app.oneshot(post_webhook(update_body(120, "hi"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["ok"], true);
        assert_eq!(dispatcher.cursor().await, Cursor(121));
        assert_eq!(api.sent.lock().unwrap().as_slice(), &[(7, "hi".into())]);
    }

    #[tokio::test]
    async fn handler_failure_returns_500_but_cursor_stays_advanced() {
        let (_api, state) = state();
        let dispatcher = state.dispatcher.clone();
        let app = build_router(state);

        let resp = app.oneshot(post_webhook(update_body(130, "boom"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["ok"], false);
        assert_eq!(dispatcher.cursor().await, Cursor(131));
    }

    #[tokio::test]
    async fn bind_failure_still_deregisters_webhook() {
        let (api, state) = state();
        // Occupy the port so the server cannot bind.
        let holder = tokio::net::TcpListener::bind("0.0.0.0:0").await.unwrap();
        let port = holder.local_addr().unwrap().port();
        let (_tx, rx) = watch::channel(false);

        let result = serve(
            api.clone() as Arc<dyn BotApi>,
            state.dispatcher,
            port,
            "http://localhost/webhook",
            rx,
        )
        .await;

        assert!(result.is_err());
        assert!(*api.deregistered.lock().unwrap());
    }

    #[tokio::test]
    async fn malformed_payload_is_rejected_without_touching_cursor() {
        let (_api, state) = state();
        let dispatcher = state.dispatcher.clone();
        let app = build_router(state);

        let resp = app
            .oneshot(post_webhook("{\"not\": \"an update\"".to_string()))
            .await
            .unwrap();
        assert!(resp.status().is_client_error());
        assert_eq!(dispatcher.cursor().await, Cursor(100));
    }
}
