//! HTTP client for the bot-platform emulator.
//!
//! Implements the core's `BotApi` port against the emulator's REST surface:
//! `{base}/bot{token}/{method}` with the usual `{ok, result, description,
//! error_code}` response envelope. Network trouble maps to
//! `Error::Transport`; an envelope with `ok: false` maps to `Error::Api`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use embot_core::domain::{ChatId, Cursor};
use embot_core::errors::Error;
use embot_core::keyboard::ReplyMarkup;
use embot_core::ports::{BotApi, BotProfile};
use embot_core::update::RawUpdate;
use embot_core::Result;

/// Extra client-side margin over the server-held long-poll timeout, so the
/// HTTP timeout never fires before a well-behaved long poll returns.
const TIMEOUT_MARGIN_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
}

fn unwrap_envelope<T>(method: &str, envelope: Envelope<T>) -> Result<T> {
    if !envelope.ok {
        return Err(Error::Api(format!(
            "{method} failed (code {}): {}",
            envelope.error_code.unwrap_or(0),
            envelope.description.unwrap_or_else(|| "no description".to_string()),
        )));
    }
    envelope
        .result
        .ok_or_else(|| Error::Malformed(format!("{method} response has ok=true but no result")))
}

#[derive(Debug, Deserialize)]
struct WireProfile {
    id: i64,
    first_name: Option<String>,
    username: Option<String>,
}

pub struct EmulatorApi {
    client: Client,
    base: String,
    token: String,
}

impl EmulatorApi {
    /// `poll_timeout_secs` sizes the HTTP timeout; pass the configured
    /// long-poll timeout (0 for plain polling).
    pub fn new(base: &str, token: &str, poll_timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + TIMEOUT_MARGIN_SECS))
            .build()
            .map_err(|e| Error::Transport(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base, self.token, method)
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .client
            .get(self.api_url(method))
            .query(query)
            .send()
            .await
            .map_err(|e| transport_error(method, e))?;
        decode(method, response).await
    }

    async fn post<T: serde::de::DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(method, e))?;
        decode(method, response).await
    }
}

fn transport_error(method: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Transport(format!("{method}: timed out"))
    } else {
        Error::Transport(format!("{method}: {e}"))
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    method: &str,
    response: reqwest::Response,
) -> Result<T> {
    let envelope = response
        .json::<Envelope<T>>()
        .await
        .map_err(|e| Error::Malformed(format!("{method} response: {e}")))?;
    unwrap_envelope(method, envelope)
}

#[async_trait]
impl BotApi for EmulatorApi {
    async fn get_me(&self) -> Result<BotProfile> {
        let profile: WireProfile = self.get("getMe", &[]).await?;
        Ok(BotProfile {
            id: profile.id,
            first_name: profile.first_name.unwrap_or_default(),
            username: profile.username,
        })
    }

    async fn get_updates(
        &self,
        offset: Cursor,
        timeout_secs: u64,
        limit: usize,
    ) -> Result<Vec<RawUpdate>> {
        let query = [
            ("offset", offset.0.to_string()),
            ("timeout", timeout_secs.to_string()),
            ("limit", limit.to_string()),
        ];
        let updates: Vec<RawUpdate> = self.get("getUpdates", &query).await?;
        if !updates.is_empty() {
            debug!(count = updates.len(), offset = %offset, "updates fetched");
        }
        Ok(updates)
    }

    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> Result<()> {
        let mut body = json!({
            "chat_id": chat.0,
            "text": text,
        });
        if let Some(markup) = markup {
            body["reply_markup"] = serde_json::to_value(markup)?;
        }
        let _: Value = self.post("sendMessage", &body).await?;
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<()> {
        let mut body = json!({
            "callback_query_id": callback_id,
            "show_alert": show_alert,
        });
        if let Some(text) = text {
            body["text"] = json!(text);
        }
        let _: Value = self.post("answerCallbackQuery", &body).await?;
        Ok(())
    }

    async fn set_webhook(&self, url: &str) -> Result<()> {
        let _: Value = self.post("setWebhook", &json!({ "url": url })).await?;
        Ok(())
    }

    async fn delete_webhook(&self) -> Result<()> {
        let _: Value = self.post("deleteWebhook", &json!({})).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_shape() {
        let api = EmulatorApi::new("http://localhost:3001/", "123:abc", 30).unwrap();
        assert_eq!(
            api.api_url("getUpdates"),
            "http://localhost:3001/bot123:abc/getUpdates"
        );
    }

    #[test]
    fn ok_envelope_yields_result() {
        let envelope: Envelope<Vec<i64>> =
            serde_json::from_str(r#"{"ok": true, "result": [1, 2, 3]}"#).unwrap();
        assert_eq!(unwrap_envelope("getUpdates", envelope).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn error_envelope_yields_api_error_with_detail() {
        let envelope: Envelope<Value> = serde_json::from_str(
            r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#,
        )
        .unwrap();
        let err = unwrap_envelope("getMe", envelope).unwrap_err();
        match err {
            Error::Api(msg) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("Unauthorized"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn ok_envelope_without_result_is_malformed() {
        let envelope: Envelope<Vec<i64>> = serde_json::from_str(r#"{"ok": true}"#).unwrap();
        assert!(matches!(
            unwrap_envelope("getUpdates", envelope),
            Err(Error::Malformed(_))
        ));
    }

    #[test]
    fn update_result_decodes_through_envelope() {
        let envelope: Envelope<Vec<RawUpdate>> = serde_json::from_str(
            r#"{"ok": true, "result": [{"update_id": 7, "message": {"message_id": 1, "chat": {"id": 5}, "text": "hi"}}]}"#,
        )
        .unwrap();
        let updates = unwrap_envelope("getUpdates", envelope).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].update_id, 7);
    }
}
