//! Bot API client (long polling)

use super::{Transport, TransportError};
use crate::update::{OutgoingMessage, Update};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Slack added on top of the long-poll timeout before the HTTP request gives up
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Timeout for everything that is not a long poll
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Bot API response envelope
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self, method: &str) -> Result<T, TransportError> {
        if !self.ok {
            return Err(TransportError::Api {
                method: method.to_string(),
                description: self
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }
        self.result
            .ok_or_else(|| TransportError::Decode(format!("{method}: missing result")))
    }
}

pub struct TelegramClient {
    client: Client,
    /// `<api_url>/bot<token>`
    base_url: String,
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: format!("{}/bot{token}", api_url.trim_end_matches('/')),
        })
    }

    async fn call<B, T>(&self, method: &str, body: &B, timeout: Duration) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let envelope: ApiResponse<T> = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .timeout(timeout)
            .json(body)
            .send()
            .await?
            .json()
            .await?;
        envelope.into_result(method)
    }
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // base_url embeds the token
        f.debug_struct("TelegramClient").finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for TelegramClient {
    async fn poll(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>, TransportError> {
        let body = json!({
            "offset": offset,
            "timeout": timeout.as_secs(),
            "allowed_updates": ["message", "callback_query"],
        });
        self.call("getUpdates", &body, timeout + POLL_GRACE).await
    }

    async fn send(&self, message: &OutgoingMessage) -> Result<(), TransportError> {
        let _sent: Value = self.call("sendMessage", message, REQUEST_TIMEOUT).await?;
        Ok(())
    }
}
