//! Telegram Bot API client.
//!
//! Thin wrapper over the HTTP API: one outbound message per `send_message`
//! call, no retries. Idempotence is the caller's responsibility.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Envelope every Bot API response uses.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Receipt for a delivered message.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageReceipt {
    pub message_id: i64,
}

/// Bot identity from `getMe`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotInfo {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
}

/// Current webhook registration from `getWebhookInfo`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookInfo {
    pub url: String,
    #[serde(default)]
    pub pending_update_count: i64,
    pub last_error_message: Option<String>,
}

#[derive(Serialize)]
struct SendMessagePayload<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// Client for the Telegram Bot API.
pub struct TelegramClient {
    http: reqwest::Client,
    bot_token: String,
    api_base: String,
}

impl TelegramClient {
    /// Build a client. An empty token is a configuration error: every
    /// notification-dependent path is dead without one.
    pub fn new(bot_token: impl Into<String>) -> Result<Self> {
        let bot_token = bot_token.into();
        if bot_token.is_empty() {
            return Err(Error::Config("Telegram bot token is empty".to_string()));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            bot_token,
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Point the client at a different API host (test servers).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: Option<serde_json::Value>,
    ) -> Result<T> {
        let url = format!("{}/bot{}/{}", self.api_base, self.bot_token, method);

        let request = match &payload {
            Some(body) => self.http.post(&url).json(body),
            None => self.http.get(&url),
        };

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            // Keep the raw body for diagnostics; Telegram puts the failure
            // description there.
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Delivery {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ApiEnvelope<T> = response.json().await?;
        if !envelope.ok {
            return Err(Error::Delivery {
                status: status.as_u16(),
                body: envelope
                    .description
                    .unwrap_or_else(|| "Telegram API returned ok=false".to_string()),
            });
        }

        envelope.result.ok_or_else(|| Error::Delivery {
            status: status.as_u16(),
            body: "Telegram API returned no result".to_string(),
        })
    }

    /// Send one HTML-formatted message to a chat.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<MessageReceipt> {
        debug!(chat_id = %chat_id, "Sending Telegram message");

        let payload = serde_json::to_value(SendMessagePayload {
            chat_id,
            text,
            parse_mode: "HTML",
        })?;

        self.call("sendMessage", Some(payload)).await
    }

    /// Fetch the bot's identity.
    pub async fn get_me(&self) -> Result<BotInfo> {
        self.call("getMe", None).await
    }

    /// Register the webhook URL updates should be delivered to.
    pub async fn set_webhook(&self, url: &str) -> Result<()> {
        let _: bool = self
            .call("setWebhook", Some(serde_json::json!({ "url": url })))
            .await?;
        Ok(())
    }

    /// Current webhook registration.
    pub async fn get_webhook_info(&self) -> Result<WebhookInfo> {
        self.call("getWebhookInfo", None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_token_is_config_error() {
        assert!(matches!(
            TelegramClient::new(""),
            Err(Error::Config(_))
        ));
        assert!(TelegramClient::new("123:abc").is_ok());
    }

    #[test]
    fn test_envelope_parses_failure_description() {
        let envelope: ApiEnvelope<MessageReceipt> =
            serde_json::from_str(r#"{"ok":false,"description":"Bad Request: chat not found"}"#)
                .unwrap();
        assert!(!envelope.ok);
        assert_eq!(
            envelope.description.as_deref(),
            Some("Bad Request: chat not found")
        );
        assert!(envelope.result.is_none());
    }

    #[test]
    fn test_envelope_parses_receipt() {
        let envelope: ApiEnvelope<MessageReceipt> = serde_json::from_str(
            r#"{"ok":true,"result":{"message_id":42,"date":1741600000,"text":"hi"}}"#,
        )
        .unwrap();
        assert!(envelope.ok);
        assert_eq!(envelope.result.unwrap().message_id, 42);
    }
}
