//! Telegram admin Lambda - bot diagnostics and webhook wiring.
//!
//! Endpoints:
//! - GET /telegram/bot-info - Identity of the configured bot
//! - POST /telegram/setup-webhook - Register the inbound webhook URL
//! - POST /telegram/test - Send a test message to a chat id

use chrono::{NaiveTime, Utc};
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shared::http::{domain_error_response, error_response, json_response, parse_json_body, ApiResponse};
use shared::templates::{self, EventMessage};
use shared::{secrets, Config, TelegramClient};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestMessageRequest {
    chat_id: String,
}

struct AppState {
    telegram: TelegramClient,
    public_host: Option<String>,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let secrets_client = aws_sdk_secretsmanager::Client::new(&aws);

        // This whole surface exists to talk to the bot; no token is fatal here.
        let token = secrets::resolve_bot_token(&config, &secrets_client).await?;

        Ok(Self {
            telegram: TelegramClient::new(token)?,
            public_host: config.public_host,
        })
    }
}

/// Message proving the bot setup end to end: fixed fields, today's date.
fn test_message() -> String {
    let noon = NaiveTime::from_hms_opt(12, 0, 0).expect("noon is a valid time");
    templates::creation_confirmation(&EventMessage {
        title: "🧪 Test Event - Telegram Setup".to_string(),
        event_date: Utc::now().date_naive(),
        start_time: noon,
        end_time: None,
        location: Some("Test Location".to_string()),
        description: Some(
            "This is a test message to verify your Telegram bot setup is working correctly."
                .to_string(),
        ),
    })
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();
    let raw_path = event.uri().path();
    let path = raw_path.strip_prefix("/api").unwrap_or(raw_path);

    info!("Telegram admin request: {} {}", method, path);

    match (method, path) {
        ("GET", "/telegram/bot-info") => match state.telegram.get_me().await {
            Ok(bot) => json_response(
                200,
                &ApiResponse::success(serde_json::json!({
                    "id": bot.id,
                    "firstName": bot.first_name,
                    "username": bot.username,
                })),
            ),
            Err(e) => domain_error_response(&e),
        },

        ("POST", "/telegram/setup-webhook") => {
            let Some(host) = &state.public_host else {
                return error_response(
                    500,
                    "PUBLIC_HOST not configured; cannot register a webhook",
                );
            };

            let webhook_url = format!("https://{}/webhook", host);
            if let Err(e) = state.telegram.set_webhook(&webhook_url).await {
                return domain_error_response(&e);
            }

            match state.telegram.get_webhook_info().await {
                Ok(info) => json_response(
                    200,
                    &ApiResponse::success(serde_json::json!({
                        "message": "Webhook setup successful",
                        "webhookUrl": webhook_url,
                        "registeredUrl": info.url,
                        "pendingUpdateCount": info.pending_update_count,
                        "lastErrorMessage": info.last_error_message,
                    })),
                ),
                Err(e) => domain_error_response(&e),
            }
        }

        ("POST", "/telegram/test") => {
            let request: TestMessageRequest = match parse_json_body(event.body())? {
                Ok(request) => request,
                Err(response) => return Ok(response),
            };

            if request.chat_id.trim().is_empty() {
                return error_response(400, "Chat ID is required");
            }

            match state
                .telegram
                .send_message(&request.chat_id, &test_message())
                .await
            {
                Ok(receipt) => json_response(
                    200,
                    &ApiResponse::success(serde_json::json!({
                        "message": "Test message sent successfully",
                        "messageId": receipt.message_id,
                    })),
                ),
                Err(e) => domain_error_response(&e),
            }
        }

        _ => error_response(404, "Not found"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);
    let state_clone = state.clone();

    run(service_fn(move |event| {
        let state = state_clone.clone();
        async move { handler(state, event).await }
    }))
    .await
}
