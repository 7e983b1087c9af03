//! Telegram webhook Lambda - handles inbound bot updates.
//!
//! Recognizes three commands (`/start` with optional trailing text, `/help`,
//! `/id`) and replies to each with the sender's chat id. Anything else is
//! acknowledged with 200 and no reply. The response is always 200 with
//! `{"ok": true}` so Telegram does not re-deliver the update.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use shared::http::json_response;
use shared::{secrets, templates, Config, TelegramClient};

/// Telegram update payload, reduced to the parts the bot reacts to.
#[derive(Debug, Deserialize)]
struct Update {
    message: Option<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    text: Option<String>,
    chat: Chat,
    from: Option<Sender>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct Sender {
    first_name: Option<String>,
}

/// Commands the bot answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Help,
    Id,
}

/// Match a message text against the known commands. `/start` tolerates
/// trailing text (deep-link payloads arrive as `/start <token>`).
fn parse_command(text: &str) -> Option<Command> {
    if text.starts_with("/start") {
        Some(Command::Start)
    } else if text == "/help" {
        Some(Command::Help)
    } else if text == "/id" {
        Some(Command::Id)
    } else {
        None
    }
}

/// Reply text for a command.
fn reply_for(command: Command, first_name: &str, chat_id: i64) -> String {
    match command {
        Command::Start => templates::welcome(first_name, chat_id),
        Command::Help => templates::help(chat_id),
        Command::Id => templates::chat_id_reply(chat_id),
    }
}

struct AppState {
    telegram: TelegramClient,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let secrets_client = aws_sdk_secretsmanager::Client::new(&aws);

        let token = secrets::resolve_bot_token(&config, &secrets_client).await?;

        Ok(Self {
            telegram: TelegramClient::new(token)?,
        })
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let update: Update = match serde_json::from_slice(event.body().as_ref()) {
        Ok(update) => update,
        Err(e) => {
            // Malformed payloads are acknowledged too; retries won't fix them.
            error!(error = %e, "Failed to parse Telegram update");
            return json_response(200, &serde_json::json!({ "ok": true }));
        }
    };

    if let Some(message) = update.message {
        let chat_id = message.chat.id;
        let text = message.text.as_deref().unwrap_or_default();
        let first_name = message
            .from
            .as_ref()
            .and_then(|f| f.first_name.as_deref())
            .unwrap_or("there");

        info!(chat_id = chat_id, text = %text, "Received Telegram message");

        if let Some(command) = parse_command(text) {
            let reply = reply_for(command, first_name, chat_id);

            // A failed reply must not turn into a Telegram retry loop.
            if let Err(e) = state
                .telegram
                .send_message(&chat_id.to_string(), &reply)
                .await
            {
                error!(chat_id = chat_id, error = %e, "Failed to send command reply");
            }
        }
    }

    json_response(200, &serde_json::json!({ "ok": true }))
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
