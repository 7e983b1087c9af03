//! Events API Lambda - CRUD operations for calendar events.
//!
//! Endpoints:
//! - GET /events - List events (optional ?year= &month= grid-range filter)
//! - POST /events - Create an event and send a best-effort confirmation
//! - PUT /events/{id} - Update an event
//! - DELETE /events/{id} - Delete an event
//!
//! Create and list fall back to the on-device store when the database is
//! unreachable; mutations on `local-` prefixed ids never leave the device.

use chrono::Weekday;
use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use shared::events::{EventOwner, EventStore, PgEventStore};
use shared::fallback::{FallbackEventStore, LocalEventStore};
use shared::http::{
    domain_error_response, error_response, json_response, parse_json_body, ApiResponse,
};
use shared::settings::SettingsStore;
use shared::templates::{self, EventMessage};
use shared::{authenticate, calendar, db, secrets, Config, Event, EventDraft, TelegramClient};

/// Response for a create: the committed event plus whether the best-effort
/// confirmation actually went out.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveEventResponse {
    event: Event,
    notification_sent: bool,
}

struct AppState {
    pool: PgPool,
    store: FallbackEventStore<PgEventStore>,
    telegram: Option<TelegramClient>,
    settings: SettingsStore,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let secrets_client = aws_sdk_secretsmanager::Client::new(&aws);

        let pool = db::create_pool(&config, &secrets_client).await?;

        // CRUD must keep working without a bot token; only the confirmation
        // side channel goes dark.
        let telegram = match secrets::resolve_bot_token(&config, &secrets_client).await {
            Ok(token) => Some(TelegramClient::new(token)?),
            Err(e) => {
                warn!(error = %e, "Telegram notifications disabled");
                None
            }
        };

        let fallback_dir =
            std::env::var("FALLBACK_DIR").unwrap_or_else(|_| "/tmp".to_string());
        let local = LocalEventStore::with_dir(&fallback_dir)?;
        let store = FallbackEventStore::new(PgEventStore::new(pool.clone()), local);
        let settings = SettingsStore::new(&fallback_dir);

        Ok(Self {
            pool,
            store,
            telegram,
            settings,
        })
    }
}

/// Chat id to confirm a creation to, if the owner's profile allows it.
///
/// The profile row is authoritative; the local settings blob covers the case
/// where the event itself was just saved to the fallback store.
async fn creation_destination(state: &AppState, event: &Event) -> Option<String> {
    let row: Result<Option<(Option<String>, bool, bool)>, sqlx::Error> = sqlx::query_as(
        "SELECT telegram_chat_id, telegram_notifications_enabled, \
         creation_notifications_enabled FROM users WHERE id = $1",
    )
    .bind(event.user_id)
    .fetch_optional(&state.pool)
    .await;

    match row {
        Ok(Some((chat_id, telegram_enabled, creation_enabled))) => {
            if telegram_enabled && creation_enabled {
                chat_id
            } else {
                None
            }
        }
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "Profile lookup failed, reading local settings");
            state
                .settings
                .load()
                .ok()
                .and_then(|s| s.creation_destination().map(String::from))
        }
    }
}

/// Best-effort confirmation. The event is already committed; a delivery
/// failure here is logged and surfaced as `notification_sent: false`, it
/// never rolls the save back.
async fn send_creation_confirmation(state: &AppState, event: &Event) -> bool {
    let Some(telegram) = &state.telegram else {
        return false;
    };

    let Some(chat_id) = creation_destination(state, event).await else {
        return false;
    };

    let text = templates::creation_confirmation(&EventMessage::from(event));
    match telegram.send_message(&chat_id, &text).await {
        Ok(receipt) => {
            info!(
                event_id = %event.id,
                message_id = receipt.message_id,
                "Creation confirmation sent"
            );
            true
        }
        Err(e) => {
            warn!(event_id = %event.id, error = %e, "Failed to send creation confirmation");
            false
        }
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();
    let raw_path = event.uri().path();
    // Strip /api stage prefix if present (API Gateway REST API includes stage in path)
    let path = raw_path.strip_prefix("/api").unwrap_or(raw_path);

    info!("Events request: {} {}", method, path);

    let user = match authenticate(&event) {
        Ok(user) => user,
        Err(e) => return domain_error_response(&e),
    };

    match (method, path) {
        // List events, optionally narrowed to what a month grid displays
        ("GET", "/events") => {
            let mut events = match state.store.list(user.user_id).await {
                Ok(events) => events,
                Err(e) => return domain_error_response(&e),
            };

            let params = event.query_string_parameters();
            let year = params.first("year").and_then(|y| y.parse::<i32>().ok());
            let month = params.first("month").and_then(|m| m.parse::<i32>().ok());
            if let (Some(year), Some(month)) = (year, month) {
                let (from, to) = calendar::grid_range(year, month, Weekday::Sun);
                events.retain(|e| e.event_date >= from && e.event_date <= to);
            }

            json_response(200, &ApiResponse::success(events))
        }

        // Create event
        ("POST", "/events") => {
            let draft: EventDraft = match parse_json_body(event.body())? {
                Ok(draft) => draft,
                Err(response) => return Ok(response),
            };

            let owner = EventOwner {
                id: user.user_id,
                email: user.email.clone(),
            };

            let created = match state.store.create(&owner, &draft).await {
                Ok(created) => created,
                Err(e) => return domain_error_response(&e),
            };

            let notification_sent = send_creation_confirmation(&state, &created).await;

            json_response(
                201,
                &ApiResponse::success(SaveEventResponse {
                    event: created,
                    notification_sent,
                }),
            )
        }

        // Update event
        _ if path.starts_with("/events/") && method == "PUT" => {
            let id = path.trim_start_matches("/events/");

            let draft: EventDraft = match parse_json_body(event.body())? {
                Ok(draft) => draft,
                Err(response) => return Ok(response),
            };

            match state.store.update(id, user.user_id, &draft).await {
                Ok(updated) => json_response(200, &ApiResponse::success(updated)),
                Err(e) => domain_error_response(&e),
            }
        }

        // Delete event
        _ if path.starts_with("/events/") && method == "DELETE" => {
            let id = path.trim_start_matches("/events/");

            match state.store.delete(id, user.user_id).await {
                Ok(()) => json_response(
                    200,
                    &ApiResponse::success(serde_json::json!({
                        "message": "Event deleted",
                        "eventId": id,
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
