//! Start-of-event scanner Lambda.
//!
//! Runs every minute via EventBridge and notifies owners of events whose
//! start time falls in the current minute. The candidate set is keyed on the
//! exact date and minute, so each event matches at most one scheduled run;
//! there is no persisted flag, and a second invocation inside the same minute
//! would send again.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use shared::reminder::truncate_to_minute;
use shared::templates::{self, EventMessage};
use shared::{db, secrets, Config, TelegramClient};

#[derive(Debug, Deserialize)]
struct ScheduledEvent {
    #[serde(default)]
    detail_type: String,
}

/// Run summary returned to the scheduler.
#[derive(Debug, Serialize)]
struct ScanResponse {
    success: bool,
    checked: u32,
    sent: u32,
    errors: u32,
    timestamp: String,
    event_ids: Vec<String>,
}

/// Event starting this minute, joined with its owner's chat id.
#[derive(Debug, sqlx::FromRow)]
struct StartingEvent {
    id: Uuid,
    title: String,
    description: Option<String>,
    event_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    location: Option<String>,
    telegram_chat_id: String,
}

impl StartingEvent {
    fn message(&self) -> EventMessage {
        EventMessage {
            title: self.title.clone(),
            event_date: self.event_date,
            start_time: self.start_time,
            end_time: Some(self.end_time),
            location: self.location.clone(),
            description: self.description.clone(),
        }
    }
}

struct AppState {
    pool: PgPool,
    telegram: TelegramClient,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let secrets_client = aws_sdk_secretsmanager::Client::new(&aws);

        let pool = db::create_pool(&config, &secrets_client).await?;
        let token = secrets::resolve_bot_token(&config, &secrets_client).await?;

        Ok(Self {
            pool,
            telegram: TelegramClient::new(token)?,
        })
    }
}

/// Events starting exactly at `now` (already truncated to the minute), for
/// owners with a destination and reminders enabled.
async fn fetch_starting(pool: &PgPool, now: NaiveDateTime) -> Result<Vec<StartingEvent>, Error> {
    let starting: Vec<StartingEvent> = sqlx::query_as(
        r#"
        SELECT
            e.id, e.title, e.description, e.event_date, e.start_time,
            e.end_time, e.location,
            u.telegram_chat_id
        FROM events e
        JOIN users u ON u.id = e.user_id
        WHERE e.event_date = $1
          AND e.start_time = $2
          AND u.telegram_chat_id IS NOT NULL
          AND u.telegram_notifications_enabled = true
          AND u.reminder_notifications_enabled = true
        ORDER BY e.start_time
        "#,
    )
    .bind(now.date())
    .bind(now.time())
    .fetch_all(pool)
    .await
    .map_err(|e| format!("Failed to query starting events: {}", e))?;

    Ok(starting)
}

async fn scan(state: &AppState, now: NaiveDateTime) -> Result<ScanResponse, Error> {
    let now = truncate_to_minute(now);
    let starting = fetch_starting(&state.pool, now).await?;

    info!(candidates = starting.len(), minute = %now, "Fetched starting events");

    let mut sent = 0u32;
    let mut errors = 0u32;
    let mut event_ids = Vec::new();

    for event in &starting {
        let text = templates::event_starting_now(&event.message());

        match state
            .telegram
            .send_message(&event.telegram_chat_id, &text)
            .await
        {
            Ok(receipt) => {
                info!(
                    event_id = %event.id,
                    message_id = receipt.message_id,
                    "Start notification delivered"
                );
                sent += 1;
                event_ids.push(event.id.to_string());
            }
            Err(e) => {
                error!(event_id = %event.id, error = %e, "Failed to deliver start notification");
                errors += 1;
            }
        }
    }

    let response = ScanResponse {
        success: true,
        checked: starting.len() as u32,
        sent,
        errors,
        timestamp: Utc::now().to_rfc3339(),
        event_ids,
    };

    info!(
        checked = response.checked,
        sent = response.sent,
        errors = response.errors,
        "Start-of-event scan complete"
    );

    Ok(response)
}

async fn handler(
    state: Arc<AppState>,
    _event: LambdaEvent<ScheduledEvent>,
) -> Result<ScanResponse, Error> {
    scan(&state, Utc::now().naive_utc()).await
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

#[cfg(test)]
mod tests {
    use super::*;
    use shared::reminder::starts_at_minute;

    fn event() -> StartingEvent {
        StartingEvent {
            id: Uuid::new_v4(),
            title: "Team Sync".to_string(),
            description: Some("Weekly review".to_string()),
            event_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            location: Some("Room 4".to_string()),
            telegram_chat_id: "555".to_string(),
        }
    }

    #[test]
    fn test_query_minute_matches_predicate() {
        let e = event();
        // The SQL keys on the truncated minute; the pure predicate agrees.
        let now = NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(9, 0, 18)
            .unwrap();
        let minute = truncate_to_minute(now);
        assert!(starts_at_minute(e.event_date, e.start_time, minute));
        assert_eq!(minute.time(), e.start_time);
    }

    #[test]
    fn test_starting_now_text() {
        let e = event();
        let text = templates::event_starting_now(&e.message());
        assert!(text.contains("Starting Now"));
        assert!(text.contains("Team Sync"));
        assert!(text.contains("Room 4"));
    }
}
