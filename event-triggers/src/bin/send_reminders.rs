//! Reminder scanner Lambda - delivers due event reminders via Telegram.
//!
//! Runs every minute via EventBridge and:
//! 1. Queries unsent reminders for upcoming events whose owner has a chat id
//!    and the reminder toggle enabled
//! 2. Keeps the ones whose reminder window contains the current minute
//! 3. Delivers each sequentially, marking reminder_sent immediately after a
//!    successful send so the next run skips it
//! 4. Logs and counts per-event failures without aborting the batch
//!
//! If a send succeeds but the flag write fails, the next run may deliver a
//! duplicate: at-most-once normally, at-least-once under partial failure.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use shared::reminder::{due_for_reminder, minutes_until_start, truncate_to_minute};
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

/// Candidate event joined with its owner's chat id.
#[derive(Debug, sqlx::FromRow)]
struct ReminderCandidate {
    id: Uuid,
    title: String,
    description: Option<String>,
    event_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    location: Option<String>,
    reminder_minutes: i32,
    telegram_chat_id: String,
}

impl ReminderCandidate {
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

/// Unsent reminders for events from today onward, restricted to owners with a
/// destination and the reminder toggle on. The window check itself happens in
/// process, at minute precision.
async fn fetch_candidates(pool: &PgPool, today: NaiveDate) -> Result<Vec<ReminderCandidate>, Error> {
    let candidates: Vec<ReminderCandidate> = sqlx::query_as(
        r#"
        SELECT
            e.id, e.title, e.description, e.event_date, e.start_time,
            e.end_time, e.location, e.reminder_minutes,
            u.telegram_chat_id
        FROM events e
        JOIN users u ON u.id = e.user_id
        WHERE e.reminder_sent = false
          AND e.event_date >= $1
          AND u.telegram_chat_id IS NOT NULL
          AND u.telegram_notifications_enabled = true
          AND u.reminder_notifications_enabled = true
        ORDER BY e.event_date, e.start_time
        "#,
    )
    .bind(today)
    .fetch_all(pool)
    .await
    .map_err(|e| format!("Failed to query reminder candidates: {}", e))?;

    Ok(candidates)
}

/// Flip the dedupe flag. Scoped by id only: the candidate query already
/// proved ownership, and concurrent runs racing here are last-writer-wins.
async fn mark_reminder_sent(pool: &PgPool, event_id: Uuid) -> Result<(), Error> {
    sqlx::query("UPDATE events SET reminder_sent = true, updated_at = NOW() WHERE id = $1")
        .bind(event_id)
        .execute(pool)
        .await
        .map_err(|e| format!("Failed to mark reminder sent: {}", e))?;

    Ok(())
}

async fn scan(state: &AppState, now: NaiveDateTime) -> Result<ScanResponse, Error> {
    let now = truncate_to_minute(now);
    let candidates = fetch_candidates(&state.pool, now.date()).await?;

    info!(candidates = candidates.len(), "Fetched reminder candidates");

    let mut sent = 0u32;
    let mut errors = 0u32;
    let mut event_ids = Vec::new();

    for candidate in &candidates {
        if !due_for_reminder(
            candidate.event_date,
            candidate.start_time,
            candidate.reminder_minutes,
            false,
            now,
        ) {
            continue;
        }

        let lead = minutes_until_start(candidate.event_date, candidate.start_time, now);
        let text = templates::reminder(&candidate.message(), lead);

        match state
            .telegram
            .send_message(&candidate.telegram_chat_id, &text)
            .await
        {
            Ok(receipt) => {
                info!(
                    event_id = %candidate.id,
                    message_id = receipt.message_id,
                    "Reminder delivered"
                );
                sent += 1;
                event_ids.push(candidate.id.to_string());

                // Persist before the next candidate: this is what makes the
                // due-predicate false on the next run.
                if let Err(e) = mark_reminder_sent(&state.pool, candidate.id).await {
                    error!(event_id = %candidate.id, error = %e, "Failed to set reminder_sent");
                    errors += 1;
                }
            }
            Err(e) => {
                error!(event_id = %candidate.id, error = %e, "Failed to deliver reminder");
                errors += 1;
            }
        }
    }

    let response = ScanResponse {
        success: true,
        checked: candidates.len() as u32,
        sent,
        errors,
        timestamp: Utc::now().to_rfc3339(),
        event_ids,
    };

    info!(
        checked = response.checked,
        sent = response.sent,
        errors = response.errors,
        "Reminder scan complete"
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

    fn candidate(start: (u32, u32), lead: i32) -> ReminderCandidate {
        ReminderCandidate {
            id: Uuid::new_v4(),
            title: "Standup".to_string(),
            description: None,
            event_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(start.0 + 1, start.1, 0).unwrap(),
            location: None,
            reminder_minutes: lead,
            telegram_chat_id: "555".to_string(),
        }
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_window_filter_matches_scan_behavior() {
        let c = candidate((9, 0), 15);

        // Before the window opens: nothing due.
        assert!(!due_for_reminder(c.event_date, c.start_time, c.reminder_minutes, false, at(8, 44)));
        // At the window boundary: due.
        assert!(due_for_reminder(c.event_date, c.start_time, c.reminder_minutes, false, at(8, 45)));
        // After a successful run set the flag: no duplicate.
        assert!(!due_for_reminder(c.event_date, c.start_time, c.reminder_minutes, true, at(8, 50)));
    }

    #[test]
    fn test_reminder_text_carries_lead_minutes() {
        let c = candidate((9, 0), 15);
        let lead = minutes_until_start(c.event_date, c.start_time, at(8, 45));
        let text = templates::reminder(&c.message(), lead);
        assert!(text.contains("Starting in 15 minutes"));
        assert!(text.contains("Standup"));
    }

    #[test]
    fn test_scan_truncates_seconds() {
        let noisy = NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(8, 45, 42)
            .unwrap();
        assert_eq!(truncate_to_minute(noisy), at(8, 45));
    }
}
