//! Event store: the persistence seam for calendar events.
//!
//! All operations are scoped to the owning user. Mutations enforce ownership
//! by filtering on both id and user id in the same statement, never with a
//! separate pre-check.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Event, EventDraft};
use crate::{Error, Result};

/// The authenticated owner an event is created for. The email is needed to
/// materialize the user profile row the event's foreign key requires.
#[derive(Debug, Clone)]
pub struct EventOwner {
    pub id: Uuid,
    pub email: String,
}

/// CRUD operations over a user's events.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn list(&self, user_id: Uuid) -> Result<Vec<Event>>;
    async fn create(&self, owner: &EventOwner, draft: &EventDraft) -> Result<Event>;
    async fn update(&self, id: &str, user_id: Uuid, draft: &EventDraft) -> Result<Event>;
    async fn delete(&self, id: &str, user_id: Uuid) -> Result<()>;
}

/// Event row as stored in Postgres.
#[derive(Debug, sqlx::FromRow)]
pub struct EventRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub event_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: Option<String>,
    pub color: String,
    pub reminder_minutes: i32,
    pub reminder_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id.to_string(),
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            event_date: row.event_date,
            start_time: row.start_time,
            end_time: row.end_time,
            location: row.location,
            color: row.color,
            reminder_minutes: row.reminder_minutes,
            reminder_sent: row.reminder_sent,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const EVENT_COLUMNS: &str = "id, user_id, title, description, event_date, start_time, end_time, \
     location, color, reminder_minutes, reminder_sent, created_at, updated_at";

/// Postgres-backed event store.
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert-if-absent for the user profile row. The event's owning-user
    /// foreign key requires one to exist before the insert.
    async fn ensure_user_profile(&self, owner: &EventOwner) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, email,
                telegram_notifications_enabled,
                reminder_notifications_enabled,
                creation_notifications_enabled
            ) VALUES ($1, $2, true, true, true)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(owner.id)
        .bind(&owner.email)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remote ids are UUIDs rendered to text; anything else (including a
    /// `local-` prefixed id that leaked here) cannot match a row.
    fn parse_remote_id(id: &str) -> Result<Uuid> {
        Uuid::parse_str(id).map_err(|_| Error::NotFound(format!("event {}", id)))
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn list(&self, user_id: Uuid) -> Result<Vec<Event>> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "SELECT {} FROM events WHERE user_id = $1 ORDER BY event_date, start_time",
            EVENT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn create(&self, owner: &EventOwner, draft: &EventDraft) -> Result<Event> {
        draft
            .validate()
            .map_err(|e| Error::Validation(e.to_string()))?;

        self.ensure_user_profile(owner).await?;

        let row: EventRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO events (
                user_id, title, description, event_date, start_time, end_time,
                location, color, reminder_minutes, reminder_sent
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, false)
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(owner.id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.event_date)
        .bind(draft.start_time)
        .bind(draft.end_time)
        .bind(&draft.location)
        .bind(&draft.color)
        .bind(draft.reminder_minutes)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update(&self, id: &str, user_id: Uuid, draft: &EventDraft) -> Result<Event> {
        draft
            .validate()
            .map_err(|e| Error::Validation(e.to_string()))?;

        let event_id = Self::parse_remote_id(id)?;

        // reminder_sent is deliberately untouched: the flag only ever moves
        // false -> true, an edit never re-arms a sent reminder.
        let row: Option<EventRow> = sqlx::query_as(&format!(
            r#"
            UPDATE events
            SET title = $3, description = $4, event_date = $5, start_time = $6,
                end_time = $7, location = $8, color = $9, reminder_minutes = $10,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(event_id)
        .bind(user_id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.event_date)
        .bind(draft.start_time)
        .bind(draft.end_time)
        .bind(&draft.location)
        .bind(&draft.color)
        .bind(draft.reminder_minutes)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Event::from)
            .ok_or_else(|| Error::NotFound(format!("event {}", id)))
    }

    async fn delete(&self, id: &str, user_id: Uuid) -> Result<()> {
        let event_id = Self::parse_remote_id(id)?;

        let result = sqlx::query("DELETE FROM events WHERE id = $1 AND user_id = $2")
            .bind(event_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("event {}", id)));
        }

        Ok(())
    }
}
