//! On-device fallback event store.
//!
//! When the backing database is unreachable, callers keep working against a
//! local JSON blob. Local-origin events get a `local-` prefixed id so a later
//! mutation on one never fires a remote call.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use crate::events::{EventOwner, EventStore};
use crate::models::{is_local_id, Event, EventDraft, LOCAL_ID_PREFIX};
use crate::{Error, Result};

/// File name of the persisted blob, mirroring the fixed storage key the
/// settings blob uses.
pub const EVENTS_KEY: &str = "calendar-events";

/// In-memory event store, optionally persisted to a JSON file.
pub struct LocalEventStore {
    events: RwLock<HashMap<String, Event>>,
    path: Option<PathBuf>,
}

impl LocalEventStore {
    /// Purely in-memory store.
    pub fn new() -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
            path: None,
        }
    }

    /// Store persisted under `<dir>/calendar-events.json`, loading whatever a
    /// previous session left there.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let path = dir.into().join(format!("{}.json", EVENTS_KEY));

        let events = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let list: Vec<Event> = serde_json::from_str(&raw)?;
            list.into_iter().map(|e| (e.id.clone(), e)).collect()
        } else {
            HashMap::new()
        };

        Ok(Self {
            events: RwLock::new(events),
            path: Some(path),
        })
    }

    fn generate_id() -> String {
        format!("{}{}", LOCAL_ID_PREFIX, Uuid::new_v4())
    }

    fn persist(&self, events: &HashMap<String, Event>) -> Result<()> {
        if let Some(path) = &self.path {
            let mut list: Vec<&Event> = events.values().collect();
            list.sort_by(|a, b| {
                (a.event_date, a.start_time).cmp(&(b.event_date, b.start_time))
            });
            std::fs::write(path, serde_json::to_string_pretty(&list)?)?;
        }
        Ok(())
    }
}

impl Default for LocalEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for LocalEventStore {
    async fn list(&self, user_id: Uuid) -> Result<Vec<Event>> {
        let events = self.events.read().await;
        let mut list: Vec<Event> = events
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| (a.event_date, a.start_time).cmp(&(b.event_date, b.start_time)));
        Ok(list)
    }

    async fn create(&self, owner: &EventOwner, draft: &EventDraft) -> Result<Event> {
        draft
            .validate()
            .map_err(|e| Error::Validation(e.to_string()))?;

        let now = Utc::now();
        let event = Event {
            id: Self::generate_id(),
            user_id: owner.id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            event_date: draft.event_date,
            start_time: draft.start_time,
            end_time: draft.end_time,
            location: draft.location.clone(),
            color: draft.color.clone(),
            reminder_minutes: draft.reminder_minutes,
            reminder_sent: false,
            created_at: now,
            updated_at: now,
        };

        let mut events = self.events.write().await;
        events.insert(event.id.clone(), event.clone());
        self.persist(&events)?;

        Ok(event)
    }

    async fn update(&self, id: &str, user_id: Uuid, draft: &EventDraft) -> Result<Event> {
        draft
            .validate()
            .map_err(|e| Error::Validation(e.to_string()))?;

        let mut events = self.events.write().await;
        let event = events
            .get_mut(id)
            .filter(|e| e.user_id == user_id)
            .ok_or_else(|| Error::NotFound(format!("event {}", id)))?;

        event.title = draft.title.clone();
        event.description = draft.description.clone();
        event.event_date = draft.event_date;
        event.start_time = draft.start_time;
        event.end_time = draft.end_time;
        event.location = draft.location.clone();
        event.color = draft.color.clone();
        event.reminder_minutes = draft.reminder_minutes;
        event.updated_at = Utc::now();
        let updated = event.clone();

        self.persist(&events)?;
        Ok(updated)
    }

    async fn delete(&self, id: &str, user_id: Uuid) -> Result<()> {
        let mut events = self.events.write().await;
        let owned = events.get(id).map(|e| e.user_id == user_id);
        match owned {
            Some(true) => {
                events.remove(id);
                self.persist(&events)?;
                Ok(())
            }
            _ => Err(Error::NotFound(format!("event {}", id))),
        }
    }
}

/// Remote store with a local safety net.
///
/// Reads and creates retry against the local store when the remote store
/// reports a database failure; mutations on local-origin ids go straight to
/// the local store. Authentication and validation errors pass through
/// untouched.
pub struct FallbackEventStore<R> {
    remote: R,
    local: LocalEventStore,
}

impl<R: EventStore> FallbackEventStore<R> {
    pub fn new(remote: R, local: LocalEventStore) -> Self {
        Self { remote, local }
    }
}

#[async_trait]
impl<R: EventStore> EventStore for FallbackEventStore<R> {
    async fn list(&self, user_id: Uuid) -> Result<Vec<Event>> {
        match self.remote.list(user_id).await {
            Err(e) if e.is_database() => {
                warn!(error = %e, "Remote list failed, serving local events");
                self.local.list(user_id).await
            }
            other => other,
        }
    }

    async fn create(&self, owner: &EventOwner, draft: &EventDraft) -> Result<Event> {
        match self.remote.create(owner, draft).await {
            Err(e) if e.is_database() => {
                warn!(error = %e, "Remote create failed, storing event locally");
                self.local.create(owner, draft).await
            }
            other => other,
        }
    }

    async fn update(&self, id: &str, user_id: Uuid, draft: &EventDraft) -> Result<Event> {
        if is_local_id(id) {
            return self.local.update(id, user_id, draft).await;
        }
        self.remote.update(id, user_id, draft).await
    }

    async fn delete(&self, id: &str, user_id: Uuid) -> Result<()> {
        if is_local_id(id) {
            return self.local.delete(id, user_id).await;
        }
        self.remote.delete(id, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn owner() -> EventOwner {
        EventOwner {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
        }
    }

    fn draft(title: &str) -> EventDraft {
        EventDraft {
            title: title.to_string(),
            description: None,
            event_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            location: None,
            color: "blue".to_string(),
            reminder_minutes: 15,
        }
    }

    /// Remote store standing in for an unreachable database.
    struct DownRemote;

    #[async_trait]
    impl EventStore for DownRemote {
        async fn list(&self, _user_id: Uuid) -> Result<Vec<Event>> {
            Err(Error::Database(sqlx::Error::PoolTimedOut))
        }
        async fn create(&self, _owner: &EventOwner, _draft: &EventDraft) -> Result<Event> {
            Err(Error::Database(sqlx::Error::PoolTimedOut))
        }
        async fn update(&self, _id: &str, _user_id: Uuid, _draft: &EventDraft) -> Result<Event> {
            Err(Error::Database(sqlx::Error::PoolTimedOut))
        }
        async fn delete(&self, _id: &str, _user_id: Uuid) -> Result<()> {
            Err(Error::Database(sqlx::Error::PoolTimedOut))
        }
    }

    /// Remote store that fails the test if any call reaches it.
    struct MustNotCall;

    #[async_trait]
    impl EventStore for MustNotCall {
        async fn list(&self, _user_id: Uuid) -> Result<Vec<Event>> {
            panic!("remote list called for local-origin flow");
        }
        async fn create(&self, _owner: &EventOwner, _draft: &EventDraft) -> Result<Event> {
            panic!("remote create called for local-origin flow");
        }
        async fn update(&self, _id: &str, _user_id: Uuid, _draft: &EventDraft) -> Result<Event> {
            panic!("remote update called for local-origin id");
        }
        async fn delete(&self, _id: &str, _user_id: Uuid) -> Result<()> {
            panic!("remote delete called for local-origin id");
        }
    }

    #[tokio::test]
    async fn test_local_crud_round_trip() {
        let store = LocalEventStore::new();
        let owner = owner();

        let created = store.create(&owner, &draft("Standup")).await.unwrap();
        assert!(created.id.starts_with(LOCAL_ID_PREFIX));
        assert!(!created.reminder_sent);

        let listed = store.list(owner.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], created);

        let updated = store
            .update(&created.id, owner.id, &draft("Standup (moved)"))
            .await
            .unwrap();
        assert_eq!(updated.title, "Standup (moved)");
        assert_eq!(updated.id, created.id);

        store.delete(&created.id, owner.id).await.unwrap();
        assert!(store.list(owner.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_local_mutations_enforce_ownership() {
        let store = LocalEventStore::new();
        let owner = owner();
        let created = store.create(&owner, &draft("Standup")).await.unwrap();

        let stranger = Uuid::new_v4();
        assert!(matches!(
            store.update(&created.id, stranger, &draft("Hijack")).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.delete(&created.id, stranger).await,
            Err(Error::NotFound(_))
        ));

        // The event is untouched for the real owner.
        assert_eq!(store.list(owner.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_local_store_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let owner = owner();

        let created = {
            let store = LocalEventStore::with_dir(dir.path()).unwrap();
            store.create(&owner, &draft("Standup")).await.unwrap()
        };

        let reopened = LocalEventStore::with_dir(dir.path()).unwrap();
        let listed = reopened.list(owner.id).await.unwrap();
        assert_eq!(listed, vec![created]);
    }

    #[tokio::test]
    async fn test_fallback_on_database_error() {
        let store = FallbackEventStore::new(DownRemote, LocalEventStore::new());
        let owner = owner();

        let created = store.create(&owner, &draft("Standup")).await.unwrap();
        assert!(created.is_local());

        let listed = store.list(owner.id).await.unwrap();
        assert_eq!(listed, vec![created]);
    }

    #[tokio::test]
    async fn test_local_origin_id_never_reaches_remote() {
        let local = LocalEventStore::new();
        let owner = owner();
        let created = local.create(&owner, &draft("Standup")).await.unwrap();

        let store = FallbackEventStore::new(MustNotCall, local);
        store
            .update(&created.id, owner.id, &draft("Standup (moved)"))
            .await
            .unwrap();
        store.delete(&created.id, owner.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_validation_error_not_swallowed_by_fallback() {
        let store = FallbackEventStore::new(DownRemote, LocalEventStore::new());
        let mut bad = draft("");
        bad.title = String::new();

        assert!(matches!(
            store.create(&owner(), &bad).await,
            Err(Error::Validation(_))
        ));
    }
}
