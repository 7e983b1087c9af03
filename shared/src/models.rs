//! Shared data models.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::reminder::{self, ReminderWindow};

/// Prefix marking an event id that only exists in the on-device fallback
/// store. A mutation on such an id must never fire a remote call.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Whether an event id is local-origin.
pub fn is_local_id(id: &str) -> bool {
    id.starts_with(LOCAL_ID_PREFIX)
}

/// Serde helper for wall-clock `HH:MM` time strings.
///
/// Times are stored without timezone or seconds; accepting `HH:MM:SS` on input
/// tolerates rows written by the database TIME type. Seconds are truncated on
/// parse: the scanners key on exact minutes, so a stored `09:00:30` would
/// never match its scan slot.
pub mod wall_clock {
    use chrono::{NaiveTime, Timelike};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        let parsed = NaiveTime::parse_from_str(&s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&s, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)?;
        Ok(parsed.with_second(0).unwrap_or(parsed))
    }
}

/// A calendar event as exposed by the API and the local store.
///
/// `id` is a string at this boundary: remote rows carry a UUID rendered to
/// text, local-origin events carry a `local-` prefixed id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub user_id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub event_date: NaiveDate,
    #[serde(with = "wall_clock")]
    pub start_time: NaiveTime,
    #[serde(with = "wall_clock")]
    pub end_time: NaiveTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub color: String,
    pub reminder_minutes: i32,
    pub reminder_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Naive wall-clock datetime the event starts at.
    pub fn starts_at(&self) -> NaiveDateTime {
        self.event_date.and_time(self.start_time)
    }

    /// The half-open interval during which a reminder should fire.
    pub fn reminder_window(&self) -> ReminderWindow {
        reminder::reminder_window(self.event_date, self.start_time, self.reminder_minutes)
    }

    /// Whether this event only exists in the fallback store.
    pub fn is_local(&self) -> bool {
        is_local_id(&self.id)
    }
}

fn default_color() -> String {
    "blue".to_string()
}

fn default_reminder_minutes() -> i32 {
    15
}

/// Inbound event payload: everything the caller controls, nothing the system
/// owns (id, flags, timestamps).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_draft_times"))]
pub struct EventDraft {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    pub description: Option<String>,
    pub event_date: NaiveDate,
    #[serde(with = "wall_clock")]
    pub start_time: NaiveTime,
    #[serde(with = "wall_clock")]
    pub end_time: NaiveTime,
    pub location: Option<String>,
    #[serde(default = "default_color")]
    pub color: String,
    #[validate(range(min = 0, max = 10080, message = "reminder must be 0-10080 minutes"))]
    #[serde(default = "default_reminder_minutes")]
    pub reminder_minutes: i32,
}

fn validate_draft_times(draft: &EventDraft) -> Result<(), ValidationError> {
    if draft.end_time < draft.start_time {
        return Err(ValidationError::new("end_before_start"));
    }
    Ok(())
}

/// A user row with the notification profile.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub telegram_notifications_enabled: bool,
    pub reminder_notifications_enabled: bool,
    pub creation_notifications_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Destination for a creation-confirmation message, if the profile allows
    /// one.
    pub fn creation_destination(&self) -> Option<&str> {
        if self.telegram_notifications_enabled && self.creation_notifications_enabled {
            self.telegram_chat_id.as_deref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn draft() -> EventDraft {
        EventDraft {
            title: "Standup".to_string(),
            description: None,
            event_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            location: None,
            color: "blue".to_string(),
            reminder_minutes: 15,
        }
    }

    #[test]
    fn test_draft_validation() {
        assert!(draft().validate().is_ok());

        let mut empty_title = draft();
        empty_title.title = String::new();
        assert!(empty_title.validate().is_err());

        let mut backwards = draft();
        backwards.end_time = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        assert!(backwards.validate().is_err());

        let mut negative_lead = draft();
        negative_lead.reminder_minutes = -5;
        assert!(negative_lead.validate().is_err());
    }

    #[test]
    fn test_draft_defaults_from_json() {
        let parsed: EventDraft = serde_json::from_str(
            r#"{"title":"Standup","eventDate":"2025-03-10","startTime":"09:00","endTime":"09:30"}"#,
        )
        .unwrap();
        assert_eq!(parsed.reminder_minutes, 15);
        assert_eq!(parsed.color, "blue");
        assert!(parsed.description.is_none());
    }

    #[test]
    fn test_event_json_round_trip() {
        let event = Event {
            id: "local-0b1f8f5e-3bb1-4e6b-9d94-1b2f7d3c9a10".to_string(),
            user_id: Uuid::nil(),
            title: "Standup".to_string(),
            description: Some("daily sync".to_string()),
            event_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            location: Some("Room 4".to_string()),
            color: "green".to_string(),
            reminder_minutes: 15,
            reminder_sent: false,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""startTime":"09:00""#));

        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert!(back.is_local());
    }

    #[test]
    fn test_wall_clock_accepts_seconds() {
        let parsed: EventDraft = serde_json::from_str(
            r#"{"title":"X","eventDate":"2025-03-10","startTime":"09:00:00","endTime":"09:30:00"}"#,
        )
        .unwrap();
        assert_eq!(parsed.start_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    }

    #[test]
    fn test_wall_clock_truncates_seconds() {
        let parsed: EventDraft = serde_json::from_str(
            r#"{"title":"X","eventDate":"2025-03-10","startTime":"09:00:30","endTime":"09:30:45"}"#,
        )
        .unwrap();
        assert_eq!(parsed.start_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(parsed.end_time, NaiveTime::from_hms_opt(9, 30, 0).unwrap());

        // The start scan binds the truncated minute; a stored time with
        // seconds would never equal it.
        let minute = crate::reminder::truncate_to_minute(
            NaiveDate::from_ymd_opt(2025, 3, 10)
                .unwrap()
                .and_hms_opt(9, 0, 44)
                .unwrap(),
        );
        assert_eq!(minute.time(), parsed.start_time);
    }
}
