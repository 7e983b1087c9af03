//! Message templates for Telegram notifications.
//!
//! Templates tolerate missing optional fields by omitting the whole line,
//! never by rendering a placeholder.

use chrono::{NaiveDate, NaiveTime};

use crate::models::Event;

/// The event fields a message template substitutes. Scanner rows and store
/// events both convert into this.
#[derive(Debug, Clone)]
pub struct EventMessage {
    pub title: String,
    pub event_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl From<&Event> for EventMessage {
    fn from(event: &Event) -> Self {
        Self {
            title: event.title.clone(),
            event_date: event.event_date,
            start_time: event.start_time,
            end_time: Some(event.end_time),
            location: event.location.clone(),
            description: event.description.clone(),
        }
    }
}

fn long_date(date: NaiveDate) -> String {
    // "Monday, March 10, 2025"
    date.format("%A, %B %-d, %Y").to_string()
}

fn clock(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

fn time_range(start: NaiveTime, end: Option<NaiveTime>) -> String {
    match end {
        Some(end) => format!("{} - {}", clock(start), clock(end)),
        None => clock(start),
    }
}

/// Confirmation sent right after an event is saved.
pub fn creation_confirmation(event: &EventMessage) -> String {
    let mut lines = vec![
        "✅ <b>Event Created Successfully!</b>".to_string(),
        String::new(),
        format!("📅 <b>{}</b>", event.title),
        String::new(),
        format!("🗓 <b>Date:</b> {}", long_date(event.event_date)),
        format!("⏰ <b>Time:</b> {}", clock(event.start_time)),
    ];

    if let Some(location) = &event.location {
        lines.push(format!("📍 <b>Location:</b> {}", location));
    }
    if let Some(description) = &event.description {
        lines.push(format!("📝 <b>Description:</b> {}", description));
    }

    lines.push(String::new());
    lines.push("🚀 <i>You will receive a notification when the event starts</i>".to_string());
    lines.join("\n")
}

/// Reminder sent while now is inside the event's reminder window.
pub fn reminder(event: &EventMessage, minutes_until_start: i64) -> String {
    let mut lines = vec![
        "🔔 <b>Event Reminder</b>".to_string(),
        String::new(),
        format!("📅 <b>{}</b>", event.title),
        String::new(),
        format!("🗓 <b>Date:</b> {}", long_date(event.event_date)),
        format!(
            "⏰ <b>Time:</b> {}",
            time_range(event.start_time, event.end_time)
        ),
    ];

    if let Some(location) = &event.location {
        lines.push(format!("📍 <b>Location:</b> {}", location));
    }
    if let Some(description) = &event.description {
        lines.push(format!("📝 <b>Description:</b> {}", description));
    }

    lines.push(String::new());
    lines.push(format!(
        "⏳ <i>Starting in {} minutes</i>",
        minutes_until_start
    ));
    lines.join("\n")
}

/// Notification for an event whose start minute is now.
pub fn event_starting_now(event: &EventMessage) -> String {
    let mut lines = vec![
        "🚀 <b>Event Starting Now!</b>".to_string(),
        String::new(),
        format!("📅 <b>{}</b>", event.title),
        String::new(),
        format!(
            "⏰ <b>Time:</b> {}",
            time_range(event.start_time, event.end_time)
        ),
        format!("🗓 <b>Date:</b> {}", long_date(event.event_date)),
    ];

    if let Some(location) = &event.location {
        lines.push(format!("📍 <b>Location:</b> {}", location));
    }
    if let Some(description) = &event.description {
        lines.push(String::new());
        lines.push(format!("📝 <b>Description:</b> {}", description));
    }

    lines.push(String::new());
    lines.push("🎯 <i>Your event is starting right now!</i>".to_string());
    lines.join("\n")
}

/// Reply to `/start`.
pub fn welcome(first_name: &str, chat_id: i64) -> String {
    format!(
        "👋 Hello {first_name}!\n\
         \n\
         Welcome to Calendar App Bot!\n\
         \n\
         🆔 Your Chat ID: <code>{chat_id}</code>\n\
         \n\
         📋 <b>How to use:</b>\n\
         1. Copy your Chat ID above\n\
         2. Go to the Calendar App settings\n\
         3. Paste your Chat ID in Telegram settings\n\
         4. Enable notifications\n\
         \n\
         You'll receive notifications about:\n\
         • ✅ New events created\n\
         • 🔔 Event reminders\n\
         \n\
         Type /help for more information."
    )
}

/// Reply to `/help`.
pub fn help(chat_id: i64) -> String {
    format!(
        "📚 <b>Calendar App Bot Help</b>\n\
         \n\
         🆔 <b>Your Chat ID:</b> <code>{chat_id}</code>\n\
         \n\
         📋 <b>Available Commands:</b>\n\
         /start - Get your Chat ID and setup instructions\n\
         /help - Show this help message\n\
         /id - Get your Chat ID\n\
         \n\
         🔔 <b>Notifications:</b>\n\
         This bot will send you notifications about your calendar events when properly configured in the Calendar App.\n\
         \n\
         ⚙️ <b>Setup:</b>\n\
         1. Copy your Chat ID\n\
         2. Open Calendar App settings\n\
         3. Enter your Chat ID in Telegram settings\n\
         4. Test the connection"
    )
}

/// Reply to `/id`.
pub fn chat_id_reply(chat_id: i64) -> String {
    format!("🆔 Your Chat ID: <code>{chat_id}</code>")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(location: Option<&str>, description: Option<&str>) -> EventMessage {
        EventMessage {
            title: "Standup".to_string(),
            event_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: Some(NaiveTime::from_hms_opt(9, 30, 0).unwrap()),
            location: location.map(String::from),
            description: description.map(String::from),
        }
    }

    #[test]
    fn test_long_date_format() {
        assert_eq!(
            long_date(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()),
            "Monday, March 10, 2025"
        );
        assert_eq!(
            long_date(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()),
            "Saturday, March 1, 2025"
        );
    }

    #[test]
    fn test_optional_lines_omitted_not_placeholders() {
        let text = creation_confirmation(&message(None, None));
        assert!(text.contains("Standup"));
        assert!(text.contains("Monday, March 10, 2025"));
        assert!(!text.contains("Location"));
        assert!(!text.contains("Description"));
        assert!(!text.contains("null"));
        assert!(!text.contains("None"));
    }

    #[test]
    fn test_optional_lines_present_when_set() {
        let text = creation_confirmation(&message(Some("Room 4"), Some("daily sync")));
        assert!(text.contains("📍 <b>Location:</b> Room 4"));
        assert!(text.contains("📝 <b>Description:</b> daily sync"));
    }

    #[test]
    fn test_reminder_reports_lead() {
        let text = reminder(&message(None, None), 15);
        assert!(text.contains("Event Reminder"));
        assert!(text.contains("Starting in 15 minutes"));
        assert!(text.contains("⏰ <b>Time:</b> 09:00 - 09:30"));
    }

    #[test]
    fn test_starting_now_time_range_without_end() {
        let mut msg = message(None, None);
        msg.end_time = None;
        let text = event_starting_now(&msg);
        assert!(text.contains("⏰ <b>Time:</b> 09:00\n"));
        assert!(text.contains("starting right now"));
    }

    #[test]
    fn test_chat_id_reply_format() {
        assert_eq!(chat_id_reply(555), "🆔 Your Chat ID: <code>555</code>");
    }

    #[test]
    fn test_welcome_and_help_carry_chat_id() {
        assert!(welcome("Alice", 555).contains("<code>555</code>"));
        assert!(help(555).contains("<code>555</code>"));
        assert!(help(555).contains("/id"));
    }
}
