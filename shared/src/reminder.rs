//! Reminder-window predicates.
//!
//! The scanners decide delivery with these pure functions; everything else
//! (queries, Telegram calls, flag writes) is IO around them.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// The half-open interval `[event start - lead, event start)` during which a
/// reminder should fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderWindow {
    pub opens_at: NaiveDateTime,
    pub closes_at: NaiveDateTime,
}

impl ReminderWindow {
    /// Whether `now` lies inside the window. Half-open: the event's start
    /// minute itself is outside (that moment belongs to the start-of-event
    /// check).
    pub fn contains(&self, now: NaiveDateTime) -> bool {
        self.opens_at <= now && now < self.closes_at
    }
}

/// Compute the reminder window for an event. A zero lead yields an empty
/// window that contains nothing.
pub fn reminder_window(
    event_date: NaiveDate,
    start_time: NaiveTime,
    reminder_minutes: i32,
) -> ReminderWindow {
    let closes_at = event_date.and_time(start_time);
    ReminderWindow {
        opens_at: closes_at - Duration::minutes(reminder_minutes.max(0) as i64),
        closes_at,
    }
}

/// Whether an unsent reminder is due at `now`.
pub fn due_for_reminder(
    event_date: NaiveDate,
    start_time: NaiveTime,
    reminder_minutes: i32,
    reminder_sent: bool,
    now: NaiveDateTime,
) -> bool {
    !reminder_sent && reminder_window(event_date, start_time, reminder_minutes).contains(now)
}

/// Whether the event starts in the minute containing `now`.
pub fn starts_at_minute(event_date: NaiveDate, start_time: NaiveTime, now: NaiveDateTime) -> bool {
    event_date == now.date()
        && start_time.hour() == now.time().hour()
        && start_time.minute() == now.time().minute()
}

/// Whole minutes from `now` until the event starts (negative once started).
pub fn minutes_until_start(
    event_date: NaiveDate,
    start_time: NaiveTime,
    now: NaiveDateTime,
) -> i64 {
    (event_date.and_time(start_time) - now).num_minutes()
}

/// Truncate a datetime to minute precision. Scanners compare at minute
/// granularity; stray seconds from the invocation clock must not matter.
pub fn truncate_to_minute(dt: NaiveDateTime) -> NaiveDateTime {
    dt.with_second(0)
        .and_then(|dt| dt.with_nanosecond(0))
        .unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_window_bounds() {
        // Event 2025-03-10 09:00, lead 15 -> window [08:45, 09:00).
        let window = reminder_window(date(), time(9, 0), 15);
        assert_eq!(window.opens_at, date().and_time(time(8, 45)));
        assert_eq!(window.closes_at, date().and_time(time(9, 0)));

        assert!(!window.contains(date().and_time(time(8, 44))));
        assert!(window.contains(date().and_time(time(8, 45))));
        assert!(window.contains(date().and_time(time(8, 59))));
        assert!(!window.contains(date().and_time(time(9, 0))));
    }

    #[test]
    fn test_due_respects_sent_flag() {
        let at_0845 = date().and_time(time(8, 45));
        assert!(due_for_reminder(date(), time(9, 0), 15, false, at_0845));
        // Once the flag is set, a later run inside the window delivers nothing.
        assert!(!due_for_reminder(date(), time(9, 0), 15, true, at_0845));
        assert!(!due_for_reminder(
            date(),
            time(9, 0),
            15,
            true,
            date().and_time(time(8, 50))
        ));
    }

    #[test]
    fn test_zero_lead_never_due() {
        let window = reminder_window(date(), time(9, 0), 0);
        assert_eq!(window.opens_at, window.closes_at);
        assert!(!window.contains(date().and_time(time(9, 0))));
        assert!(!due_for_reminder(date(), time(9, 0), 0, false, date().and_time(time(9, 0))));
    }

    #[test]
    fn test_window_crosses_midnight() {
        // Event at 00:10 with a 30-minute lead opens the previous evening.
        let window = reminder_window(date(), time(0, 10), 30);
        assert_eq!(
            window.opens_at,
            NaiveDate::from_ymd_opt(2025, 3, 9).unwrap().and_time(time(23, 40))
        );
        assert!(window.contains(
            NaiveDate::from_ymd_opt(2025, 3, 9).unwrap().and_time(time(23, 45))
        ));
    }

    #[test]
    fn test_starts_at_minute_ignores_seconds() {
        let now = date().and_time(NaiveTime::from_hms_opt(9, 0, 37).unwrap());
        assert!(starts_at_minute(date(), time(9, 0), now));
        assert!(!starts_at_minute(date(), time(9, 1), now));
        assert!(!starts_at_minute(
            NaiveDate::from_ymd_opt(2025, 3, 11).unwrap(),
            time(9, 0),
            now
        ));
    }

    #[test]
    fn test_minutes_until_start() {
        let now = date().and_time(time(8, 45));
        assert_eq!(minutes_until_start(date(), time(9, 0), now), 15);
        assert_eq!(minutes_until_start(date(), time(8, 40), now), -5);
    }

    #[test]
    fn test_truncate_to_minute() {
        let noisy = date().and_time(NaiveTime::from_hms_milli_opt(8, 45, 59, 500).unwrap());
        assert_eq!(truncate_to_minute(noisy), date().and_time(time(8, 45)));
    }
}
