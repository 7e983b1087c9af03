//! Client-local notification settings.
//!
//! A small JSON blob under a fixed key, read at settings-screen mount and at
//! event save when the backend profile is unreachable. The remote `users` row
//! is the source of truth; this is the on-device fallback.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Fixed storage key for the blob.
pub const SETTINGS_KEY: &str = "telegram-settings";

/// Destination id plus the per-category toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub chat_id: Option<String>,
    pub telegram_notifications_enabled: bool,
    pub reminder_notifications_enabled: bool,
    pub creation_notifications_enabled: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            chat_id: None,
            telegram_notifications_enabled: true,
            reminder_notifications_enabled: true,
            creation_notifications_enabled: true,
        }
    }
}

impl NotificationSettings {
    /// Destination for a creation-confirmation message, if these settings
    /// allow one.
    pub fn creation_destination(&self) -> Option<&str> {
        if self.telegram_notifications_enabled && self.creation_notifications_enabled {
            self.chat_id.as_deref()
        } else {
            None
        }
    }
}

/// File-backed store for [`NotificationSettings`].
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Store persisted under `<dir>/telegram-settings.json`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(format!("{}.json", SETTINGS_KEY)),
        }
    }

    /// Load the settings; a missing file yields the defaults.
    pub fn load(&self) -> Result<NotificationSettings> {
        if !self.path.exists() {
            return Ok(NotificationSettings::default());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Persist the settings, replacing whatever was stored. Last write wins.
    pub fn save(&self, settings: &NotificationSettings) -> Result<()> {
        std::fs::write(&self.path, serde_json::to_string_pretty(settings)?)?;
        Ok(())
    }
}
