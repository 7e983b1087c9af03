//! Shared library for the calendar Lambda functions.
//!
//! This crate provides common utilities, types, and clients used across all Lambda functions.

pub mod auth;
pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod fallback;
pub mod http;
pub mod models;
pub mod reminder;
pub mod secrets;
pub mod settings;
pub mod telegram;
pub mod templates;

pub use auth::{authenticate, AuthenticatedUser};
pub use config::Config;
pub use error::{Error, Result};
pub use events::{EventOwner, EventStore, PgEventStore};
pub use fallback::{FallbackEventStore, LocalEventStore};
pub use models::{Event, EventDraft, UserProfile};
pub use telegram::TelegramClient;
