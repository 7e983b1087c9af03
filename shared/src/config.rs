//! Configuration management for Lambda functions.

use std::env;

use crate::{Error, Result};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database host
    pub db_host: String,
    /// Database name
    pub db_name: String,
    /// ARN of the secret containing database credentials
    pub db_secret_arn: String,
    /// Telegram bot token, when provided directly (local runs)
    pub telegram_bot_token: Option<String>,
    /// ARN of the secret containing the Telegram bot token
    pub telegram_token_secret_arn: Option<String>,
    /// Public hostname of the deployment, used for webhook registration
    pub public_host: Option<String>,
    /// AWS region
    pub aws_region: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            db_host: require("DB_HOST")?,
            db_name: env::var("DB_NAME").unwrap_or_else(|_| "calendar".to_string()),
            db_secret_arn: require("DB_SECRET_ARN")?,
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
            telegram_token_secret_arn: env::var("TELEGRAM_TOKEN_SECRET_ARN").ok(),
            public_host: env::var("PUBLIC_HOST").ok(),
            aws_region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
        })
    }
}

fn require(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("{} not set", name)))
}
