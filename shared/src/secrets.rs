//! Secrets Manager access.
//!
//! Fetched values are cached for the lifetime of the process; Lambda reuses
//! the execution environment across invocations, so each secret is fetched
//! once per cold start.

use aws_sdk_secretsmanager::Client as SecretsClient;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tokio::sync::RwLock;

use crate::{Config, Error, Result};

static SECRETS_CACHE: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

fn cache() -> &'static RwLock<HashMap<String, String>> {
    SECRETS_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Connection credentials stored in the database secret. Host, port, and
/// database name are optional; the environment supplies fallbacks.
#[derive(Debug, Deserialize)]
pub struct DatabaseCredentials {
    pub username: String,
    pub password: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
}

/// Fetch a secret string, consulting the process cache first.
pub async fn get_secret(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    if let Some(cached) = cache().read().await.get(secret_arn) {
        return Ok(cached.clone());
    }

    let output = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to get secret: {}", e)))?;

    let value = match output.secret_string() {
        Some(s) => s.to_string(),
        None => return Err(Error::Aws("Secret has no string value".to_string())),
    };

    cache()
        .write()
        .await
        .insert(secret_arn.to_string(), value.clone());

    Ok(value)
}

/// Fetch and parse the database credential secret.
pub async fn get_database_credentials(
    client: &SecretsClient,
    secret_arn: &str,
) -> Result<DatabaseCredentials> {
    let raw = get_secret(client, secret_arn).await?;

    serde_json::from_str(&raw)
        .map_err(|e| Error::Aws(format!("Failed to parse database credentials: {}", e)))
}

/// Resolve the Telegram bot token: a directly configured token wins (local
/// runs), otherwise the token secret is fetched. A missing token is a
/// configuration error, reported rather than retried.
pub async fn resolve_bot_token(config: &Config, client: &SecretsClient) -> Result<String> {
    if let Some(token) = &config.telegram_bot_token {
        return Ok(token.clone());
    }

    match config.telegram_token_secret_arn.as_deref() {
        Some(arn) => get_secret(client, arn).await,
        None => Err(Error::Config("TELEGRAM_BOT_TOKEN not configured".to_string())),
    }
}

/// Drop all cached secrets. Needed after a credential rotation.
pub async fn clear_cache() {
    cache().write().await.clear();
}
