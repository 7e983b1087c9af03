//! Database connection management.

use aws_sdk_secretsmanager::Client as SecretsClient;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::secrets::get_database_credentials;
use crate::{Config, Error, Result};

/// Create a database connection pool from credentials in Secrets Manager.
///
/// The secret may carry its own host/port/dbname; the environment values are
/// the fallback.
pub async fn create_pool(config: &Config, secrets: &SecretsClient) -> Result<PgPool> {
    let creds = get_database_credentials(secrets, &config.db_secret_arn).await?;

    let host = creds.host.as_deref().unwrap_or(&config.db_host);
    let port = creds.port.unwrap_or(5432);
    let dbname = creds.dbname.as_deref().unwrap_or(&config.db_name);

    let database_url = format!(
        "postgres://{}:{}@{}:{}/{}",
        creds.username, creds.password, host, port, dbname
    );

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&database_url)
        .await
        .map_err(Error::Database)?;

    Ok(pool)
}
