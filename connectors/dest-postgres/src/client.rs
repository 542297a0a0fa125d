//! Connection setup for the relational store.

use tokio_postgres::{Client, Config as PgConfig, NoTls};

use tablehop_types::error::{Result, TransferError};

use crate::config::Config;

/// Connect and spawn the connection driver onto the current runtime.
pub async fn connect(config: &Config) -> Result<Client> {
    let mut pg = PgConfig::new();
    pg.host(&config.host);
    pg.port(config.port);
    pg.user(&config.user);
    if !config.password.is_empty() {
        pg.password(&config.password);
    }
    pg.dbname(&config.database);
    pg.application_name("tablehop");

    let (client, connection) = pg.connect(NoTls).await.map_err(|e| {
        TransferError::connection(
            "CONNECTION_FAILED",
            format!(
                "cannot connect to {}:{}/{}: {e}",
                config.host, config.port, config.database
            ),
        )
    })?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(error = %e, "PostgreSQL connection error");
        }
    });

    tracing::debug!(
        host = %config.host,
        port = config.port,
        database = %config.database,
        "Connected to PostgreSQL"
    );
    Ok(client)
}

/// Round-trip `SELECT 1` to prove the session is usable.
pub async fn check(client: &Client) -> Result<()> {
    client.query_one("SELECT 1", &[]).await.map_err(|e| {
        TransferError::connection(
            "CONNECTION_TEST_FAILED",
            format!("connection test failed: {e}"),
        )
    })?;
    Ok(())
}

/// Render a server error with its SQLSTATE, detail, and hint.
pub fn format_pg_error(prefix: &str, error: &tokio_postgres::Error) -> String {
    if let Some(db_error) = error.as_db_error() {
        format!(
            "{prefix}: {} (sqlstate={} detail={} hint={})",
            db_error.message(),
            db_error.code().code(),
            db_error.detail().unwrap_or("n/a"),
            db_error.hint().unwrap_or("n/a"),
        )
    } else {
        format!("{prefix}: {error}")
    }
}
