//! `SQLite` backend for profiles, game results, login attempts and local accounts.

use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnection, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::repository::Storage;

mod account_repo;
mod attempt_repo;
mod mapping;
mod migrate;
mod result_repo;
mod user_repo;

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Implements every repository trait over one connection pool.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

async fn configure(conn: &mut SqliteConnection, file_backed: bool) -> Result<(), sqlx::Error> {
    for pragma in ["PRAGMA foreign_keys = ON;", "PRAGMA busy_timeout = 5000;"] {
        sqlx::query(pragma).execute(&mut *conn).await?;
    }
    if file_backed {
        sqlx::query("PRAGMA journal_mode = WAL;")
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

impl SqliteRepository {
    /// Connect to `SQLite` using the given URL.
    ///
    /// Every pooled connection enforces foreign keys. File databases also
    /// switch to WAL; in-memory ones keep the default journal.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or a
    /// connection pragma fails.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let file_backed =
            !database_url.contains(":memory:") && !database_url.contains("mode=memory");
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .after_connect(move |conn, _meta| Box::pin(configure(conn, file_backed)))
            .connect(database_url)
            .await?;
        tracing::debug!(url = database_url, file_backed, "connected to sqlite");
        Ok(Self { pool })
    }

    /// Connect and bring the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connecting or migrating fails.
    pub async fn open(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::open(database_url).await?;
        Ok(Self {
            users: Arc::new(repo.clone()),
            results: Arc::new(repo.clone()),
            attempts: Arc::new(repo.clone()),
            accounts: Arc::new(repo),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteRepository>();
    }

    #[tokio::test]
    async fn open_enforces_foreign_keys() {
        let repo = SqliteRepository::open("sqlite:file:memdb_pragmas?mode=memory&cache=shared")
            .await
            .unwrap();
        let (enabled,): (i64,) = sqlx::query_as("PRAGMA foreign_keys;")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }
}
