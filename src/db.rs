use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;

use crate::queries::ddl;

/// Open a file-based database pool for production use
/// Creates the file (and its parent directory) when missing and enables WAL mode
pub async fn open_database_connection(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        // Concurrent handlers share the file; wait for the writer lock instead of failing
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    log::info!("SQLite database: {}", db_path.display());
    Ok(pool)
}

/// Create all tables and indexes if they don't exist yet
pub async fn init_database_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(&ddl::create_recordings_table())
        .execute(pool)
        .await?;
    sqlx::query(&ddl::create_recordings_created_at_index())
        .execute(pool)
        .await?;
    Ok(())
}

/// Create a database in a fresh temporary directory for testing
/// Returns the pool and the directory guard; the database lives as long as the guard
pub async fn create_test_connection_in_temporary_file(
) -> Result<(SqlitePool, tempfile::TempDir), Box<dyn std::error::Error + Send + Sync>> {
    let guard = tempfile::tempdir()?;
    let pool = open_database_connection(&guard.path().join("test.sqlite")).await?;
    Ok((pool, guard))
}
