// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use huddle_core::HuddleError;
use tracing::debug;

/// Handle to the single-writer SQLite database.
///
/// Wraps one `tokio_rusqlite::Connection`; every query closure runs on its
/// background thread, which serializes all access and eliminates
/// SQLITE_BUSY under concurrent callers.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run all
    /// pending migrations. `wal_mode` selects WAL journaling; without it the
    /// default rollback journal (and full synchronous) stays in effect.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, HuddleError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(HuddleError::storage)?;

        conn.call(move |conn| {
            if wal_mode {
                conn.execute_batch(
                    "PRAGMA journal_mode = WAL;
                     PRAGMA synchronous = NORMAL;",
                )
                .map_err(HuddleError::storage)?;
            }
            conn.execute_batch(
                "PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )
            .map_err(HuddleError::storage)?;
            crate::migrations::run_migrations(conn)?;
            Ok(())
        })
        .await
        .map_err(map_call_err)?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// Open an in-memory database (tests and ephemeral tooling).
    pub async fn open_in_memory() -> Result<Self, HuddleError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(HuddleError::storage)?;
        conn.call(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")
                .map_err(HuddleError::storage)?;
            crate::migrations::run_migrations(conn)?;
            Ok(())
        })
        .await
        .map_err(map_call_err)?;
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection. Query modules call through
    /// this; nothing else should.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(&self) -> Result<(), HuddleError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Map a tokio-rusqlite error into the shared error type.
pub fn map_tr_err(err: tokio_rusqlite::Error) -> HuddleError {
    HuddleError::Storage {
        source: Box::new(err),
    }
}

/// Map a tokio-rusqlite error whose closure already produced a `HuddleError`.
fn map_call_err(err: tokio_rusqlite::Error<HuddleError>) -> HuddleError {
    match err {
        tokio_rusqlite::Error::Error(e) => e,
        other => HuddleError::Storage {
            source: Box::new(other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_database_file_and_schema() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("open.db");
        let db = Database::open(db_path.to_str().unwrap(), true).await.unwrap();
        assert!(db_path.exists());

        // Migrations must have created the core tables.
        let count: i64 = db
            .connection()
            .call(|conn| {
                let n = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                     AND name IN ('messages', 'read_receipts', 'agent_workflows')",
                    [],
                    |row| row.get(0),
                )?;
                Ok::<_, tokio_rusqlite::rusqlite::Error>(n)
            })
            .await
            .unwrap();
        assert_eq!(count, 3);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reopen.db");
        let db = Database::open(db_path.to_str().unwrap(), true).await.unwrap();
        db.close().await.unwrap();
        // Second open re-runs the migration runner, which must be a no-op.
        let db = Database::open(db_path.to_str().unwrap(), true).await.unwrap();
        db.close().await.unwrap();
    }

    async fn journal_mode(db: &Database) -> String {
        db.connection()
            .call(|conn| {
                let mode: String =
                    conn.query_row("PRAGMA journal_mode;", [], |row| row.get(0))?;
                Ok::<_, tokio_rusqlite::rusqlite::Error>(mode)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn wal_mode_flag_selects_journal_mode() {
        let dir = tempdir().unwrap();

        let wal_path = dir.path().join("wal.db");
        let db = Database::open(wal_path.to_str().unwrap(), true).await.unwrap();
        assert_eq!(journal_mode(&db).await, "wal");
        db.close().await.unwrap();

        let plain_path = dir.path().join("plain.db");
        let db = Database::open(plain_path.to_str().unwrap(), false).await.unwrap();
        assert_eq!(journal_mode(&db).await, "delete");
        db.close().await.unwrap();
    }
}
