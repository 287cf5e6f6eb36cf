//! Connection ownership and per-operation transactions.

use crate::schema;
use chrono::{DateTime, SecondsFormat, Utc};
use gaitstore_config::GaitStoreConfig;
use gaitstore_core::{Error, Result};
use parking_lot::Mutex;
use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Transactional store for analyses, classifications, training data and
/// pose analysis results.
///
/// A single connection is shared behind a mutex. Every public operation
/// runs inside its own transaction: it commits when the closure returns
/// `Ok` and rolls back when the transaction guard is dropped on any error
/// path, so readers never observe partial rows.
pub struct StructuredStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for StructuredStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl StructuredStore {
    /// Open (or create) the database file at `path` and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::file_system(parent, "create database directory", e))?;
        }

        let conn = Connection::open(path).sql_context("open database")?;
        schema::init_schema(&conn).sql_context("initialize schema")?;
        info!(path = %path.display(), "Opened structured store");

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().sql_context("open database")?;
        schema::init_schema(&conn).sql_context("initialize schema")?;
        debug!("Opened in-memory structured store");

        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    pub fn from_config(config: &GaitStoreConfig) -> Result<Self> {
        Self::open(config.database_path())
    }

    /// Database file path, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` inside a write transaction.
    pub(crate) fn write<T>(
        &self,
        operation: &str,
        f: impl FnOnce(&Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .sql_context(operation)?;
        let value = f(&tx)?;
        tx.commit().sql_context(operation)?;
        Ok(value)
    }

    /// Run `f` inside a read transaction.
    pub(crate) fn read<T>(
        &self,
        operation: &str,
        f: impl FnOnce(&Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Deferred)
            .sql_context(operation)?;
        let value = f(&tx)?;
        tx.commit().sql_context(operation)?;
        Ok(value)
    }

    /// Run `f` on the bare connection, outside any transaction.
    pub(crate) fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        f(&conn)
    }
}

/// Maps rusqlite failures onto the crate error type.
pub(crate) trait SqlResultExt<T> {
    fn sql_context(self, operation: &str) -> Result<T>;
}

impl<T> SqlResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn sql_context(self, operation: &str) -> Result<T> {
        self.map_err(|e| map_sql_error(operation, e))
    }
}

pub(crate) fn map_sql_error(operation: &str, error: rusqlite::Error) -> Error {
    match &error {
        rusqlite::Error::SqliteFailure(failure, message)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            let message = message.clone().unwrap_or_else(|| failure.to_string());
            Error::constraint_violation(operation, message)
        }
        _ => Error::database(operation, error),
    }
}

pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Timestamp column reader for row mappers.
pub(crate) fn timestamp_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// JSON text column reader for row mappers.
pub(crate) fn json_column<T: DeserializeOwned>(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn to_json_text<T: serde::Serialize + ?Sized>(key: &str, value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::serialization(key, "encode column", e))
}

/// Clamp a `usize` page parameter into SQLite's integer range.
pub(crate) fn sql_int(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
