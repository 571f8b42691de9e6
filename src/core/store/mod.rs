//! SQLite-backed store for vendors, platforms, grouping nodes and commands
//!
//! The store owns a single connection. Data access lives in per-entity
//! modules as free functions over `&Connection`, so the same code runs
//! against the plain connection, a `Transaction` or a `Savepoint`.
//!
//! Case-insensitive uniqueness is enforced by the schema (`COLLATE NOCASE`
//! columns and unique indexes), not by the callers.

pub mod commands;
pub mod history;
pub mod nodes;
pub mod platforms;
mod schema;
mod tree;
mod types;
pub mod vendors;

pub use tree::{NodeTree, TreeEntry};
pub use types::*;

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rusqlite::{Connection, Transaction};
use thiserror::Error;

use crate::core::actor::Actor;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// How long a writer waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised by store operations
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("database error: {0}")]
    #[diagnostic(code(pxo::store::sqlite))]
    Sqlite(#[from] rusqlite::Error),

    #[error("{entity} not found: {key}")]
    #[diagnostic(code(pxo::store::not_found))]
    NotFound { entity: &'static str, key: String },

    #[error("{entity} '{name}' already exists{scope}")]
    #[diagnostic(code(pxo::store::conflict))]
    Conflict {
        entity: &'static str,
        name: String,
        scope: String,
    },

    #[error("invalid {field}: {message}")]
    #[diagnostic(code(pxo::store::invalid))]
    Invalid { field: &'static str, message: String },

    #[error("{entity} {id} was created by '{owner}'")]
    #[diagnostic(
        code(pxo::store::not_owner),
        help("only the creator or an admin can delete it")
    )]
    NotOwner {
        entity: &'static str,
        id: i64,
        owner: String,
    },

    #[error("store schema version {found} does not match the supported version {expected}")]
    #[diagnostic(
        code(pxo::store::schema_version),
        help("the database was written by a different pxo release; export it with that release")
    )]
    SchemaMismatch { found: i32, expected: i32 },

    #[error("IO error: {0}")]
    #[diagnostic(code(pxo::store::io))]
    Io(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        StoreError::Invalid {
            field,
            message: message.into(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The taxonomy store
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the store at `path`
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }

        let conn = Connection::open(path)?;

        // WAL lets concurrent readers proceed while an import is writing
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        Self::from_connection(conn)
    }

    /// Open a throwaway in-memory store
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let mut store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&mut self) -> StoreResult<()> {
        match self.schema_version()? {
            None => self.init_schema(),
            Some(v) if v == SCHEMA_VERSION => Ok(()),
            Some(found) => Err(StoreError::SchemaMismatch {
                found,
                expected: SCHEMA_VERSION,
            }),
        }
    }

    /// Borrow the connection for reads and single-statement writes
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction; dropping it without commit rolls back
    pub fn transaction(&mut self) -> StoreResult<Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }
}

/// Current time as stored in timestamp columns
pub(crate) fn now() -> String {
    Utc::now().to_rfc3339()
}

/// Parse a stored timestamp
pub(crate) fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

/// True for UNIQUE / PRIMARY KEY constraint failures
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

/// Validate a required text field: non-blank and within `max` characters
pub(crate) fn require_text(field: &'static str, value: &str, max: usize) -> StoreResult<()> {
    if value.trim().is_empty() {
        return Err(StoreError::invalid(field, "must not be empty"));
    }
    limit_text(field, Some(value), max)
}

/// Validate an optional text field against a character limit
pub(crate) fn limit_text(field: &'static str, value: Option<&str>, max: usize) -> StoreResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(StoreError::invalid(
            field,
            format!("must be at most {} characters (got {})", max, v.chars().count()),
        )),
        _ => Ok(()),
    }
}

/// Enforce owner-scoped deletes
pub(crate) fn ensure_owner(
    entity: &'static str,
    id: i64,
    owner: &str,
    actor: &Actor,
) -> StoreResult<()> {
    if actor.can_modify(owner) {
        Ok(())
    } else {
        Err(StoreError::NotOwner {
            entity,
            id,
            owner: owner.to_string(),
        })
    }
}
