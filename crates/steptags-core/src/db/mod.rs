//! SQLite storage for projects, steps, memberships, invites and activity.
//!
//! [`Database`] wraps one `rusqlite` connection. Queries are grouped by
//! record type, each file adding an `impl Database` block:
//!
//! - [`step_queries`]: the step collection, soft delete and subtree walks
//! - [`project_queries`]: projects and their per-member summaries
//! - [`member_queries`]: memberships and invites
//! - [`activity_queries`]: the activity log
//!
//! Nothing here checks roles; permission checks live in [`crate::tracker`].

use std::path::Path;

use jiff::{civil::Date, Timestamp};
use rusqlite::{types::Type, Connection};

use crate::error::{DatabaseResultExt, Result};

pub mod activity_queries;
pub mod member_queries;
pub mod migrations;
pub mod project_queries;
pub mod step_queries;

/// Database connection and operations handler.
pub struct Database {
    connection: Connection,
}

impl Database {
    /// Opens (creating if needed) the database and brings the schema up to date.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = Connection::open(path).db_context("Failed to open database connection")?;

        let db = Self { connection };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Private in-memory database, used by tests.
    pub fn in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory().db_context("Failed to open in-memory database")?;

        let db = Self { connection };
        db.initialize_schema()?;
        Ok(db)
    }
}

/// Parse an RFC 3339 column.
pub(crate) fn timestamp_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Timestamp> {
    row.get::<_, String>(idx)?
        .parse::<Timestamp>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn optional_timestamp_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<Timestamp>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| {
            raw.parse::<Timestamp>()
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
        })
        .transpose()
}

pub(crate) fn optional_date_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<Date>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| {
            raw.parse::<Date>()
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
        })
        .transpose()
}

/// Parse a text column through `FromStr`.
pub(crate) fn parsed_column<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}
