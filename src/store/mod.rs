//! SQLite persistence layer.
//!
//! RULE: only the store talks to the database. Each operation opens its own
//! connection from [`Database`] and drops it when done.

mod catalog;
mod clients;
mod reports;
mod sales;

pub use catalog::{CatalogRepository, Category, NewMedicine};
pub use clients::ClientRepository;
pub use reports::ReportRepository;
pub use sales::SaleRepository;

use chrono::NaiveDateTime;
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Connection factory. Holds only the database location captured at
/// startup; it is cloned into every repository that needs it.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    /// Open (creating if needed) the database file and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Self {
            path: path.as_ref().to_path_buf(),
        };
        db.migrate()?;
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(conn)
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(include_str!("../../migrations/001_schema.sql"))?;
        log::debug!("schema applied to {}", self.path.display());
        Ok(())
    }
}

/// Record lifecycle. Deleted rows stay in the table and are filtered out
/// by every default query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Active,
    Deleted,
}

impl Lifecycle {
    pub fn from_flag(is_deleted: i64) -> Self {
        if is_deleted != 0 {
            Lifecycle::Deleted
        } else {
            Lifecycle::Active
        }
    }

    pub fn flag(self) -> i64 {
        match self {
            Lifecycle::Active => 0,
            Lifecycle::Deleted => 1,
        }
    }
}

pub(crate) fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
