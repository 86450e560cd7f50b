//! SQLite-backed inventory store
//!
//! This module owns the persisted tables the engine works against:
//! - Devices, and the catalog chain they link to (product, category levels)
//! - Jobs and the device-to-job assignment table
//! - Cases and the device-to-case membership table
//!
//! Every method takes the connection lock for one statement or one
//! transaction and releases it before returning. Service-level
//! check-then-act sequences therefore interleave freely; the unique indexes
//! on `job_devices(device_id)` and `case_devices(device_id)` are what keep a
//! device in at most one job and one case.

mod maintenance;
mod queries;
mod schema;
mod types;
mod writes;

pub use maintenance::{ReconcileReport, SweepReport};
pub use types::*;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{ffi, Connection};
use tracing::debug;

use crate::core::error::{InventoryError, Result};

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// The inventory store backed by SQLite
pub struct InventoryStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl InventoryStore {
    /// Open or create a store at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // WAL lets readers proceed while the sweep holds a write transaction
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let store = Self::from_connection(conn, Some(path.to_path_buf()))?;
        debug!(path = %path.display(), "opened inventory store");
        Ok(store)
    }

    /// Open a private in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let store = Self {
            conn: Mutex::new(conn),
            path,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Database file location, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Row counts per table
    pub fn statistics(&self) -> Result<StoreStats> {
        let conn = self.conn();
        let count = |table: &str| -> Result<usize> {
            let n: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })?;
            Ok(n as usize)
        };

        let mut stats = StoreStats {
            devices: count("devices")?,
            products: count("products")?,
            categories: count("categories")?,
            jobs: count("jobs")?,
            cases: count("cases")?,
            assignments: count("job_devices")?,
            case_memberships: count("case_devices")?,
            by_status: HashMap::new(),
            db_size_bytes: 0,
        };

        {
            let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM devices GROUP BY status")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (status, n) = row?;
                stats.by_status.insert(status, n as usize);
            }
        }

        if let Some(ref path) = self.path {
            stats.db_size_bytes = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        }

        Ok(stats)
    }

    /// Execute a read-only SQL query, rendering every value as text
    pub fn query_raw(&self, sql: &str) -> Result<Vec<Vec<String>>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        if !stmt.readonly() {
            return Err(InventoryError::InvalidInput(
                "only read-only statements are allowed".to_string(),
            ));
        }
        let column_count = stmt.column_count();

        let rows = stmt.query_map([], |row| {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let value: String = row
                    .get::<_, rusqlite::types::Value>(i)
                    .map(|v| match v {
                        rusqlite::types::Value::Null => "NULL".to_string(),
                        rusqlite::types::Value::Integer(i) => i.to_string(),
                        rusqlite::types::Value::Real(f) => f.to_string(),
                        rusqlite::types::Value::Text(s) => s,
                        rusqlite::types::Value::Blob(_) => "<blob>".to_string(),
                    })
                    .unwrap_or_default();
                values.push(value);
            }
            Ok(values)
        })?;

        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Column names for a query
    pub fn query_columns(&self, sql: &str) -> Result<Vec<String>> {
        let conn = self.conn();
        let stmt = conn.prepare(sql)?;
        Ok(stmt.column_names().iter().map(|s| s.to_string()).collect())
    }
}

/// True when `err` is a UNIQUE or PRIMARY KEY constraint violation
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation
                && (e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}
