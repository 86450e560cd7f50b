//! Database schema initialization

use rusqlite::{params, OptionalExtension};

use super::{InventoryStore, SCHEMA_VERSION};
use crate::core::error::{InventoryError, Result};

impl InventoryStore {
    /// Create tables if missing and check the schema version
    pub(super) fn init_schema(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- Catalog index (read-only to the engine)
            CREATE TABLE IF NOT EXISTS categories (
                category_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS subcategories (
                subcategory_id INTEGER PRIMARY KEY,
                category_id INTEGER NOT NULL,
                name TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_subcategories_category ON subcategories(category_id);

            CREATE TABLE IF NOT EXISTS subsubcategories (
                subsubcategory_id INTEGER PRIMARY KEY,
                subcategory_id INTEGER NOT NULL,
                name TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_subsubcategories_subcategory ON subsubcategories(subcategory_id);

            CREATE TABLE IF NOT EXISTS products (
                product_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                category_id INTEGER,
                subcategory_id INTEGER,
                subsubcategory_id INTEGER,
                price_per_day REAL NOT NULL DEFAULT 0
            );

            -- Devices; product_id may dangle, the catalog is maintained elsewhere
            CREATE TABLE IF NOT EXISTS devices (
                device_id TEXT PRIMARY KEY,
                serial_number TEXT UNIQUE,
                product_id INTEGER,
                status TEXT NOT NULL DEFAULT 'free',
                notes TEXT,
                purchase_date TEXT,
                last_maintenance TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_devices_product ON devices(product_id);
            CREATE INDEX IF NOT EXISTS idx_devices_status ON devices(status);

            CREATE TABLE IF NOT EXISTS jobs (
                job_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'open',
                start_date TEXT,
                end_date TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);

            -- One assignment per device system-wide
            CREATE TABLE IF NOT EXISTS job_devices (
                job_id INTEGER NOT NULL,
                device_id TEXT NOT NULL,
                custom_price REAL,
                PRIMARY KEY (job_id, device_id),
                FOREIGN KEY (job_id) REFERENCES jobs(job_id) ON DELETE CASCADE,
                FOREIGN KEY (device_id) REFERENCES devices(device_id) ON DELETE CASCADE
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_job_devices_device ON job_devices(device_id);

            CREATE TABLE IF NOT EXISTS cases (
                case_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT
            );

            -- One case per device
            CREATE TABLE IF NOT EXISTS case_devices (
                case_id INTEGER NOT NULL,
                device_id TEXT NOT NULL,
                PRIMARY KEY (case_id, device_id),
                FOREIGN KEY (case_id) REFERENCES cases(case_id) ON DELETE CASCADE,
                FOREIGN KEY (device_id) REFERENCES devices(device_id) ON DELETE CASCADE
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_case_devices_device ON case_devices(device_id);
            "#,
        )?;

        let stored: Option<i32> = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .optional()?
            .flatten();

        match stored {
            None => {
                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?1)",
                    params![SCHEMA_VERSION],
                )?;
            }
            Some(v) if v > SCHEMA_VERSION => {
                return Err(InventoryError::InvalidInput(format!(
                    "database schema version {} is newer than supported version {}",
                    v, SCHEMA_VERSION
                )));
            }
            Some(_) => {}
        }

        Ok(())
    }

    /// Schema version recorded in the database
    pub fn schema_version(&self) -> Result<i32> {
        let conn = self.conn();
        let version: i32 =
            conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
        Ok(version)
    }
}
