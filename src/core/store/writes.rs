//! Write operations
//!
//! Catalog and inventory upserts used by import, plus the guarded inserts
//! for assignment and case membership rows.

use rusqlite::{params, OptionalExtension, ToSql, TransactionBehavior};

use super::{
    is_unique_violation, Case, Category, Claim, Device, DeviceStatus, InventoryStore, Job, Product,
    SubSubcategory, Subcategory,
};
use crate::core::error::Result;

impl InventoryStore {
    // =====================================================================
    // Catalog and inventory upserts
    // =====================================================================

    pub fn upsert_category(&self, category: &Category) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO categories (category_id, name) VALUES (?1, ?2)",
            params![category.category_id, category.name],
        )?;
        Ok(())
    }

    pub fn upsert_subcategory(&self, sub: &Subcategory) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO subcategories (subcategory_id, category_id, name) VALUES (?1, ?2, ?3)",
            params![sub.subcategory_id, sub.category_id, sub.name],
        )?;
        Ok(())
    }

    pub fn upsert_subsubcategory(&self, subsub: &SubSubcategory) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO subsubcategories (subsubcategory_id, subcategory_id, name) VALUES (?1, ?2, ?3)",
            params![subsub.subsubcategory_id, subsub.subcategory_id, subsub.name],
        )?;
        Ok(())
    }

    pub fn upsert_product(&self, product: &Product) -> Result<()> {
        self.conn().execute(
            r#"INSERT OR REPLACE INTO products
               (product_id, name, category_id, subcategory_id, subsubcategory_id, price_per_day)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                product.product_id,
                product.name,
                product.category_id,
                product.subcategory_id,
                product.subsubcategory_id,
                product.price_per_day
            ],
        )?;
        Ok(())
    }

    /// Insert or update a device, keeping its assignment and case rows
    pub fn upsert_device(&self, device: &Device) -> Result<()> {
        self.conn().execute(
            r#"INSERT INTO devices
               (device_id, serial_number, product_id, status, notes, purchase_date, last_maintenance)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
               ON CONFLICT(device_id) DO UPDATE SET
                   serial_number = excluded.serial_number,
                   product_id = excluded.product_id,
                   status = excluded.status,
                   notes = excluded.notes,
                   purchase_date = excluded.purchase_date,
                   last_maintenance = excluded.last_maintenance"#,
            params![
                device.device_id,
                device.serial_number,
                device.product_id,
                device.status,
                device.notes,
                device.purchase_date,
                device.last_maintenance
            ],
        )?;
        Ok(())
    }

    pub fn upsert_job(&self, job: &Job) -> Result<()> {
        self.conn().execute(
            r#"INSERT INTO jobs (job_id, name, status, start_date, end_date)
               VALUES (?1, ?2, ?3, ?4, ?5)
               ON CONFLICT(job_id) DO UPDATE SET
                   name = excluded.name,
                   status = excluded.status,
                   start_date = excluded.start_date,
                   end_date = excluded.end_date"#,
            params![job.job_id, job.name, job.status, job.start_date, job.end_date],
        )?;
        Ok(())
    }

    pub fn upsert_case(&self, case: &Case) -> Result<()> {
        self.conn().execute(
            r#"INSERT INTO cases (case_id, name, description) VALUES (?1, ?2, ?3)
               ON CONFLICT(case_id) DO UPDATE SET
                   name = excluded.name,
                   description = excluded.description"#,
            params![case.case_id, case.name, case.description],
        )?;
        Ok(())
    }

    /// Returns false when the job does not exist
    pub fn set_job_status(&self, job_id: i64, status: &str) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE jobs SET status = ?1 WHERE job_id = ?2",
            params![status, job_id],
        )?;
        Ok(changed > 0)
    }

    /// Returns false when the device does not exist
    pub fn set_device_status(&self, device_id: &str, status: DeviceStatus) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE devices SET status = ?1 WHERE device_id = ?2",
            params![status, device_id],
        )?;
        Ok(changed > 0)
    }

    // =====================================================================
    // Guarded inserts
    // =====================================================================

    /// Insert an assignment row; the unique index on `device_id` decides
    pub fn insert_assignment(
        &self,
        job_id: i64,
        device_id: &str,
        custom_price: Option<f64>,
    ) -> Result<Claim> {
        self.guarded_insert(
            "INSERT INTO job_devices (job_id, device_id, custom_price) VALUES (?1, ?2, ?3)",
            params![job_id, device_id, custom_price],
            "SELECT job_id FROM job_devices WHERE device_id = ?1",
            device_id,
        )
    }

    /// Returns false when no such row existed
    pub fn delete_assignment(&self, job_id: i64, device_id: &str) -> Result<bool> {
        let removed = self.conn().execute(
            "DELETE FROM job_devices WHERE job_id = ?1 AND device_id = ?2",
            params![job_id, device_id],
        )?;
        Ok(removed > 0)
    }

    /// Insert a case membership row; the unique index on `device_id` decides
    pub fn insert_case_device(&self, case_id: i64, device_id: &str) -> Result<Claim> {
        self.guarded_insert(
            "INSERT INTO case_devices (case_id, device_id) VALUES (?1, ?2)",
            params![case_id, device_id],
            "SELECT case_id FROM case_devices WHERE device_id = ?1",
            device_id,
        )
    }

    /// Returns false when no such row existed
    pub fn delete_case_device(&self, case_id: i64, device_id: &str) -> Result<bool> {
        let removed = self.conn().execute(
            "DELETE FROM case_devices WHERE case_id = ?1 AND device_id = ?2",
            params![case_id, device_id],
        )?;
        Ok(removed > 0)
    }

    /// Run `insert`; on a unique violation read the holder in the same transaction
    fn guarded_insert(
        &self,
        insert: &str,
        insert_params: &[&dyn ToSql],
        holder_query: &str,
        device_id: &str,
    ) -> Result<Claim> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let claim = match tx.execute(insert, insert_params) {
            Ok(_) => Claim::Inserted,
            Err(e) if is_unique_violation(&e) => {
                let holder: Option<i64> = tx
                    .query_row(holder_query, params![device_id], |row| row.get(0))
                    .optional()?;
                match holder {
                    Some(id) => Claim::HeldBy(id),
                    None => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit()?;
        Ok(claim)
    }
}
