//! Transactional maintenance passes
//!
//! Both passes run in a single transaction: either every row changes or
//! none does.

use rusqlite::params;
use serde::Serialize;

use super::{DeviceStatus, InventoryStore};
use crate::core::error::Result;

/// Result of freeing the devices of completed jobs
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub jobs: Vec<i64>,
    pub assignments_removed: usize,
    pub devices_freed: Vec<String>,
}

/// Result of reconciling device status with the assignment table
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ReconcileReport {
    /// Devices flipped from `free` to `assigned`
    pub marked_assigned: Vec<String>,
    /// Devices flipped from `assigned` to `free`
    pub marked_free: Vec<String>,
}

impl InventoryStore {
    /// Delete the assignments of every job in `paid_status` and free the devices
    pub fn free_devices_of_jobs_with_status(&self, paid_status: &str) -> Result<SweepReport> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut report = SweepReport::default();

        {
            let mut stmt =
                tx.prepare("SELECT job_id FROM jobs WHERE status = ?1 ORDER BY job_id")?;
            let rows = stmt.query_map(params![paid_status], |row| row.get::<_, i64>(0))?;
            for row in rows {
                report.jobs.push(row?);
            }
        }

        for job_id in &report.jobs {
            let devices: Vec<String> = {
                let mut stmt = tx.prepare(
                    "SELECT device_id FROM job_devices WHERE job_id = ?1 ORDER BY device_id",
                )?;
                let rows = stmt.query_map(params![job_id], |row| row.get::<_, String>(0))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            };

            report.assignments_removed +=
                tx.execute("DELETE FROM job_devices WHERE job_id = ?1", params![job_id])?;

            for device_id in devices {
                tx.execute(
                    "UPDATE devices SET status = ?1 WHERE device_id = ?2",
                    params![DeviceStatus::Free, device_id],
                )?;
                report.devices_freed.push(device_id);
            }
        }

        tx.commit()?;
        Ok(report)
    }

    /// Align advisory status with the assignment table; `maintenance` is kept
    pub fn reconcile_statuses(&self) -> Result<ReconcileReport> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut report = ReconcileReport::default();

        {
            let mut stmt = tx.prepare(
                r#"SELECT d.device_id FROM devices d
                   WHERE d.status = 'free'
                     AND EXISTS (SELECT 1 FROM job_devices jd WHERE jd.device_id = d.device_id)
                   ORDER BY d.device_id"#,
            )?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            report.marked_assigned = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        }
        {
            let mut stmt = tx.prepare(
                r#"SELECT d.device_id FROM devices d
                   WHERE d.status = 'assigned'
                     AND NOT EXISTS (SELECT 1 FROM job_devices jd WHERE jd.device_id = d.device_id)
                   ORDER BY d.device_id"#,
            )?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            report.marked_free = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        }

        for device_id in &report.marked_assigned {
            tx.execute(
                "UPDATE devices SET status = ?1 WHERE device_id = ?2",
                params![DeviceStatus::Assigned, device_id],
            )?;
        }
        for device_id in &report.marked_free {
            tx.execute(
                "UPDATE devices SET status = ?1 WHERE device_id = ?2",
                params![DeviceStatus::Free, device_id],
            )?;
        }

        tx.commit()?;
        Ok(report)
    }
}
