//! Read queries
//!
//! Lookups by key plus the query shapes the services build on: devices
//! without a case row, devices without an assignment row, and the single
//! joined fetch of the device + product + category chain.

use rusqlite::{params, OptionalExtension, Row};

use super::{
    Assignment, Case, Device, DeviceRecord, DeviceRef, InventoryStore, Job, Product,
};
use crate::core::error::{InventoryError, Result};

/// Column list shared by every `DeviceRecord` query
const RECORD_SELECT: &str = r#"
    SELECT d.device_id, d.serial_number, d.status, d.product_id,
           p.name, p.price_per_day,
           c.category_id, c.name,
           sc.subcategory_id, sc.name,
           ssc.subsubcategory_id, ssc.name,
           jd.job_id
    FROM devices d
    LEFT JOIN products p ON p.product_id = d.product_id
    LEFT JOIN categories c ON c.category_id = p.category_id
    LEFT JOIN subcategories sc ON sc.subcategory_id = p.subcategory_id
    LEFT JOIN subsubcategories ssc ON ssc.subsubcategory_id = p.subsubcategory_id
    LEFT JOIN job_devices jd ON jd.device_id = d.device_id
"#;

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<DeviceRecord> {
    Ok(DeviceRecord {
        device_id: row.get(0)?,
        serial_number: row.get(1)?,
        status: row.get(2)?,
        product_id: row.get(3)?,
        product_name: row.get(4)?,
        price_per_day: row.get(5)?,
        category_id: row.get(6)?,
        category_name: row.get(7)?,
        subcategory_id: row.get(8)?,
        subcategory_name: row.get(9)?,
        subsubcategory_id: row.get(10)?,
        subsubcategory_name: row.get(11)?,
        job_id: row.get(12)?,
    })
}

fn device_from_row(row: &Row<'_>) -> rusqlite::Result<Device> {
    Ok(Device {
        device_id: row.get(0)?,
        serial_number: row.get(1)?,
        product_id: row.get(2)?,
        status: row.get(3)?,
        notes: row.get(4)?,
        purchase_date: row.get(5)?,
        last_maintenance: row.get(6)?,
    })
}

fn device_ref_from_row(row: &Row<'_>) -> rusqlite::Result<DeviceRef> {
    Ok(DeviceRef {
        device_id: row.get(0)?,
        serial_number: row.get(1)?,
        product_name: row.get(2)?,
    })
}

/// `LIKE` pattern for a free-text search, `None` when there is nothing to match
///
/// `%`, `_` and `\` in the term match literally (paired with `ESCAPE '\'`).
fn search_pattern(search: Option<&str>) -> Option<String> {
    search.map(str::trim).filter(|s| !s.is_empty()).map(|s| {
        let mut escaped = String::with_capacity(s.len() + 2);
        for ch in s.chars() {
            if matches!(ch, '\\' | '%' | '_') {
                escaped.push('\\');
            }
            escaped.push(ch);
        }
        format!("%{}%", escaped)
    })
}

fn sql_int(value: usize, what: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| InventoryError::InvalidInput(format!("{} out of range: {}", what, value)))
}

impl InventoryStore {
    // =====================================================================
    // Lookups
    // =====================================================================

    pub fn get_device(&self, device_id: &str) -> Result<Option<Device>> {
        let conn = self.conn();
        Ok(conn
            .query_row(
                r#"SELECT device_id, serial_number, product_id, status, notes,
                          purchase_date, last_maintenance
                   FROM devices WHERE device_id = ?1"#,
                params![device_id],
                device_from_row,
            )
            .optional()?)
    }

    pub fn find_device_by_serial(&self, serial: &str) -> Result<Option<Device>> {
        let conn = self.conn();
        Ok(conn
            .query_row(
                r#"SELECT device_id, serial_number, product_id, status, notes,
                          purchase_date, last_maintenance
                   FROM devices WHERE serial_number = ?1"#,
                params![serial],
                device_from_row,
            )
            .optional()?)
    }

    pub fn get_job(&self, job_id: i64) -> Result<Option<Job>> {
        let conn = self.conn();
        Ok(conn
            .query_row(
                "SELECT job_id, name, status, start_date, end_date FROM jobs WHERE job_id = ?1",
                params![job_id],
                |row| {
                    Ok(Job {
                        job_id: row.get(0)?,
                        name: row.get(1)?,
                        status: row.get(2)?,
                        start_date: row.get(3)?,
                        end_date: row.get(4)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn get_case(&self, case_id: i64) -> Result<Option<Case>> {
        let conn = self.conn();
        Ok(conn
            .query_row(
                "SELECT case_id, name, description FROM cases WHERE case_id = ?1",
                params![case_id],
                |row| {
                    Ok(Case {
                        case_id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn get_product(&self, product_id: i64) -> Result<Option<Product>> {
        let conn = self.conn();
        Ok(conn
            .query_row(
                r#"SELECT product_id, name, category_id, subcategory_id, subsubcategory_id, price_per_day
                   FROM products WHERE product_id = ?1"#,
                params![product_id],
                |row| {
                    Ok(Product {
                        product_id: row.get(0)?,
                        name: row.get(1)?,
                        category_id: row.get(2)?,
                        subcategory_id: row.get(3)?,
                        subsubcategory_id: row.get(4)?,
                        price_per_day: row.get(5)?,
                    })
                },
            )
            .optional()?)
    }

    // =====================================================================
    // Assignments
    // =====================================================================

    /// The assignment holding `device_id`, whichever job it belongs to
    pub fn find_assignment(&self, device_id: &str) -> Result<Option<Assignment>> {
        let conn = self.conn();
        Ok(conn
            .query_row(
                "SELECT job_id, device_id, custom_price FROM job_devices WHERE device_id = ?1",
                params![device_id],
                |row| {
                    Ok(Assignment {
                        job_id: row.get(0)?,
                        device_id: row.get(1)?,
                        custom_price: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn assignments_for_job(&self, job_id: i64) -> Result<Vec<Assignment>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT job_id, device_id, custom_price FROM job_devices WHERE job_id = ?1 ORDER BY device_id",
        )?;
        let rows = stmt.query_map(params![job_id], |row| {
            Ok(Assignment {
                job_id: row.get(0)?,
                device_id: row.get(1)?,
                custom_price: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Devices with no assignment row
    pub fn devices_without_assignment(&self) -> Result<Vec<DeviceRef>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            r#"SELECT d.device_id, d.serial_number, p.name
               FROM devices d
               LEFT JOIN products p ON p.product_id = d.product_id
               WHERE NOT EXISTS (SELECT 1 FROM job_devices jd WHERE jd.device_id = d.device_id)
               ORDER BY d.device_id"#,
        )?;
        let rows = stmt.query_map([], device_ref_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // =====================================================================
    // Cases
    // =====================================================================

    /// The case holding `device_id`, if any
    pub fn case_of_device(&self, device_id: &str) -> Result<Option<i64>> {
        let conn = self.conn();
        Ok(conn
            .query_row(
                "SELECT case_id FROM case_devices WHERE device_id = ?1",
                params![device_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn case_devices(&self, case_id: i64) -> Result<Vec<DeviceRef>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            r#"SELECT d.device_id, d.serial_number, p.name
               FROM case_devices cd
               JOIN devices d ON d.device_id = cd.device_id
               LEFT JOIN products p ON p.product_id = d.product_id
               WHERE cd.case_id = ?1
               ORDER BY d.device_id"#,
        )?;
        let rows = stmt.query_map(params![case_id], device_ref_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Devices with no case row, or (with `except`) a row in that case only
    pub fn devices_without_case(&self, except: Option<i64>) -> Result<Vec<DeviceRef>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            r#"SELECT d.device_id, d.serial_number, p.name
               FROM devices d
               LEFT JOIN products p ON p.product_id = d.product_id
               WHERE NOT EXISTS (
                   SELECT 1 FROM case_devices cd
                   WHERE cd.device_id = d.device_id
                     AND (?1 IS NULL OR cd.case_id <> ?1)
               )
               ORDER BY d.device_id"#,
        )?;
        let rows = stmt.query_map(params![except], device_ref_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // =====================================================================
    // Joined device records
    // =====================================================================

    /// Every device joined with its catalog chain, in one query
    pub fn device_records(&self) -> Result<Vec<DeviceRecord>> {
        let conn = self.conn();
        let sql = format!(
            "{} ORDER BY c.name, sc.name, ssc.name, d.serial_number, d.device_id",
            RECORD_SELECT
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], record_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// One page of devices matching `search` on ID, serial or product name
    pub fn device_page(
        &self,
        search: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<DeviceRecord>> {
        let conn = self.conn();
        let sql = format!(
            r#"{}
               WHERE (?1 IS NULL
                      OR d.device_id LIKE ?1 ESCAPE '\'
                      OR d.serial_number LIKE ?1 ESCAPE '\'
                      OR p.name LIKE ?1 ESCAPE '\')
               ORDER BY d.device_id
               LIMIT ?2 OFFSET ?3"#,
            RECORD_SELECT
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                search_pattern(search),
                sql_int(limit, "page size")?,
                sql_int(offset, "offset")?
            ],
            record_from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Number of devices matching `search`
    pub fn count_devices(&self, search: Option<&str>) -> Result<u64> {
        let conn = self.conn();
        let n: i64 = conn.query_row(
            r#"SELECT COUNT(*)
               FROM devices d
               LEFT JOIN products p ON p.product_id = d.product_id
               WHERE (?1 IS NULL
                      OR d.device_id LIKE ?1 ESCAPE '\'
                      OR d.serial_number LIKE ?1 ESCAPE '\'
                      OR p.name LIKE ?1 ESCAPE '\')"#,
            params![search_pattern(search)],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_device_lookup_by_id_and_serial() {
        let store = seeded_store();
        add_device(&store, "D1", "SN-001", Some(1));

        let by_id = store.get_device("D1").unwrap().unwrap();
        assert_eq!(by_id.serial_number.as_deref(), Some("SN-001"));

        let by_serial = store.find_device_by_serial("SN-001").unwrap().unwrap();
        assert_eq!(by_serial.device_id, "D1");

        assert!(store.get_device("SN-001").unwrap().is_none());
        assert!(store.find_device_by_serial("D1").unwrap().is_none());
    }

    #[test]
    fn test_devices_without_case_respects_exception() {
        let store = seeded_store();
        add_device(&store, "D1", "S1", Some(1));
        add_device(&store, "D2", "S2", Some(1));
        add_device(&store, "D3", "S3", Some(1));
        store.insert_case_device(1, "D1").unwrap();
        store.insert_case_device(2, "D2").unwrap();

        let free: Vec<_> = store
            .devices_without_case(None)
            .unwrap()
            .into_iter()
            .map(|d| d.device_id)
            .collect();
        assert_eq!(free, vec!["D3"]);

        let for_case_1: Vec<_> = store
            .devices_without_case(Some(1))
            .unwrap()
            .into_iter()
            .map(|d| d.device_id)
            .collect();
        assert_eq!(for_case_1, vec!["D1", "D3"]);
    }

    #[test]
    fn test_devices_without_assignment() {
        let store = seeded_store();
        add_device(&store, "D1", "S1", Some(1));
        add_device(&store, "D2", "S2", Some(1));
        store.insert_assignment(1, "D1", None).unwrap();

        let refs = store.devices_without_assignment().unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].device_id, "D2");
        assert_eq!(refs[0].product_name.as_deref(), Some("Speaker"));
    }

    #[test]
    fn test_device_records_join_the_full_chain() {
        let store = seeded_store();
        add_device(&store, "D1", "S1", Some(3));
        add_device(&store, "D2", "S2", None);
        store.insert_assignment(2, "D1", Some(70.0)).unwrap();

        let records = store.device_records().unwrap();
        assert_eq!(records.len(), 2);

        let d1 = records.iter().find(|r| r.device_id == "D1").unwrap();
        assert_eq!(d1.category_name.as_deref(), Some("Audio"));
        assert_eq!(d1.subcategory_name.as_deref(), Some("Mixers"));
        assert_eq!(d1.subsubcategory_name.as_deref(), Some("Digital"));
        assert_eq!(d1.job_id, Some(2));

        let d2 = records.iter().find(|r| r.device_id == "D2").unwrap();
        assert!(d2.product_name.is_none());
        assert!(d2.category_id.is_none());
    }

    #[test]
    fn test_device_page_search_and_paging() {
        let store = seeded_store();
        for i in 1..=5 {
            add_device(&store, &format!("D{}", i), &format!("SN-{}", i), Some(1));
        }
        add_device(&store, "X1", "OTHER", Some(4));

        assert_eq!(store.count_devices(None).unwrap(), 6);
        assert_eq!(store.count_devices(Some("  ")).unwrap(), 6);
        assert_eq!(store.count_devices(Some("spot")).unwrap(), 1);

        let first = store.device_page(None, 4, 0).unwrap();
        let second = store.device_page(None, 4, 4).unwrap();
        assert_eq!(first.len(), 4);
        assert_eq!(second.len(), 2);
        assert_eq!(first[0].device_id, "D1");
        assert_eq!(second[1].device_id, "X1");

        let hits = store.device_page(Some("SN-3"), 10, 0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].device_id, "D3");
    }

    #[test]
    fn test_search_wildcards_match_literally() {
        let store = seeded_store();
        add_device(&store, "D1", "SNX1", Some(1));
        add_device(&store, "D2", "SN_1", Some(1));
        add_device(&store, "D3", "100%", Some(1));

        let hits = store.device_page(Some("SN_1"), 10, 0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].device_id, "D2");
        assert_eq!(store.count_devices(Some("SN_1")).unwrap(), 1);

        assert_eq!(store.count_devices(Some("%")).unwrap(), 1);
        assert_eq!(store.device_page(Some("%"), 10, 0).unwrap()[0].device_id, "D3");
        assert_eq!(store.count_devices(Some("\\")).unwrap(), 0);
    }

    #[test]
    fn test_device_page_rejects_offset_beyond_sql_range() {
        let store = seeded_store();
        add_device(&store, "D1", "S1", Some(1));

        let err = store.device_page(None, 10, usize::MAX).unwrap_err();
        assert!(matches!(err, InventoryError::InvalidInput(_)));
    }
}
