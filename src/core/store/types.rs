//! Store type definitions
//!
//! Persisted rows, the joined device record, and store statistics.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use clap::ValueEnum;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::error::InventoryError;

// =========================================================================
// Device status
// =========================================================================

/// Advisory device status
///
/// Not derived from the assignment table; see `reconcile_statuses`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    #[default]
    Free,
    Assigned,
    Maintenance,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Free => "free",
            DeviceStatus::Assigned => "assigned",
            DeviceStatus::Maintenance => "maintenance",
        }
    }

    pub fn all() -> &'static [DeviceStatus] {
        &[
            DeviceStatus::Free,
            DeviceStatus::Assigned,
            DeviceStatus::Maintenance,
        ]
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown device status: {0}")]
pub struct ParseStatusError(pub String);

impl From<ParseStatusError> for InventoryError {
    fn from(err: ParseStatusError) -> Self {
        InventoryError::InvalidInput(err.to_string())
    }
}

impl FromStr for DeviceStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(DeviceStatus::Free),
            "assigned" => Ok(DeviceStatus::Assigned),
            "maintenance" => Ok(DeviceStatus::Maintenance),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

impl ToSql for DeviceStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for DeviceStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: ParseStatusError| FromSqlError::Other(Box::new(e)))
    }
}

// =========================================================================
// Catalog
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub category_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subcategory {
    pub subcategory_id: i64,
    pub category_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubSubcategory {
    pub subsubcategory_id: i64,
    pub subcategory_id: i64,
    pub name: String,
}

/// Catalog entry a device points at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: i64,
    pub name: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub subcategory_id: Option<i64>,
    #[serde(default)]
    pub subsubcategory_id: Option<i64>,
    #[serde(default)]
    pub price_per_day: f64,
}

// =========================================================================
// Inventory
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub device_id: String,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub status: DeviceStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub purchase_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_maintenance: Option<NaiveDate>,
}

impl Device {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            serial_number: None,
            product_id: None,
            status: DeviceStatus::Free,
            notes: None,
            purchase_date: None,
            last_maintenance: None,
        }
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }

    pub fn with_product(mut self, product_id: i64) -> Self {
        self.product_id = Some(product_id);
        self
    }
}

fn default_job_status() -> String {
    "open".to_string()
}

/// A rental engagement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: i64,
    pub name: String,
    #[serde(default = "default_job_status")]
    pub status: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl Job {
    pub fn new(job_id: i64, name: impl Into<String>) -> Self {
        Self {
            job_id,
            name: name.into(),
            status: default_job_status(),
            start_date: None,
            end_date: None,
        }
    }
}

/// Device-to-job link; `custom_price` is `None` when the catalog price applies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub job_id: i64,
    pub device_id: String,
    pub custom_price: Option<f64>,
}

/// A shipping container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub case_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Short device identity used by case listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRef {
    pub device_id: String,
    pub serial_number: Option<String>,
    pub product_name: Option<String>,
}

/// One row of the device + product + category chain join
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceRecord {
    pub device_id: String,
    pub serial_number: Option<String>,
    pub status: DeviceStatus,
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub price_per_day: Option<f64>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub subcategory_id: Option<i64>,
    pub subcategory_name: Option<String>,
    pub subsubcategory_id: Option<i64>,
    pub subsubcategory_name: Option<String>,
    /// Job currently holding the device, if any
    pub job_id: Option<i64>,
}

/// Outcome of an insert guarded by a unique index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    Inserted,
    /// The unique index rejected the row; carries the holding job or case
    HeldBy(i64),
}

/// Store statistics
#[derive(Debug, Default, Serialize)]
pub struct StoreStats {
    pub devices: usize,
    pub products: usize,
    pub categories: usize,
    pub jobs: usize,
    pub cases: usize,
    pub assignments: usize,
    pub case_memberships: usize,
    pub by_status: HashMap<String, usize>,
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("FREE".parse::<DeviceStatus>().unwrap(), DeviceStatus::Free);
        assert_eq!(
            " maintenance ".parse::<DeviceStatus>().unwrap(),
            DeviceStatus::Maintenance
        );
        assert!("broken".parse::<DeviceStatus>().is_err());
    }

    #[test]
    fn test_status_yaml_names() {
        let yaml = serde_yml::to_string(&DeviceStatus::Assigned).unwrap();
        assert_eq!(yaml.trim(), "assigned");
    }
}
