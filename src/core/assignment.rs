//! Assignment coordinator
//!
//! Commits devices to jobs. A device is held by at most one job at a time:
//! the coordinator checks for an existing assignment first, and the unique
//! index on `job_devices(device_id)` catches the callers that race past that
//! check. Both paths report the same [`InventoryError::Conflict`].
//!
//! Device status is advisory and is not touched by `assign`/`remove`.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::error::{InventoryError, RecordKind, Result};
use crate::core::store::{Assignment, Claim, Device, DeviceRef, DeviceStatus, InventoryStore};

/// Per-item outcome of a batch operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemOutcome {
    Assigned,
    Conflict { job_id: i64 },
    NotFound,
    Failed,
}

/// One element of a partial-success batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItem {
    /// The reference as the caller supplied it (device ID or serial number)
    pub reference: String,
    /// Resolved device ID, when the reference matched a device
    pub device_id: Option<String>,
    pub ok: bool,
    pub outcome: ItemOutcome,
    pub message: String,
}

impl BatchItem {
    fn assigned(reference: &str, device_id: &str, job_id: i64) -> Self {
        Self {
            reference: reference.to_string(),
            device_id: Some(device_id.to_string()),
            ok: true,
            outcome: ItemOutcome::Assigned,
            message: format!("assigned to job {}", job_id),
        }
    }

    fn failed(reference: &str, device_id: Option<&str>, err: &InventoryError) -> Self {
        let outcome = match err {
            InventoryError::Conflict { job_id, .. } => ItemOutcome::Conflict { job_id: *job_id },
            InventoryError::NotFound { .. } => ItemOutcome::NotFound,
            _ => ItemOutcome::Failed,
        };
        Self {
            reference: reference.to_string(),
            device_id: device_id.map(String::from),
            ok: false,
            outcome,
            message: err.to_string(),
        }
    }
}

/// Summary counts over a batch
pub fn batch_counts(items: &[BatchItem]) -> (usize, usize) {
    let ok = items.iter().filter(|i| i.ok).count();
    (ok, items.len() - ok)
}

/// A price override only counts when strictly positive
pub fn effective_override(price: Option<f64>) -> Option<f64> {
    price.filter(|p| *p > 0.0)
}

/// Enforces one job per device
pub struct AssignmentCoordinator {
    store: Arc<InventoryStore>,
}

impl AssignmentCoordinator {
    pub fn new(store: Arc<InventoryStore>) -> Self {
        Self { store }
    }

    /// Assign a device to a job
    ///
    /// Fails with `Conflict` when any job, including `job_id` itself, already
    /// holds the device.
    pub fn assign(
        &self,
        job_id: i64,
        device_id: &str,
        price_override: Option<f64>,
    ) -> Result<Assignment> {
        self.require_job(job_id)?;
        if self.store.get_device(device_id)?.is_none() {
            return Err(InventoryError::not_found(RecordKind::Device, device_id));
        }

        if let Some(existing) = self.store.find_assignment(device_id)? {
            debug!(device_id, holder = existing.job_id, "device already assigned");
            return Err(InventoryError::Conflict {
                device_id: device_id.to_string(),
                job_id: existing.job_id,
            });
        }

        self.claim(job_id, device_id, effective_override(price_override))
    }

    fn claim(&self, job_id: i64, device_id: &str, custom_price: Option<f64>) -> Result<Assignment> {
        match self.store.insert_assignment(job_id, device_id, custom_price) {
            Ok(Claim::Inserted) => {
                info!(job_id, device_id, ?custom_price, "device assigned");
                Ok(Assignment {
                    job_id,
                    device_id: device_id.to_string(),
                    custom_price,
                })
            }
            Ok(Claim::HeldBy(holder)) => {
                warn!(job_id, device_id, holder, "assignment lost race to concurrent writer");
                Err(InventoryError::Conflict {
                    device_id: device_id.to_string(),
                    job_id: holder,
                })
            }
            Err(e) => {
                tracing::error!(job_id, device_id, error = %e, "failed to insert assignment");
                Err(e)
            }
        }
    }

    /// Remove a device from a job; `NotFound` if that pairing does not exist
    pub fn remove(&self, job_id: i64, device_id: &str) -> Result<()> {
        if self.store.delete_assignment(job_id, device_id)? {
            info!(job_id, device_id, "device removed from job");
            Ok(())
        } else {
            Err(InventoryError::not_found(
                RecordKind::Assignment,
                format!("job {} / device {}", job_id, device_id),
            ))
        }
    }

    /// Resolve a reference against device ID first, then serial number
    pub fn resolve_device(&self, reference: &str) -> Result<Option<Device>> {
        if let Some(device) = self.store.get_device(reference)? {
            return Ok(Some(device));
        }
        self.store.find_device_by_serial(reference)
    }

    /// Assign every reference independently and report per item
    pub fn bulk_assign<S: AsRef<str>>(
        &self,
        job_id: i64,
        references: &[S],
        price_override: Option<f64>,
    ) -> Vec<BatchItem> {
        let job_missing = match self.require_job(job_id) {
            Ok(()) => None,
            Err(e) => Some(e),
        };

        let items: Vec<BatchItem> = references
            .iter()
            .map(|r| {
                let reference = r.as_ref().trim();
                if let Some(ref err) = job_missing {
                    return BatchItem::failed(reference, None, err);
                }
                let device = match self.resolve_device(reference) {
                    Ok(Some(device)) => device,
                    Ok(None) => {
                        let err = InventoryError::not_found(RecordKind::Device, reference);
                        return BatchItem::failed(reference, None, &err);
                    }
                    Err(e) => return BatchItem::failed(reference, None, &e),
                };
                self.assign_item(job_id, reference, &device.device_id, price_override)
            })
            .collect();

        let (ok, failed) = batch_counts(&items);
        info!(job_id, ok, failed, "bulk assignment finished");
        items
    }

    /// Assign one resolved device, folding the error into a batch item
    pub(crate) fn assign_item(
        &self,
        job_id: i64,
        reference: &str,
        device_id: &str,
        price_override: Option<f64>,
    ) -> BatchItem {
        match self.assign(job_id, device_id, price_override) {
            Ok(_) => BatchItem::assigned(reference, device_id, job_id),
            Err(e) => BatchItem::failed(reference, Some(device_id), &e),
        }
    }

    /// Caller-driven status transition
    pub fn set_status(&self, device_id: &str, status: DeviceStatus) -> Result<()> {
        if self.store.set_device_status(device_id, status)? {
            info!(device_id, %status, "device status changed");
            Ok(())
        } else {
            Err(InventoryError::not_found(RecordKind::Device, device_id))
        }
    }

    pub fn assignments_for_job(&self, job_id: i64) -> Result<Vec<Assignment>> {
        self.require_job(job_id)?;
        self.store.assignments_for_job(job_id)
    }

    /// Devices no job currently holds
    pub fn unassigned_devices(&self) -> Result<Vec<DeviceRef>> {
        self.store.devices_without_assignment()
    }

    fn require_job(&self, job_id: i64) -> Result<()> {
        match self.store.get_job(job_id)? {
            Some(_) => Ok(()),
            None => Err(InventoryError::not_found(RecordKind::Job, job_id)),
        }
    }
}
