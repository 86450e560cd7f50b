//! Case grouping
//!
//! A case is a shipping container. A device sits in at most one case; the
//! unique index on `case_devices(device_id)` enforces that when two callers
//! race past the membership check.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::assignment::{batch_counts, AssignmentCoordinator, BatchItem};
use crate::core::error::{InventoryError, RecordKind, Result};
use crate::core::store::{Claim, DeviceRef, InventoryStore};

pub struct CaseGroupingService {
    store: Arc<InventoryStore>,
    coordinator: Arc<AssignmentCoordinator>,
}

impl CaseGroupingService {
    pub fn new(store: Arc<InventoryStore>, coordinator: Arc<AssignmentCoordinator>) -> Self {
        Self { store, coordinator }
    }

    /// Put a device into a case
    pub fn add_device_to_case(&self, case_id: i64, device_id: &str) -> Result<()> {
        self.require_case(case_id)?;
        if self.store.get_device(device_id)?.is_none() {
            return Err(InventoryError::not_found(RecordKind::Device, device_id));
        }

        if let Some(holder) = self.store.case_of_device(device_id)? {
            debug!(device_id, holder, "device already in a case");
            return Err(InventoryError::AlreadyInCase {
                device_id: device_id.to_string(),
                case_id: holder,
            });
        }

        self.claim(case_id, device_id)
    }

    /// Insert the membership row; the unique index settles races past the check
    fn claim(&self, case_id: i64, device_id: &str) -> Result<()> {
        match self.store.insert_case_device(case_id, device_id)? {
            Claim::Inserted => {
                info!(case_id, device_id, "device added to case");
                Ok(())
            }
            Claim::HeldBy(holder) => {
                warn!(case_id, device_id, holder, "case membership lost race to concurrent writer");
                Err(InventoryError::AlreadyInCase {
                    device_id: device_id.to_string(),
                    case_id: holder,
                })
            }
        }
    }

    /// Take a device out of a case; returns whether a row was removed
    pub fn remove_device_from_case(&self, case_id: i64, device_id: &str) -> Result<bool> {
        let removed = self.store.delete_case_device(case_id, device_id)?;
        if removed {
            info!(case_id, device_id, "device removed from case");
        }
        Ok(removed)
    }

    pub fn case_membership(&self, case_id: i64) -> Result<Vec<DeviceRef>> {
        self.require_case(case_id)?;
        self.store.case_devices(case_id)
    }

    /// Devices that may be put into `case_id`: uncased ones plus its own members
    pub fn available_for_case(&self, case_id: i64) -> Result<Vec<DeviceRef>> {
        self.require_case(case_id)?;
        self.store.devices_without_case(Some(case_id))
    }

    /// Assign every member of a case to a job, reporting per device
    pub fn scan_case_into_job(&self, job_id: i64, case_id: i64) -> Result<Vec<BatchItem>> {
        let members = self.case_membership(case_id)?;
        let refs: Vec<&str> = members.iter().map(|m| m.device_id.as_str()).collect();

        let items = self.coordinator.bulk_assign(job_id, &refs, None);
        let (ok, failed) = batch_counts(&items);
        info!(job_id, case_id, ok, failed, "case scanned into job");
        Ok(items)
    }

    fn require_case(&self, case_id: i64) -> Result<()> {
        match self.store.get_case(case_id)? {
            Some(_) => Ok(()),
            None => Err(InventoryError::not_found(RecordKind::Case, case_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::assignment::ItemOutcome;
    use crate::core::store::test_support::*;
    use std::sync::Barrier;
    use std::thread;

    fn service() -> (Arc<InventoryStore>, Arc<AssignmentCoordinator>, CaseGroupingService) {
        let store = Arc::new(seeded_store());
        add_device(&store, "D1", "SN-1", Some(1));
        add_device(&store, "D2", "SN-2", Some(2));
        add_device(&store, "D3", "SN-3", Some(4));
        let coordinator = Arc::new(AssignmentCoordinator::new(Arc::clone(&store)));
        let cases = CaseGroupingService::new(Arc::clone(&store), Arc::clone(&coordinator));
        (store, coordinator, cases)
    }

    #[test]
    fn test_device_is_in_at_most_one_case() {
        let (store, _coordinator, cases) = service();
        cases.add_device_to_case(1, "D1").unwrap();

        let err = cases.add_device_to_case(2, "D1").unwrap_err();
        assert!(matches!(err, InventoryError::AlreadyInCase { case_id: 1, .. }));

        let err = cases.add_device_to_case(1, "D1").unwrap_err();
        assert!(matches!(err, InventoryError::AlreadyInCase { case_id: 1, .. }));

        assert_eq!(store.case_of_device("D1").unwrap(), Some(1));
    }

    #[test]
    fn test_backstop_maps_to_already_in_case() {
        let (store, _coordinator, cases) = service();
        // Another writer commits between the membership check and the insert
        store.insert_case_device(2, "D1").unwrap();

        let err = cases.claim(1, "D1").unwrap_err();
        assert!(matches!(err, InventoryError::AlreadyInCase { case_id: 2, .. }));
        assert_eq!(store.case_of_device("D1").unwrap(), Some(2));
    }

    #[test]
    fn test_concurrent_add_has_exactly_one_winner() {
        for _ in 0..20 {
            let (store, _coordinator, cases) = service();
            let cases = Arc::new(cases);
            let barrier = Arc::new(Barrier::new(2));

            let handles: Vec<_> = [1i64, 2]
                .into_iter()
                .map(|case| {
                    let cases = Arc::clone(&cases);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        cases.add_device_to_case(case, "D1")
                    })
                })
                .collect();

            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
            let holder = store.case_of_device("D1").unwrap().unwrap();
            assert!(results.iter().any(|r| matches!(
                r,
                Err(InventoryError::AlreadyInCase { case_id, .. }) if *case_id == holder
            )));
        }
    }

    #[test]
    fn test_add_to_missing_case_or_device() {
        let (_store, _coordinator, cases) = service();
        assert!(matches!(
            cases.add_device_to_case(9, "D1").unwrap_err(),
            InventoryError::NotFound { kind: RecordKind::Case, .. }
        ));
        assert!(matches!(
            cases.add_device_to_case(1, "D9").unwrap_err(),
            InventoryError::NotFound { kind: RecordKind::Device, .. }
        ));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (_store, _coordinator, cases) = service();
        cases.add_device_to_case(1, "D1").unwrap();
        assert!(cases.remove_device_from_case(1, "D1").unwrap());
        assert!(!cases.remove_device_from_case(1, "D1").unwrap());
        cases.add_device_to_case(2, "D1").unwrap();
    }

    #[test]
    fn test_available_includes_own_members() {
        let (_store, _coordinator, cases) = service();
        cases.add_device_to_case(1, "D1").unwrap();
        cases.add_device_to_case(2, "D2").unwrap();

        let ids = |refs: Vec<DeviceRef>| -> Vec<String> {
            refs.into_iter().map(|r| r.device_id).collect()
        };
        assert_eq!(ids(cases.available_for_case(1).unwrap()), vec!["D1", "D3"]);
        assert_eq!(ids(cases.available_for_case(2).unwrap()), vec!["D2", "D3"]);
        assert_eq!(ids(cases.case_membership(1).unwrap()), vec!["D1"]);
    }

    #[test]
    fn test_scan_case_reports_conflicts_per_device() {
        let (store, coordinator, cases) = service();
        cases.add_device_to_case(1, "D1").unwrap();
        cases.add_device_to_case(1, "D2").unwrap();
        coordinator.assign(2, "D1", None).unwrap();

        let items = cases.scan_case_into_job(1, 1).unwrap();
        assert_eq!(items.len(), 2);

        let d1 = items.iter().find(|i| i.reference == "D1").unwrap();
        assert!(!d1.ok);
        assert_eq!(d1.outcome, ItemOutcome::Conflict { job_id: 2 });

        let d2 = items.iter().find(|i| i.reference == "D2").unwrap();
        assert!(d2.ok);
        assert_eq!(store.find_assignment("D2").unwrap().unwrap().job_id, 1);
        assert_eq!(store.find_assignment("D1").unwrap().unwrap().job_id, 2);
    }

    #[test]
    fn test_scan_missing_case_is_not_found() {
        let (_store, _coordinator, cases) = service();
        assert!(matches!(
            cases.scan_case_into_job(1, 77).unwrap_err(),
            InventoryError::NotFound { kind: RecordKind::Case, .. }
        ));
    }

    #[test]
    fn test_scan_empty_case_is_empty_batch() {
        let (_store, _coordinator, cases) = service();
        assert!(cases.scan_case_into_job(1, 2).unwrap().is_empty());
    }
}
