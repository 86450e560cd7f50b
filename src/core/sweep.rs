//! Completed-job sweep
//!
//! Frees the devices of every job that has reached the paid status. Each
//! run is one store transaction. [`SweepScheduler`] repeats the run on a
//! dedicated thread until its handle is stopped.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info};

use crate::core::error::Result;
use crate::core::store::{InventoryStore, ReconcileReport, SweepReport};

/// Outcome of one sweep run
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SweepOutcome {
    pub freed: SweepReport,
    /// Present when reconciliation ran
    pub reconciled: Option<ReconcileReport>,
}

pub struct Sweeper {
    store: Arc<InventoryStore>,
    paid_status: String,
    reconcile: bool,
}

impl Sweeper {
    pub fn new(store: Arc<InventoryStore>, paid_status: impl Into<String>, reconcile: bool) -> Self {
        Self {
            store,
            paid_status: paid_status.into(),
            reconcile,
        }
    }

    pub fn paid_status(&self) -> &str {
        &self.paid_status
    }

    /// Delete the assignments of paid jobs and mark their devices free
    pub fn free_completed_job_devices(&self) -> Result<SweepReport> {
        let report = self
            .store
            .free_devices_of_jobs_with_status(&self.paid_status)
            .inspect_err(|e| error!(paid_status = %self.paid_status, error = %e, "sweep rolled back"))?;
        if !report.jobs.is_empty() {
            info!(
                jobs = report.jobs.len(),
                assignments = report.assignments_removed,
                "freed devices of completed jobs"
            );
        }
        Ok(report)
    }

    /// One full pass: free completed jobs, then reconcile status if enabled
    pub fn run_once(&self) -> Result<SweepOutcome> {
        let freed = self.free_completed_job_devices()?;
        let reconciled = if self.reconcile {
            let report = self.store.reconcile_statuses()?;
            info!(
                marked_assigned = report.marked_assigned.len(),
                marked_free = report.marked_free.len(),
                "device status reconciled"
            );
            Some(report)
        } else {
            None
        };
        Ok(SweepOutcome { freed, reconciled })
    }
}

/// Runs a [`Sweeper`] at a fixed interval on its own thread
pub struct SweepScheduler;

impl SweepScheduler {
    /// Start the loop; the first run happens immediately
    pub fn spawn(sweeper: Arc<Sweeper>, interval: Duration) -> SweepHandle {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread = thread::spawn(move || {
            let mut runs = 0u64;
            loop {
                match sweeper.run_once() {
                    Ok(_) => runs += 1,
                    // Failed runs are rolled back; try again next tick
                    Err(e) => error!(error = %e, "sweep run failed"),
                }
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            runs
        });
        SweepHandle {
            stop: Some(stop_tx),
            thread: Some(thread),
        }
    }
}

/// Handle to a running sweep loop; dropping it stops the loop
pub struct SweepHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<u64>>,
}

impl SweepHandle {
    /// Signal the loop to stop after the current run
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }

    /// Stop and wait; returns the number of successful runs
    pub fn join(mut self) -> u64 {
        self.stop();
        self.thread
            .take()
            .and_then(|t| t.join().ok())
            .unwrap_or_default()
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::InventoryError;
    use crate::core::store::test_support::*;
    use crate::core::store::DeviceStatus;

    fn paid_job_with_two_devices() -> Arc<InventoryStore> {
        let store = Arc::new(seeded_store());
        add_device(&store, "D1", "SN-1", Some(1));
        add_device(&store, "D2", "SN-2", Some(2));
        add_device(&store, "D3", "SN-3", Some(3));
        store.insert_assignment(1, "D1", None).unwrap();
        store.insert_assignment(1, "D2", Some(10.0)).unwrap();
        store.insert_assignment(2, "D3", None).unwrap();
        for id in ["D1", "D2", "D3"] {
            store.set_device_status(id, DeviceStatus::Assigned).unwrap();
        }
        store.set_job_status(1, "paid").unwrap();
        store
    }

    #[test]
    fn test_paid_job_devices_are_freed() {
        let store = paid_job_with_two_devices();
        let sweeper = Sweeper::new(Arc::clone(&store), "paid", false);

        let report = sweeper.free_completed_job_devices().unwrap();
        assert_eq!(report.jobs, vec![1]);
        assert_eq!(report.assignments_removed, 2);

        assert!(store.assignments_for_job(1).unwrap().is_empty());
        for id in ["D1", "D2"] {
            assert_eq!(store.get_device(id).unwrap().unwrap().status, DeviceStatus::Free);
        }
        // Unpaid job untouched
        assert_eq!(store.find_assignment("D3").unwrap().unwrap().job_id, 2);
        assert_eq!(store.get_device("D3").unwrap().unwrap().status, DeviceStatus::Assigned);
    }

    #[test]
    fn test_failure_mid_sweep_rolls_everything_back() {
        let store = paid_job_with_two_devices();
        store
            .conn()
            .execute_batch(
                r#"CREATE TRIGGER fail_d2 BEFORE UPDATE OF status ON devices
                   WHEN NEW.device_id = 'D2'
                   BEGIN SELECT RAISE(ABORT, 'disk on fire'); END;"#,
            )
            .unwrap();

        let sweeper = Sweeper::new(Arc::clone(&store), "paid", false);
        let err = sweeper.free_completed_job_devices().unwrap_err();
        assert!(matches!(err, InventoryError::Persistence(_)));

        assert_eq!(store.assignments_for_job(1).unwrap().len(), 2);
        assert_eq!(store.get_device("D1").unwrap().unwrap().status, DeviceStatus::Assigned);
    }

    #[test]
    fn test_custom_paid_status() {
        let store = paid_job_with_two_devices();
        let sweeper = Sweeper::new(Arc::clone(&store), "settled", false);
        assert!(sweeper.free_completed_job_devices().unwrap().jobs.is_empty());
        assert_eq!(store.assignments_for_job(1).unwrap().len(), 2);
    }

    #[test]
    fn test_run_once_reconciles_when_enabled() {
        let store = paid_job_with_two_devices();
        add_device(&store, "D4", "SN-4", Some(4));
        store.insert_assignment(2, "D4", None).unwrap();

        let outcome = Sweeper::new(Arc::clone(&store), "paid", true).run_once().unwrap();
        let reconciled = outcome.reconciled.unwrap();
        assert_eq!(reconciled.marked_assigned, vec!["D4".to_string()]);
        assert!(reconciled.marked_free.is_empty());

        let plain = Sweeper::new(store, "paid", false).run_once().unwrap();
        assert!(plain.reconciled.is_none());
    }

    #[test]
    fn test_scheduler_runs_until_stopped() {
        let store = paid_job_with_two_devices();
        let sweeper = Arc::new(Sweeper::new(Arc::clone(&store), "paid", false));
        let handle = SweepScheduler::spawn(sweeper, Duration::from_millis(10));

        // The first run happens on spawn
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !store.assignments_for_job(1).unwrap().is_empty() {
            assert!(std::time::Instant::now() < deadline, "sweep never ran");
            thread::sleep(Duration::from_millis(5));
        }

        let runs = handle.join();
        assert!(runs >= 1);
    }
}
