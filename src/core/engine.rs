//! Engine wiring
//!
//! [`InventoryEngine`] owns one store and the services built on it, and is
//! what the CLI talks to.

use std::path::Path;
use std::sync::Arc;

use crate::core::assignment::{AssignmentCoordinator, BatchItem};
use crate::core::cases::CaseGroupingService;
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::inventory::{InventoryFilter, InventoryPage, InventoryService};
use crate::core::store::{Assignment, DeviceRef, InventoryStore};
use crate::core::sweep::Sweeper;
use crate::core::view_cache::InventoryViewCache;

pub struct InventoryEngine {
    store: Arc<InventoryStore>,
    coordinator: Arc<AssignmentCoordinator>,
    cases: CaseGroupingService,
    inventory: InventoryService,
    sweeper: Arc<Sweeper>,
}

impl InventoryEngine {
    /// Open (creating if needed) the database at `path`
    pub fn open(path: &Path, config: &Config) -> Result<Self> {
        let store = InventoryStore::open(path)?;
        Ok(Self::with_store(Arc::new(store), config, Arc::new(SystemClock)))
    }

    pub fn with_store(store: Arc<InventoryStore>, config: &Config, clock: Arc<dyn Clock>) -> Self {
        let coordinator = Arc::new(AssignmentCoordinator::new(Arc::clone(&store)));
        let cases = CaseGroupingService::new(Arc::clone(&store), Arc::clone(&coordinator));
        let cache = Arc::new(InventoryViewCache::new(
            config.list_ttl(),
            config.tree_ttl(),
            clock,
        ));
        let inventory = InventoryService::new(Arc::clone(&store), cache, config.page_size());
        let sweeper = Arc::new(Sweeper::new(
            Arc::clone(&store),
            config.paid_status(),
            config.reconcile_on_sweep(),
        ));

        Self {
            store,
            coordinator,
            cases,
            inventory,
            sweeper,
        }
    }

    pub fn store(&self) -> &InventoryStore {
        &self.store
    }

    pub fn shared_store(&self) -> Arc<InventoryStore> {
        Arc::clone(&self.store)
    }

    pub fn coordinator(&self) -> &AssignmentCoordinator {
        &self.coordinator
    }

    pub fn cases(&self) -> &CaseGroupingService {
        &self.cases
    }

    pub fn inventory(&self) -> &InventoryService {
        &self.inventory
    }

    pub fn sweeper(&self) -> Arc<Sweeper> {
        Arc::clone(&self.sweeper)
    }

    pub fn list_inventory(&self, filter: &InventoryFilter) -> Result<InventoryPage> {
        self.inventory.list_inventory(filter)
    }

    pub fn assign_device(
        &self,
        job_id: i64,
        device_id: &str,
        price_override: Option<f64>,
    ) -> Result<Assignment> {
        self.coordinator.assign(job_id, device_id, price_override)
    }

    pub fn remove_device(&self, job_id: i64, device_id: &str) -> Result<()> {
        self.coordinator.remove(job_id, device_id)
    }

    pub fn bulk_assign<S: AsRef<str>>(
        &self,
        job_id: i64,
        references: &[S],
        price_override: Option<f64>,
    ) -> Vec<BatchItem> {
        self.coordinator.bulk_assign(job_id, references, price_override)
    }

    pub fn scan_case_into_job(&self, job_id: i64, case_id: i64) -> Result<Vec<BatchItem>> {
        self.cases.scan_case_into_job(job_id, case_id)
    }

    pub fn case_membership(&self, case_id: i64) -> Result<Vec<DeviceRef>> {
        self.cases.case_membership(case_id)
    }

    pub fn available_for_case(&self, case_id: i64) -> Result<Vec<DeviceRef>> {
        self.cases.available_for_case(case_id)
    }
}
