//! Core module - inventory engine, store and configuration

pub mod assignment;
pub mod cases;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod project;
pub mod store;
pub mod sweep;
pub mod tree;
pub mod view_cache;

pub use assignment::{AssignmentCoordinator, BatchItem, ItemOutcome};
pub use cases::CaseGroupingService;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use engine::InventoryEngine;
pub use error::{InventoryError, RecordKind, Result};
pub use inventory::{InventoryFilter, InventoryItems, InventoryPage, InventoryService, ViewMode};
pub use project::{Project, ProjectError};
pub use store::{DeviceStatus, InventoryStore};
pub use sweep::{SweepHandle, SweepOutcome, SweepScheduler, Sweeper};
pub use tree::{build_categorized, build_tree, CategoryGroup, CategoryNode, DeviceView};
pub use view_cache::{CacheStats, InventoryViewCache};
