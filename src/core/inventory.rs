//! Inventory listing
//!
//! Pages of devices, the catalog tree, and the categorized view. The first
//! unfiltered list page and the tree are served from [`InventoryViewCache`];
//! searches, later pages and the categorized view always hit the store.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{InventoryError, Result};
use crate::core::store::InventoryStore;
use crate::core::tree::{self, CategoryGroup, CategoryNode, DeviceView};
use crate::core::view_cache::{CacheStats, InventoryViewCache};

/// How the listing is shaped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    List,
    Tree,
    Categorized,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::List => write!(f, "list"),
            ViewMode::Tree => write!(f, "tree"),
            ViewMode::Categorized => write!(f, "categorized"),
        }
    }
}

impl FromStr for ViewMode {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "list" => Ok(ViewMode::List),
            "tree" => Ok(ViewMode::Tree),
            "categorized" => Ok(ViewMode::Categorized),
            other => Err(InventoryError::InvalidInput(format!("unknown view: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InventoryFilter {
    pub search: Option<String>,
    /// 1-based; 0 is treated as 1
    pub page: usize,
    pub view: ViewMode,
}

impl InventoryFilter {
    fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn page(&self) -> usize {
        self.page.max(1)
    }

    /// Only the first unfiltered list page goes through the list slot
    fn uses_list_slot(&self) -> bool {
        self.view == ViewMode::List && self.search_term().is_none() && self.page() == 1
    }
}

/// Payload cached by the list slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DevicePage {
    pub devices: Vec<DeviceView>,
    pub total_count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", content = "items", rename_all = "lowercase")]
pub enum InventoryItems {
    List(Arc<DevicePage>),
    Tree(Arc<Vec<CategoryNode>>),
    Categorized(Vec<CategoryGroup>),
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryPage {
    #[serde(flatten)]
    pub items: InventoryItems,
    pub total_count: u64,
    pub page: usize,
}

pub struct InventoryService {
    store: Arc<InventoryStore>,
    cache: Arc<InventoryViewCache>,
    page_size: usize,
}

impl InventoryService {
    pub fn new(store: Arc<InventoryStore>, cache: Arc<InventoryViewCache>, page_size: usize) -> Self {
        Self {
            store,
            cache,
            page_size: page_size.max(1),
        }
    }

    pub fn list_inventory(&self, filter: &InventoryFilter) -> Result<InventoryPage> {
        let page = filter.page();
        match filter.view {
            ViewMode::List => {
                let devices = if filter.uses_list_slot() {
                    self.cache.list.get_or_rebuild(|| self.load_page(None, 1))?
                } else {
                    debug!(search = ?filter.search_term(), page, "list request bypasses cache");
                    Arc::new(self.load_page(filter.search_term(), page)?)
                };
                Ok(InventoryPage {
                    total_count: devices.total_count,
                    items: InventoryItems::List(devices),
                    page,
                })
            }
            ViewMode::Tree => {
                let nodes = self
                    .cache
                    .tree
                    .get_or_rebuild(|| Ok(tree::build_tree(&self.store.device_records()?)))?;
                let total_count = nodes.iter().map(|n| n.device_count as u64).sum();
                Ok(InventoryPage {
                    items: InventoryItems::Tree(nodes),
                    total_count,
                    page: 1,
                })
            }
            ViewMode::Categorized => {
                let groups = tree::build_categorized(&self.store.device_records()?);
                let total_count = groups.iter().map(|g| g.devices.len() as u64).sum();
                Ok(InventoryPage {
                    items: InventoryItems::Categorized(groups),
                    total_count,
                    page: 1,
                })
            }
        }
    }

    fn load_page(&self, search: Option<&str>, page: usize) -> Result<DevicePage> {
        let offset = page
            .checked_sub(1)
            .and_then(|p| p.checked_mul(self.page_size))
            .ok_or_else(|| InventoryError::InvalidInput(format!("page out of range: {}", page)))?;
        let records = self.store.device_page(search, self.page_size, offset)?;
        Ok(DevicePage {
            devices: records.iter().map(DeviceView::from).collect(),
            total_count: self.store.count_devices(search)?,
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
