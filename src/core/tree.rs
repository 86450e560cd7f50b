//! Catalog tree aggregation
//!
//! Folds the joined device records into category → subcategory →
//! sub-subcategory nodes. A device sits at the deepest level its product is
//! classified to; [`Level::Direct`] marks "no deeper level".

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::core::store::{DeviceRecord, DeviceStatus};

/// Name of the trailing bucket in the categorized view
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Device as shown in listings and tree nodes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceView {
    pub device_id: String,
    pub serial_number: Option<String>,
    pub status: DeviceStatus,
    pub product_name: Option<String>,
    pub category: Option<String>,
    pub job_id: Option<i64>,
}

impl From<&DeviceRecord> for DeviceView {
    fn from(record: &DeviceRecord) -> Self {
        Self {
            device_id: record.device_id.clone(),
            serial_number: record.serial_number.clone(),
            status: record.status,
            product_name: record.product_name.clone(),
            category: record.category_name.clone(),
            job_id: record.job_id,
        }
    }
}

/// One classification level below a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level<T> {
    /// The product stops at the level above
    Direct,
    Node(T),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubSubcategoryNode {
    pub subsubcategory_id: i64,
    pub name: String,
    pub devices: Vec<DeviceView>,
    pub device_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubcategoryNode {
    pub subcategory_id: i64,
    pub name: String,
    pub direct_devices: Vec<DeviceView>,
    pub subsubcategories: Vec<SubSubcategoryNode>,
    pub device_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryNode {
    pub category_id: i64,
    pub name: String,
    pub direct_devices: Vec<DeviceView>,
    pub subcategories: Vec<SubcategoryNode>,
    pub device_count: usize,
}

/// Flat group of the categorized view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryGroup {
    pub category: String,
    pub devices: Vec<DeviceView>,
}

type PartitionKey = (i64, Level<i64>, Level<i64>);

/// Where a record lands, or `None` when it cannot be placed in the tree
fn partition_key(record: &DeviceRecord) -> Option<PartitionKey> {
    if record.product_name.is_none() {
        return None;
    }
    let category_id = record.category_id?;
    let (sub, subsub) = match record.subcategory_id {
        None => (Level::Direct, Level::Direct),
        Some(sub_id) => match record.subsubcategory_id {
            None => (Level::Node(sub_id), Level::Direct),
            Some(subsub_id) => (Level::Node(sub_id), Level::Node(subsub_id)),
        },
    };
    Some((category_id, sub, subsub))
}

/// Build the catalog tree
///
/// Devices without a product, or whose product has no category, are left
/// out. Device order inside a node follows the input order.
pub fn build_tree(records: &[DeviceRecord]) -> Vec<CategoryNode> {
    let mut partitions: HashMap<PartitionKey, Vec<DeviceView>> = HashMap::new();
    let mut names: HashMap<(u8, i64), String> = HashMap::new();
    let mut order: Vec<PartitionKey> = Vec::new();

    for record in records {
        let Some(key) = partition_key(record) else {
            debug!(device_id = %record.device_id, "device has no categorized product; left out of tree");
            continue;
        };

        names
            .entry((0, key.0))
            .or_insert_with(|| record.category_name.clone().unwrap_or_default());
        if let Level::Node(sub_id) = key.1 {
            names
                .entry((1, sub_id))
                .or_insert_with(|| record.subcategory_name.clone().unwrap_or_default());
        }
        if let Level::Node(subsub_id) = key.2 {
            names
                .entry((2, subsub_id))
                .or_insert_with(|| record.subsubcategory_name.clone().unwrap_or_default());
        }

        partitions
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(DeviceView::from(record));
    }

    // category -> subcategory level -> subsub level -> devices
    let mut grouped: BTreeMap<i64, BTreeMap<Level<i64>, BTreeMap<Level<i64>, Vec<DeviceView>>>> =
        BTreeMap::new();
    for key in order {
        if let Some(devices) = partitions.remove(&key) {
            grouped
                .entry(key.0)
                .or_default()
                .entry(key.1)
                .or_default()
                .insert(key.2, devices);
        }
    }

    let name_of = |level: u8, id: i64| names.get(&(level, id)).cloned().unwrap_or_default();

    let mut tree: Vec<CategoryNode> = grouped
        .into_iter()
        .map(|(category_id, subs)| {
            let mut direct_devices = Vec::new();
            let mut subcategories = Vec::new();

            for (sub_level, leaves) in subs {
                match sub_level {
                    Level::Direct => {
                        // Without a subcategory there is no sub-subcategory either
                        for (_, devices) in leaves {
                            direct_devices.extend(devices);
                        }
                    }
                    Level::Node(subcategory_id) => {
                        let mut sub_direct = Vec::new();
                        let mut subsubcategories = Vec::new();
                        for (leaf_level, devices) in leaves {
                            match leaf_level {
                                Level::Direct => sub_direct.extend(devices),
                                Level::Node(subsubcategory_id) => {
                                    subsubcategories.push(SubSubcategoryNode {
                                        subsubcategory_id,
                                        name: name_of(2, subsubcategory_id),
                                        device_count: devices.len(),
                                        devices,
                                    })
                                }
                            }
                        }
                        subsubcategories.sort_by(|a, b| {
                            a.name
                                .cmp(&b.name)
                                .then(a.subsubcategory_id.cmp(&b.subsubcategory_id))
                        });
                        let device_count = sub_direct.len()
                            + subsubcategories.iter().map(|n| n.device_count).sum::<usize>();
                        subcategories.push(SubcategoryNode {
                            subcategory_id,
                            name: name_of(1, subcategory_id),
                            direct_devices: sub_direct,
                            subsubcategories,
                            device_count,
                        });
                    }
                }
            }

            subcategories.sort_by(|a, b| {
                a.name
                    .cmp(&b.name)
                    .then(a.subcategory_id.cmp(&b.subcategory_id))
            });
            let device_count = direct_devices.len()
                + subcategories.iter().map(|n| n.device_count).sum::<usize>();
            CategoryNode {
                category_id,
                name: name_of(0, category_id),
                direct_devices,
                subcategories,
                device_count,
            }
        })
        .collect();

    // Byte-wise name order, ID breaks ties
    tree.sort_by(|a, b| a.name.cmp(&b.name).then(a.category_id.cmp(&b.category_id)));
    tree
}

/// Build the flat categorized view
///
/// Unlike [`build_tree`], devices without product or category are kept in a
/// trailing [`UNCATEGORIZED`] group.
pub fn build_categorized(records: &[DeviceRecord]) -> Vec<CategoryGroup> {
    let mut named: BTreeMap<String, Vec<DeviceView>> = BTreeMap::new();
    let mut uncategorized = Vec::new();

    for record in records {
        match (&record.product_name, &record.category_name) {
            (Some(_), Some(category)) => named
                .entry(category.clone())
                .or_default()
                .push(DeviceView::from(record)),
            _ => uncategorized.push(DeviceView::from(record)),
        }
    }

    let mut groups: Vec<CategoryGroup> = named
        .into_iter()
        .map(|(category, devices)| CategoryGroup { category, devices })
        .collect();
    if !uncategorized.is_empty() {
        groups.push(CategoryGroup {
            category: UNCATEGORIZED.to_string(),
            devices: uncategorized,
        });
    }
    groups
}

/// Devices the tree can place: product present and categorized
pub fn placeable_count(records: &[DeviceRecord]) -> usize {
    records.iter().filter(|r| partition_key(r).is_some()).count()
}
