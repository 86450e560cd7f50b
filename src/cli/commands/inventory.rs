//! `kitroom inventory` command - Browse devices as a list, tree or by category

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::{open_engine, or_dash, truncate_str};
use crate::cli::table::{print_rows, print_serialized, RowSet};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::tree::{CategoryNode, DeviceView};
use crate::core::{InventoryFilter, InventoryItems, InventoryPage, ViewMode};

#[derive(Subcommand, Debug)]
pub enum InventoryCommands {
    /// List devices
    List {
        /// Match device ID, serial number or product name
        #[arg(long, short = 's')]
        search: Option<String>,

        /// Page number (list view only)
        #[arg(long, short = 'p', default_value_t = 1)]
        page: usize,

        /// Shape of the listing
        #[arg(long, value_enum, default_value_t = ViewMode::List)]
        view: ViewMode,
    },
}

pub fn run(cmd: InventoryCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        InventoryCommands::List { search, page, view } => {
            let (_project, _config, engine) = open_engine(global)?;
            let filter = InventoryFilter { search, page, view };
            let result = engine.list_inventory(&filter)?;
            tracing::debug!(stats = ?engine.inventory().cache_stats(), "view cache");
            print_page(&result, global)
        }
    }
}

fn device_row(device: &DeviceView) -> Vec<String> {
    vec![
        device.device_id.clone(),
        or_dash(device.serial_number.as_deref()),
        device.status.to_string(),
        truncate_str(device.product_name.as_deref().unwrap_or("-"), 30),
        or_dash(device.category.as_deref()),
        or_dash(device.job_id),
    ]
}

const DEVICE_HEADERS: &[&str] = &["device_id", "serial", "status", "product", "category", "job"];

fn print_page(result: &InventoryPage, global: &GlobalOpts) -> Result<()> {
    match (&result.items, global.format) {
        (_, OutputFormat::Json | OutputFormat::Yaml) => print_serialized(global.format, result),
        (InventoryItems::List(page), format) => {
            let mut set = RowSet::new(DEVICE_HEADERS);
            for device in &page.devices {
                set.push(device_row(device));
            }
            print_rows(format, &set)?;
            if !global.quiet && matches!(format, OutputFormat::Auto | OutputFormat::Tsv) {
                println!();
                println!(
                    "{} device(s), page {}",
                    style(result.total_count).cyan(),
                    style(result.page).cyan()
                );
            }
            Ok(())
        }
        (InventoryItems::Categorized(groups), format) => {
            let mut headers = vec!["group"];
            headers.extend_from_slice(DEVICE_HEADERS);
            let mut set = RowSet::new(&headers);
            for group in groups {
                for device in &group.devices {
                    let mut row = vec![group.category.clone()];
                    row.extend(device_row(device));
                    set.push(row);
                }
            }
            print_rows(format, &set)?;
            Ok(())
        }
        (InventoryItems::Tree(nodes), OutputFormat::Auto | OutputFormat::Tsv) => {
            print_tree(nodes);
            Ok(())
        }
        (InventoryItems::Tree(nodes), format) => {
            let mut set = RowSet::new(&["device_id", "category", "subcategory", "subsubcategory"]);
            for category in nodes.iter() {
                for d in &category.direct_devices {
                    set.push(vec![d.device_id.clone(), category.name.clone(), "-".into(), "-".into()]);
                }
                for sub in &category.subcategories {
                    for d in &sub.direct_devices {
                        set.push(vec![d.device_id.clone(), category.name.clone(), sub.name.clone(), "-".into()]);
                    }
                    for leaf in &sub.subsubcategories {
                        for d in &leaf.devices {
                            set.push(vec![
                                d.device_id.clone(),
                                category.name.clone(),
                                sub.name.clone(),
                                leaf.name.clone(),
                            ]);
                        }
                    }
                }
            }
            print_rows(format, &set)?;
            Ok(())
        }
    }
}

fn print_tree(nodes: &[CategoryNode]) {
    let device_line = |indent: &str, d: &DeviceView| {
        println!(
            "{}{} {} {}",
            indent,
            style(&d.device_id).cyan(),
            style(d.serial_number.as_deref().unwrap_or("-")).dim(),
            d.status
        );
    };

    for category in nodes {
        println!("{} ({})", style(&category.name).bold(), category.device_count);
        for d in &category.direct_devices {
            device_line("  ", d);
        }
        for sub in &category.subcategories {
            println!("  {} ({})", style(&sub.name).bold(), sub.device_count);
            for d in &sub.direct_devices {
                device_line("    ", d);
            }
            for leaf in &sub.subsubcategories {
                println!("    {} ({})", style(&leaf.name).bold(), leaf.device_count);
                for d in &leaf.devices {
                    device_line("      ", d);
                }
            }
        }
    }
}
