//! `kitroom import` command - Load the catalog and devices from files
//!
//! The catalog is a YAML document with `categories`, `subcategories`,
//! `subsubcategories`, `products`, `jobs` and `cases` lists. Devices come
//! from CSV with a header row; column order does not matter.

use clap::Subcommand;
use console::style;
use csv::ReaderBuilder;
use miette::{IntoDiagnostic, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::cli::helpers::open_engine;
use crate::cli::GlobalOpts;
use crate::core::store::{
    Case, Category, Device, DeviceStatus, Job, Product, SubSubcategory, Subcategory,
};
use crate::core::{InventoryError, InventoryStore, RecordKind};

#[derive(Subcommand, Debug)]
pub enum ImportCommands {
    /// Load categories, products, jobs and cases from a YAML file
    Catalog {
        /// YAML file to import
        file: PathBuf,
    },

    /// Load devices from a CSV file
    ///
    /// Columns: device_id, serial_number, product_id, status, notes
    Devices {
        /// CSV file to import
        file: PathBuf,

        /// Validate CSV without writing to the database
        #[arg(long)]
        dry_run: bool,

        /// Continue importing after errors (default: stop on first error)
        #[arg(long)]
        skip_errors: bool,
    },
}

/// Catalog document
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CatalogFile {
    pub categories: Vec<Category>,
    pub subcategories: Vec<Subcategory>,
    pub subsubcategories: Vec<SubSubcategory>,
    pub products: Vec<Product>,
    pub jobs: Vec<Job>,
    pub cases: Vec<Case>,
}

/// Import statistics
#[derive(Debug, Default, PartialEq)]
pub struct ImportStats {
    pub rows_processed: usize,
    pub imported: usize,
    pub errors: usize,
}

pub fn run(cmd: ImportCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ImportCommands::Catalog { file } => run_catalog(&file, global),
        ImportCommands::Devices {
            file,
            dry_run,
            skip_errors,
        } => run_devices(&file, dry_run, skip_errors, global),
    }
}

fn require_file(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(miette::miette!("File not found: {}", path.display()));
    }
    Ok(())
}

fn run_catalog(file: &Path, global: &GlobalOpts) -> Result<()> {
    require_file(file)?;
    let contents = fs::read_to_string(file).into_diagnostic()?;
    let catalog: CatalogFile = serde_yml::from_str(&contents)
        .map_err(|e| miette::miette!("Invalid catalog {}: {}", file.display(), e))?;

    let (_project, _config, engine) = open_engine(global)?;
    import_catalog(engine.store(), &catalog)?;

    if !global.quiet {
        println!(
            "{} Imported catalog from {}",
            style("✓").green(),
            style(file.display()).yellow()
        );
        println!("  Categories:        {}", style(catalog.categories.len()).cyan());
        println!("  Subcategories:     {}", style(catalog.subcategories.len()).cyan());
        println!("  Sub-subcategories: {}", style(catalog.subsubcategories.len()).cyan());
        println!("  Products:          {}", style(catalog.products.len()).cyan());
        println!("  Jobs:              {}", style(catalog.jobs.len()).cyan());
        println!("  Cases:             {}", style(catalog.cases.len()).cyan());
    }
    Ok(())
}

/// Upsert every catalog row, parents before children
pub fn import_catalog(store: &InventoryStore, catalog: &CatalogFile) -> Result<(), InventoryError> {
    for category in &catalog.categories {
        store.upsert_category(category)?;
    }
    for sub in &catalog.subcategories {
        store.upsert_subcategory(sub)?;
    }
    for subsub in &catalog.subsubcategories {
        store.upsert_subsubcategory(subsub)?;
    }
    for product in &catalog.products {
        store.upsert_product(product)?;
    }
    for job in &catalog.jobs {
        store.upsert_job(job)?;
    }
    for case in &catalog.cases {
        store.upsert_case(case)?;
    }
    tracing::info!(
        products = catalog.products.len(),
        jobs = catalog.jobs.len(),
        cases = catalog.cases.len(),
        "catalog imported"
    );
    Ok(())
}

fn run_devices(file: &Path, dry_run: bool, skip_errors: bool, global: &GlobalOpts) -> Result<()> {
    require_file(file)?;
    let (_project, _config, engine) = open_engine(global)?;

    if !global.quiet {
        println!(
            "{} Importing devices from {}{}",
            style("→").blue(),
            style(file.display()).yellow(),
            if dry_run {
                style(" (dry run)").dim().to_string()
            } else {
                String::new()
            }
        );
    }

    let stats = import_devices(engine.store(), file, dry_run, skip_errors)?;

    if !global.quiet {
        println!();
        println!("{}", style("─".repeat(40)).dim());
        println!("{}", style("Import Summary").bold());
        println!("{}", style("─".repeat(40)).dim());
        println!("  Rows processed: {}", style(stats.rows_processed).cyan());
        println!("  Devices:        {}", style(stats.imported).green());
        if stats.errors > 0 {
            println!("  Errors:         {}", style(stats.errors).red());
        }
    }

    if stats.errors > 0 && !skip_errors {
        return Err(miette::miette!("Import stopped after {} error(s)", stats.errors));
    }
    Ok(())
}

/// Read the CSV and upsert each device row
pub fn import_devices(
    store: &InventoryStore,
    file: &Path,
    dry_run: bool,
    skip_errors: bool,
) -> Result<ImportStats> {
    let reader = BufReader::new(File::open(file).into_diagnostic()?);
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().into_diagnostic()?.clone();
    let header_map = build_header_map(&headers);
    if !header_map.contains_key("device_id") {
        return Err(miette::miette!("CSV is missing the device_id column"));
    }

    let mut stats = ImportStats::default();
    for (row_idx, result) in rdr.records().enumerate() {
        let row_num = row_idx + 2; // header is line 1
        stats.rows_processed += 1;

        let outcome = result
            .map_err(|e| InventoryError::InvalidInput(e.to_string()))
            .and_then(|record| device_from_record(&record, &header_map))
            .and_then(|device| {
                if let Some(product_id) = device.product_id {
                    if store.get_product(product_id)?.is_none() {
                        return Err(InventoryError::not_found(RecordKind::Product, product_id));
                    }
                }
                if dry_run {
                    Ok(())
                } else {
                    store.upsert_device(&device)
                }
            });

        match outcome {
            Ok(()) => stats.imported += 1,
            Err(e) => {
                stats.errors += 1;
                eprintln!("{} Row {}: {}", style("✗").red(), row_num, e);
                if !skip_errors {
                    break;
                }
            }
        }
    }

    tracing::info!(
        rows = stats.rows_processed,
        imported = stats.imported,
        errors = stats.errors,
        dry_run,
        "device import finished"
    );
    Ok(stats)
}

fn device_from_record(
    record: &csv::StringRecord,
    header_map: &HashMap<String, usize>,
) -> Result<Device, InventoryError> {
    let device_id = get_field(record, header_map, "device_id")
        .ok_or_else(|| InventoryError::InvalidInput("device_id is required".to_string()))?;

    let mut device = Device::new(device_id);
    device.serial_number = get_field(record, header_map, "serial_number");
    device.notes = get_field(record, header_map, "notes");
    if let Some(product) = get_field(record, header_map, "product_id") {
        let id = product
            .parse::<i64>()
            .map_err(|_| InventoryError::InvalidInput(format!("invalid product_id: {}", product)))?;
        device.product_id = Some(id);
    }
    if let Some(status) = get_field(record, header_map, "status") {
        device.status = status.parse::<DeviceStatus>()?;
    }
    Ok(device)
}

/// Build a map of lowercased header names to column indices
fn build_header_map(headers: &csv::StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_lowercase().trim().to_string(), i))
        .collect()
}

/// Get a non-empty field value from a CSV record
fn get_field(
    record: &csv::StringRecord,
    header_map: &HashMap<String, usize>,
    field: &str,
) -> Option<String> {
    header_map
        .get(field)
        .and_then(|&idx| record.get(idx))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
