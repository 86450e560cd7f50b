//! `kitroom store` command - Inspect the inventory database

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::open_engine;
use crate::cli::table::print_serialized;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::DeviceStatus;

#[derive(Subcommand, Debug)]
pub enum StoreCommands {
    /// Show row counts and database size
    Status,

    /// Execute a read-only SQL query
    Query {
        /// SQL query to execute
        sql: String,
    },
}

pub fn run(cmd: StoreCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        StoreCommands::Status => run_status(global),
        StoreCommands::Query { sql } => run_query(&sql, global.format, global),
    }
}

fn run_status(global: &GlobalOpts) -> Result<()> {
    let (_project, _config, engine) = open_engine(global)?;
    let stats = engine.store().statistics()?;

    if matches!(global.format, OutputFormat::Json | OutputFormat::Yaml) {
        return print_serialized(global.format, &stats);
    }

    println!("{}", style("Store Status").bold());
    println!("{}", style("─".repeat(40)).dim());
    if let Some(path) = engine.store().path() {
        println!("  Location:        {}", path.display());
    }
    println!("  Schema version:  {}", engine.store().schema_version()?);
    println!("  Devices:         {}", style(stats.devices).cyan());
    println!("  Products:        {}", style(stats.products).cyan());
    println!("  Categories:      {}", style(stats.categories).cyan());
    println!("  Jobs:            {}", style(stats.jobs).cyan());
    println!("  Cases:           {}", style(stats.cases).cyan());
    println!("  Assignments:     {}", style(stats.assignments).cyan());
    println!("  Case members:    {}", style(stats.case_memberships).cyan());
    println!(
        "  Database size:   {} KB",
        style(stats.db_size_bytes / 1024).cyan()
    );

    if !stats.by_status.is_empty() {
        println!();
        println!("  {}", style("By Status:").bold());
        for status in DeviceStatus::all() {
            let count = stats.by_status.get(status.as_str()).copied().unwrap_or(0);
            println!("    {:<12} {}", status.as_str(), count);
        }
    }

    Ok(())
}

fn run_query(sql: &str, format: OutputFormat, global: &GlobalOpts) -> Result<()> {
    let (_project, _config, engine) = open_engine(global)?;

    let columns = engine.store().query_columns(sql)?;
    let rows = engine.store().query_raw(sql)?;

    match format {
        OutputFormat::Json | OutputFormat::Yaml => {
            let objects: Vec<serde_json::Value> = rows
                .iter()
                .map(|row| {
                    let mut obj = serde_json::Map::new();
                    for (i, col) in columns.iter().enumerate() {
                        if let Some(val) = row.get(i) {
                            obj.insert(col.clone(), serde_json::Value::String(val.clone()));
                        }
                    }
                    serde_json::Value::Object(obj)
                })
                .collect();
            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&objects).into_diagnostic()?);
            } else {
                print!("{}", serde_yml::to_string(&objects).into_diagnostic()?);
            }
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            writer.write_record(&columns).into_diagnostic()?;
            for row in &rows {
                writer.write_record(row).into_diagnostic()?;
            }
            writer.flush().into_diagnostic()?;
        }
        _ => {
            println!("{}", columns.join("\t"));
            for row in rows {
                println!("{}", row.join("\t"));
            }
        }
    }

    Ok(())
}
