//! `kitroom job` command - Assign devices to jobs

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::{open_engine, or_dash};
use crate::cli::table::{print_list, RowSet};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::assignment::batch_counts;
use crate::core::{BatchItem, InventoryError, ItemOutcome, RecordKind};

#[derive(Subcommand, Debug)]
pub enum JobCommands {
    /// Assign one device to a job
    Assign {
        /// Job ID
        job: i64,

        /// Device ID
        device: String,

        /// Daily price override (ignored unless positive)
        #[arg(long)]
        price: Option<f64>,
    },

    /// Remove a device from a job
    Remove {
        /// Job ID
        job: i64,

        /// Device ID
        device: String,
    },

    /// Assign several devices by ID or serial number
    Bulk {
        /// Job ID
        job: i64,

        /// Device IDs or serial numbers
        #[arg(required = true)]
        refs: Vec<String>,

        /// Daily price override applied to every device
        #[arg(long)]
        price: Option<f64>,
    },

    /// Assign every device in a case to a job
    ScanCase {
        /// Job ID
        job: i64,

        /// Case ID
        case: i64,
    },

    /// List a job's devices
    Devices {
        /// Job ID
        job: i64,
    },

    /// Change a job's status (e.g. to the paid status picked up by sweep)
    SetStatus {
        /// Job ID
        job: i64,

        /// New status
        status: String,
    },
}

pub fn run(cmd: JobCommands, global: &GlobalOpts) -> Result<()> {
    let (_project, _config, engine) = open_engine(global)?;
    match cmd {
        JobCommands::Assign { job, device, price } => {
            let assignment = engine.assign_device(job, &device, price)?;
            if !global.quiet {
                let price = assignment
                    .custom_price
                    .map(|p| format!(" at {:.2}/day", p))
                    .unwrap_or_default();
                println!(
                    "{} Assigned {} to job {}{}",
                    style("✓").green(),
                    style(&device).cyan(),
                    style(job).yellow(),
                    price
                );
            }
            Ok(())
        }
        JobCommands::Remove { job, device } => {
            engine.remove_device(job, &device)?;
            if !global.quiet {
                println!(
                    "{} Removed {} from job {}",
                    style("✓").green(),
                    style(&device).cyan(),
                    style(job).yellow()
                );
            }
            Ok(())
        }
        JobCommands::Bulk { job, refs, price } => {
            let items = engine.bulk_assign(job, &refs, price);
            print_batch(&items, global)
        }
        JobCommands::ScanCase { job, case } => {
            let items = engine.scan_case_into_job(job, case)?;
            print_batch(&items, global)
        }
        JobCommands::Devices { job } => {
            let assignments = engine.coordinator().assignments_for_job(job)?;
            let mut set = RowSet::new(&["device_id", "job", "custom_price"]);
            for a in &assignments {
                set.push(vec![
                    a.device_id.clone(),
                    a.job_id.to_string(),
                    or_dash(a.custom_price.map(|p| format!("{:.2}", p))),
                ]);
            }
            print_list(global.format, &set, &assignments)
        }
        JobCommands::SetStatus { job, status } => {
            if !engine.store().set_job_status(job, &status)? {
                return Err(InventoryError::not_found(RecordKind::Job, job).into());
            }
            if !global.quiet {
                println!(
                    "{} Job {} is now {}",
                    style("✓").green(),
                    style(job).yellow(),
                    style(&status).cyan()
                );
            }
            Ok(())
        }
    }
}

fn outcome_label(outcome: &ItemOutcome) -> String {
    match outcome {
        ItemOutcome::Assigned => "assigned".to_string(),
        ItemOutcome::Conflict { job_id } => format!("conflict:{}", job_id),
        ItemOutcome::NotFound => "not_found".to_string(),
        ItemOutcome::Failed => "failed".to_string(),
    }
}

/// Per-item report of a batch; item failures never fail the command
fn print_batch(items: &[BatchItem], global: &GlobalOpts) -> Result<()> {
    let mut set = RowSet::new(&["reference", "device_id", "outcome", "message"]);
    for item in items {
        set.push(vec![
            item.reference.clone(),
            or_dash(item.device_id.as_deref()),
            outcome_label(&item.outcome),
            item.message.clone(),
        ]);
    }
    print_list(global.format, &set, items)?;

    if !global.quiet && matches!(global.format, OutputFormat::Auto | OutputFormat::Tsv) {
        let (ok, failed) = batch_counts(items);
        println!();
        println!(
            "{} assigned, {} failed",
            style(ok).green(),
            if failed > 0 {
                style(failed).red()
            } else {
                style(failed).dim()
            }
        );
    }
    Ok(())
}
