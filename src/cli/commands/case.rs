//! `kitroom case` command - Case membership

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::{open_engine, or_dash};
use crate::cli::table::{print_list, RowSet};
use crate::cli::GlobalOpts;
use crate::core::store::DeviceRef;

#[derive(Subcommand, Debug)]
pub enum CaseCommands {
    /// Put a device into a case
    Add {
        /// Case ID
        case: i64,

        /// Device ID
        device: String,
    },

    /// Take a device out of a case
    Remove {
        /// Case ID
        case: i64,

        /// Device ID
        device: String,
    },

    /// List the devices in a case
    Members {
        /// Case ID
        case: i64,
    },

    /// List devices that can go into a case
    Available {
        /// Case ID
        case: i64,
    },
}

pub fn run(cmd: CaseCommands, global: &GlobalOpts) -> Result<()> {
    let (_project, _config, engine) = open_engine(global)?;
    match cmd {
        CaseCommands::Add { case, device } => {
            engine.cases().add_device_to_case(case, &device)?;
            if !global.quiet {
                println!(
                    "{} Added {} to case {}",
                    style("✓").green(),
                    style(&device).cyan(),
                    style(case).yellow()
                );
            }
            Ok(())
        }
        CaseCommands::Remove { case, device } => {
            let removed = engine.cases().remove_device_from_case(case, &device)?;
            if !global.quiet {
                if removed {
                    println!(
                        "{} Removed {} from case {}",
                        style("✓").green(),
                        style(&device).cyan(),
                        style(case).yellow()
                    );
                } else {
                    println!(
                        "{} {} was not in case {}",
                        style("!").yellow(),
                        style(&device).cyan(),
                        style(case).yellow()
                    );
                }
            }
            Ok(())
        }
        CaseCommands::Members { case } => print_refs(&engine.case_membership(case)?, global),
        CaseCommands::Available { case } => print_refs(&engine.available_for_case(case)?, global),
    }
}

fn print_refs(devices: &[DeviceRef], global: &GlobalOpts) -> Result<()> {
    let mut set = RowSet::new(&["device_id", "serial", "product"]);
    for d in devices {
        set.push(vec![
            d.device_id.clone(),
            or_dash(d.serial_number.as_deref()),
            or_dash(d.product_name.as_deref()),
        ]);
    }
    print_list(global.format, &set, devices)
}
