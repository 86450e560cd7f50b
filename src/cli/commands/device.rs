//! `kitroom device` command - Status changes and availability

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::{open_engine, or_dash};
use crate::cli::table::{print_list, RowSet};
use crate::cli::GlobalOpts;
use crate::core::DeviceStatus;

#[derive(Subcommand, Debug)]
pub enum DeviceCommands {
    /// Set a device's status
    Status {
        /// Device ID
        device: String,

        /// New status
        #[arg(value_enum)]
        status: DeviceStatus,
    },

    /// List devices no job currently holds
    Unassigned,
}

pub fn run(cmd: DeviceCommands, global: &GlobalOpts) -> Result<()> {
    let (_project, _config, engine) = open_engine(global)?;
    match cmd {
        DeviceCommands::Status { device, status } => {
            engine.coordinator().set_status(&device, status)?;
            if !global.quiet {
                println!(
                    "{} {} is now {}",
                    style("✓").green(),
                    style(&device).cyan(),
                    style(status).yellow()
                );
            }
            Ok(())
        }
        DeviceCommands::Unassigned => {
            let devices = engine.coordinator().unassigned_devices()?;
            let mut set = RowSet::new(&["device_id", "serial", "product"]);
            for d in &devices {
                set.push(vec![
                    d.device_id.clone(),
                    or_dash(d.serial_number.as_deref()),
                    or_dash(d.product_name.as_deref()),
                ]);
            }
            print_list(global.format, &set, &devices)
        }
    }
}
