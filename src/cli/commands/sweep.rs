//! `kitroom sweep` command - Free the devices of paid jobs

use console::style;
use miette::{IntoDiagnostic, Result};
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::helpers::open_engine;
use crate::cli::table::print_serialized;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{SweepOutcome, SweepScheduler, Sweeper};

#[derive(clap::Args, Debug)]
pub struct SweepArgs {
    /// Also align device status with assignments
    #[arg(long)]
    pub reconcile: bool,

    /// Keep sweeping at a fixed interval until stdin closes
    #[arg(long)]
    pub watch: bool,

    /// Seconds between runs in watch mode (default: sweep_interval_secs)
    #[arg(long, requires = "watch")]
    pub interval: Option<u64>,
}

pub fn run(args: SweepArgs, global: &GlobalOpts) -> Result<()> {
    let (_project, config, engine) = open_engine(global)?;
    let sweeper = if args.reconcile && !config.reconcile_on_sweep() {
        Arc::new(Sweeper::new(
            engine.shared_store(),
            config.paid_status(),
            true,
        ))
    } else {
        engine.sweeper()
    };

    if args.watch {
        let interval = args
            .interval
            .map(Duration::from_secs)
            .unwrap_or_else(|| config.sweep_interval());
        if !global.quiet {
            eprintln!(
                "{} Sweeping jobs with status {} every {}s; close stdin (Ctrl-D) to stop",
                style("→").blue(),
                style(sweeper.paid_status()).cyan(),
                interval.as_secs()
            );
        }

        let handle = SweepScheduler::spawn(sweeper, interval);
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            line.into_diagnostic()?;
        }
        let runs = handle.join();
        if !global.quiet {
            eprintln!("{} Sweep stopped after {} run(s)", style("✓").green(), runs);
        }
        return Ok(());
    }

    let outcome = sweeper.run_once()?;
    print_outcome(&outcome, global)
}

fn print_outcome(outcome: &SweepOutcome, global: &GlobalOpts) -> Result<()> {
    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => print_serialized(global.format, outcome),
        _ => {
            if global.quiet {
                return Ok(());
            }
            let freed = &outcome.freed;
            if freed.jobs.is_empty() {
                println!("{} No paid jobs to sweep", style("✓").green());
            } else {
                println!(
                    "{} Swept {} job(s), removed {} assignment(s)",
                    style("✓").green(),
                    style(freed.jobs.len()).cyan(),
                    style(freed.assignments_removed).cyan()
                );
                for device in &freed.devices_freed {
                    println!("  freed {}", style(device).cyan());
                }
            }
            if let Some(reconciled) = &outcome.reconciled {
                println!(
                    "{} Reconciled status: {} marked assigned, {} marked free",
                    style("✓").green(),
                    style(reconciled.marked_assigned.len()).cyan(),
                    style(reconciled.marked_free.len()).cyan()
                );
            }
            Ok(())
        }
    }
}
