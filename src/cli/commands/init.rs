//! `kitroom init` command - Initialize a new kitroom project

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::core::project::{Project, ProjectError};
use crate::core::{Config, InventoryStore};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    match Project::init(&path) {
        Ok(project) => {
            let config = Config::load_for(Some(&project));
            let db_path = config
                .database_path(Some(&project))
                .unwrap_or_else(|| project.database_path());
            let store = InventoryStore::open(&db_path)?;

            println!(
                "{} Initialized kitroom project at {}",
                style("✓").green(),
                style(project.root().display()).cyan()
            );
            println!("  Database: {}", style(db_path.display()).dim());
            println!("  Schema:   v{}", store.schema_version()?);
            println!();
            println!("Next steps:");
            println!(
                "  {} Load categories, products, jobs and cases",
                style("kitroom import catalog catalog.yaml").yellow()
            );
            println!(
                "  {} Load devices",
                style("kitroom import devices devices.csv").yellow()
            );
            Ok(())
        }
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} kitroom project already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}
