//! Shared helper functions for CLI commands

use miette::Result;

use crate::cli::GlobalOpts;
use crate::core::{Config, InventoryEngine, Project};

/// Locate the project from `--project` or the current directory
pub fn discover_project(global: &GlobalOpts) -> Result<Project> {
    let found = match &global.project {
        Some(path) => Project::discover_from(path),
        None => Project::discover(),
    };
    found.map_err(|e| miette::miette!("{}", e))
}

/// Discover the project, load layered config and open the engine
pub fn open_engine(global: &GlobalOpts) -> Result<(Project, Config, InventoryEngine)> {
    let project = discover_project(global)?;
    let config = Config::load_for(Some(&project));
    let db_path = config
        .database_path(Some(&project))
        .unwrap_or_else(|| project.database_path());
    tracing::debug!(db = %db_path.display(), "opening inventory");
    let engine = InventoryEngine::open(&db_path, &config)?;
    Ok((project, config, engine))
}

/// Render an optional value for table cells
pub fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Truncate a string to max_len, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
