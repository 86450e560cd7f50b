//! Project discovery and structure
//!
//! A kitroom project is any directory holding a `.kitroom/` folder with the
//! inventory database and an optional `config.yaml`.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the marker directory
pub const PROJECT_DIR: &str = ".kitroom";

/// Represents a kitroom project
#[derive(Debug)]
pub struct Project {
    /// Root directory of the project (parent of .kitroom/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create the `.kitroom/` directory and a commented default config
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        let dir = root.join(PROJECT_DIR);
        if dir.exists() {
            return Err(ProjectError::AlreadyExists(root.clone()));
        }

        std::fs::create_dir_all(&dir).map_err(|e| ProjectError::IoError(e.to_string()))?;
        std::fs::write(dir.join("config.yaml"), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# kitroom project configuration

# SQLite database, relative to this project's root
# database: .kitroom/inventory.db

# Seconds the first unfiltered inventory page is served from cache
# list_ttl_secs: 30

# Seconds the category tree is served from cache
# tree_ttl_secs: 120

# Devices per inventory page
# page_size: 25

# Job status that releases a job's devices on sweep
# paid_status: paid

# Seconds between runs of `kitroom sweep --watch`
# sweep_interval_secs: 300

# Align device status with assignments on every sweep
# reconcile_on_sweep: false
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .kitroom directory
    pub fn kitroom_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.kitroom_dir().join("config.yaml")
    }

    /// Default database location
    pub fn database_path(&self) -> PathBuf {
        self.kitroom_dir().join("inventory.db")
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a kitroom project (searched from {searched_from:?}). Run 'kitroom init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("kitroom project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}
