//! Configuration management with layered hierarchy
//!
//! Built-in defaults, then the global user config, then the project's
//! `.kitroom/config.yaml`, then `KITROOM_*` environment variables. Later
//! layers win key by key.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::Project;

pub const DEFAULT_LIST_TTL_SECS: u64 = 30;
pub const DEFAULT_TREE_TTL_SECS: u64 = 120;
pub const DEFAULT_PAGE_SIZE: usize = 25;
pub const DEFAULT_PAID_STATUS: &str = "paid";
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// kitroom configuration with layered hierarchy
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database path; relative paths resolve against the project root
    pub database: Option<PathBuf>,

    /// TTL of the first-page list cache
    pub list_ttl_secs: Option<u64>,

    /// TTL of the category tree cache
    pub tree_ttl_secs: Option<u64>,

    /// Devices per inventory page
    pub page_size: Option<usize>,

    /// Job status that marks a job as complete
    pub paid_status: Option<String>,

    /// Seconds between watch-mode sweeps
    pub sweep_interval_secs: Option<u64>,

    /// Reconcile device status after each sweep
    pub reconcile_on_sweep: Option<bool>,
}

impl Config {
    /// Load configuration from all sources for `project`, merging in priority order
    pub fn load_for(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (accessor fallbacks)

        // 2. Global user config (~/.config/kitroom/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.kitroom/config.yaml)
        if let Some(project) = project {
            if let Some(mut project_config) = Self::read_file(&project.config_path()) {
                if let Some(db) = project_config.database.take() {
                    project_config.database = Some(project.root().join(db));
                }
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        config.apply_env(|key| std::env::var(key).ok());

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        let has_settings = contents
            .lines()
            .map(str::trim)
            .any(|l| !l.is_empty() && !l.starts_with('#'));
        if !has_settings {
            return Some(Config::default());
        }
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "kitroom")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Apply `KITROOM_*` overrides read through `lookup`
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(db) = lookup("KITROOM_DB") {
            self.database = Some(PathBuf::from(db));
        }
        if let Some(ttl) = parse_env(&lookup, "KITROOM_LIST_TTL_SECS") {
            self.list_ttl_secs = Some(ttl);
        }
        if let Some(ttl) = parse_env(&lookup, "KITROOM_TREE_TTL_SECS") {
            self.tree_ttl_secs = Some(ttl);
        }
        if let Some(status) = lookup("KITROOM_PAID_STATUS") {
            self.paid_status = Some(status);
        }
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.database.is_some() {
            self.database = other.database;
        }
        if other.list_ttl_secs.is_some() {
            self.list_ttl_secs = other.list_ttl_secs;
        }
        if other.tree_ttl_secs.is_some() {
            self.tree_ttl_secs = other.tree_ttl_secs;
        }
        if other.page_size.is_some() {
            self.page_size = other.page_size;
        }
        if other.paid_status.is_some() {
            self.paid_status = other.paid_status;
        }
        if other.sweep_interval_secs.is_some() {
            self.sweep_interval_secs = other.sweep_interval_secs;
        }
        if other.reconcile_on_sweep.is_some() {
            self.reconcile_on_sweep = other.reconcile_on_sweep;
        }
    }

    /// Database path, falling back to the project's default location
    pub fn database_path(&self, project: Option<&Project>) -> Option<PathBuf> {
        self.database
            .clone()
            .or_else(|| project.map(Project::database_path))
    }

    pub fn list_ttl(&self) -> Duration {
        Duration::from_secs(self.list_ttl_secs.unwrap_or(DEFAULT_LIST_TTL_SECS))
    }

    pub fn tree_ttl(&self) -> Duration {
        Duration::from_secs(self.tree_ttl_secs.unwrap_or(DEFAULT_TREE_TTL_SECS))
    }

    pub fn page_size(&self) -> usize {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1)
    }

    pub fn paid_status(&self) -> String {
        self.paid_status
            .clone()
            .unwrap_or_else(|| DEFAULT_PAID_STATUS.to_string())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(
            self.sweep_interval_secs
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS)
                .max(1),
        )
    }

    pub fn reconcile_on_sweep(&self) -> bool {
        self.reconcile_on_sweep.unwrap_or(false)
    }
}

fn parse_env<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}
