//! CLI command implementations

pub mod case;
pub mod completions;
pub mod device;
pub mod import;
pub mod init;
pub mod inventory;
pub mod job;
pub mod store;
pub mod sweep;
