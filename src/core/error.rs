//! Error taxonomy for the inventory engine

use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

/// The kind of record a lookup failed to find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Device,
    Job,
    Case,
    Assignment,
    Product,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Device => write!(f, "device"),
            RecordKind::Job => write!(f, "job"),
            RecordKind::Case => write!(f, "case"),
            RecordKind::Assignment => write!(f, "assignment"),
            RecordKind::Product => write!(f, "product"),
        }
    }
}

/// Errors surfaced by the inventory engine
#[derive(Debug, Error, Diagnostic)]
pub enum InventoryError {
    #[error("{kind} not found: {id}")]
    #[diagnostic(code(kitroom::not_found))]
    NotFound { kind: RecordKind, id: String },

    #[error("device {device_id} is already assigned to job {job_id}")]
    #[diagnostic(
        code(kitroom::conflict),
        help("remove the device from its current job before assigning it again")
    )]
    Conflict { device_id: String, job_id: i64 },

    #[error("device {device_id} is already in case {case_id}")]
    #[diagnostic(
        code(kitroom::already_in_case),
        help("remove the device from its current case first")
    )]
    AlreadyInCase { device_id: String, case_id: i64 },

    #[error("storage error: {0}")]
    #[diagnostic(code(kitroom::persistence))]
    Persistence(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(kitroom::io))]
    Io(#[from] std::io::Error),

    #[error("invalid input: {0}")]
    #[diagnostic(code(kitroom::invalid_input))]
    InvalidInput(String),
}

impl InventoryError {
    pub fn not_found(kind: RecordKind, id: impl ToString) -> Self {
        InventoryError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, InventoryError>;
