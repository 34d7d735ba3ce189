use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Cannot express {path} as a file URL: {reason}")]
    PathConversion { path: PathBuf, reason: String },

    #[error("Build of {unit} failed for target {target}: {reason}")]
    BuildInvocation {
        target: String,
        unit: String,
        reason: String,
        log_location: Option<PathBuf>,
    },

    #[error("Targets {first} and {second} would both write to {path}")]
    DuplicateTargetPath {
        first: String,
        second: String,
        path: PathBuf,
    },

    #[error("Build of {unit} for target {target} timed out after {timeout_secs}s")]
    Timeout {
        target: String,
        unit: String,
        timeout_secs: u64,
    },

    #[error("Invalid export request: {0}")]
    InvalidRequest(String),

    #[error("Failed to read manifest for unit {unit}: {reason}")]
    Manifest { unit: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ExportError {
    /// Errors that stop a run before any build is started
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            ExportError::DuplicateTargetPath { .. }
                | ExportError::InvalidRequest(_)
                | ExportError::Manifest { .. }
                | ExportError::Configuration(_)
        )
    }

    pub fn log_location(&self) -> Option<&PathBuf> {
        match self {
            ExportError::BuildInvocation { log_location, .. } => log_location.as_ref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
