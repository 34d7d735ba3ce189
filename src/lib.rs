//! Site Export - multi-platform export orchestrator
//!
//! This crate drives an external script-based build tool to package units for
//! one or more platform configurations, staging a directory tree or archives
//! and optionally attaching repository metadata to the output.

pub mod build;
pub mod cli;
pub mod config;
pub mod export;
pub mod logging;
pub mod types;
pub mod workspace;

pub use config::ExportConfig;
pub use export::{ExportError, ExportOperationOrchestrator, ExportResult};
pub use types::*;
