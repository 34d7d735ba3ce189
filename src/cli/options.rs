use crate::config::ExportConfig;
use crate::export::Result;
use crate::types::{ExportRequest, PlatformTuple, UnitRef};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Command-line interface for site-export
#[derive(Parser, Debug)]
#[command(name = "site-export")]
#[command(about = "Export units for one or more platforms through a script-based build")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct SiteExportCli {
    /// Unit directory to export (repeatable)
    #[arg(short, long = "unit", required = true)]
    pub units: Vec<PathBuf>,

    /// Target platform as os,ws,arch (repeatable; defaults to the host)
    #[arg(short, long = "platform")]
    pub platforms: Vec<PlatformTuple>,

    /// Export destination directory
    #[arg(short, long)]
    pub destination: PathBuf,

    /// Produce archives instead of a staged directory
    #[arg(long)]
    pub archive: bool,

    /// Archive file name stem
    #[arg(long)]
    pub archive_name: Option<String>,

    /// Generate repository metadata for a staged directory
    #[arg(long)]
    pub metadata: bool,

    /// Sign the exported artifacts
    #[arg(long)]
    pub sign: bool,

    /// Replacement for the version qualifier
    #[arg(long)]
    pub qualifier: Option<String>,

    /// Configuration file (.yaml, .yml or .json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum parallel build passes
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Per-build timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Output format for the run summary
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl SiteExportCli {
    /// Configuration file if given, else the discovered one, else defaults,
    /// with command-line overrides applied on top.
    pub fn load_config(&self) -> Result<ExportConfig> {
        let mut config = match self.config.clone().or_else(ExportConfig::discover) {
            Some(path) => ExportConfig::load(path)?,
            None => ExportConfig::default(),
        };

        if let Some(jobs) = self.jobs {
            config.max_parallel_builds = jobs;
        }
        if let Some(timeout) = self.timeout {
            config.build_timeout_secs = Some(timeout);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn to_request(&self) -> Result<ExportRequest> {
        let destination = std::path::absolute(&self.destination)?;

        let mut builder = ExportRequest::builder(destination)
            .platforms(self.platforms.iter().cloned())
            .to_directory(!self.archive)
            .export_metadata(self.metadata)
            .signing(self.sign);

        for location in &self.units {
            builder = builder.unit(UnitRef::from_location(std::path::absolute(location)?)?);
        }
        if let Some(qualifier) = &self.qualifier {
            builder = builder.qualifier(qualifier.clone());
        }
        if let Some(name) = &self.archive_name {
            builder = builder.archive_name(name.clone());
        }

        builder.build()
    }
}
