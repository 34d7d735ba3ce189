use anyhow::{Context, Result};
use clap::Parser;
use site_export::build::ScriptBuildTool;
use site_export::cli::{print_export_json, print_export_summary, OutputFormat, SiteExportCli};
use site_export::logging::{init_tracing, TracingSink};
use site_export::workspace::FileManifestReader;
use site_export::ExportOperationOrchestrator;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = SiteExportCli::parse();

    init_tracing(cli.verbose);
    info!("Starting site-export v{}", env!("CARGO_PKG_VERSION"));

    let config = cli.load_config().context("Failed to load configuration")?;
    let request = cli.to_request().context("Invalid export request")?;
    debug!("Using configuration: {:?}", config);

    let build_tool = Arc::new(ScriptBuildTool::from_config(&config));
    let orchestrator = ExportOperationOrchestrator::new(
        config,
        build_tool,
        Arc::new(FileManifestReader::new()),
        Arc::new(TracingSink),
    );

    let result = orchestrator
        .run(&request)
        .await
        .context("Export aborted before any build started")?;

    match cli.format {
        OutputFormat::Text => print_export_summary(&result),
        OutputFormat::Json => print_export_json(&result)?,
    }

    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
