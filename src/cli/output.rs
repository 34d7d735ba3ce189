use crate::export::{ExportResult, PassStatus, RunStatus};

/// Print the run summary in human-readable format
pub fn print_export_summary(result: &ExportResult) {
    println!("📦 Export {}", result.run_id);
    println!("===================================================");

    for outcome in &result.per_target {
        let icon = if outcome.is_success() { "✅" } else { "❌" };
        println!(
            "{} {} -> {}",
            icon,
            outcome.target,
            outcome.output_path.display()
        );

        for record in &outcome.unit_builds {
            let detail = match &record.status {
                PassStatus::Succeeded => format!("ok ({} ms)", record.duration_ms),
                PassStatus::Failed { reason } => format!("failed: {reason}"),
                PassStatus::TimedOut { timeout_secs } => format!("timed out after {timeout_secs}s"),
            };
            println!("    • {}: {}", record.unit, detail);
            if record.status.is_failure() {
                if let Some(log) = &record.log_location {
                    println!("      log: {}", log.display());
                }
            }
        }
    }

    let warnings: Vec<_> = result.all_warnings().collect();
    if !warnings.is_empty() {
        println!();
        println!("⚠️  Warnings:");
        for warning in warnings {
            println!("  • {warning}");
        }
    }

    if let Some(metadata) = &result.metadata {
        println!();
        println!("🗂  Repository metadata: {}", metadata.metadata_repo_url);
    }

    println!();
    match result.status() {
        RunStatus::Done => println!(
            "✅ Done: {}/{} target(s) succeeded",
            result.succeeded(),
            result.per_target.len()
        ),
        RunStatus::Failed => println!(
            "❌ Failed: {} of {} target(s) failed",
            result.failed(),
            result.per_target.len()
        ),
    }
}

/// Print the run summary as JSON
pub fn print_export_json(result: &ExportResult) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}
