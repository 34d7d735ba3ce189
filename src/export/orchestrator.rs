use crate::build::{BuildInvocation, BuildTool};
use crate::config::ExportConfig;
use crate::export::assembler::BuildPropertyAssembler;
use crate::export::customization::CustomizationFileWriter;
use crate::export::expander::PlatformMatrixExpander;
use crate::export::metadata::{MetadataDescriptor, MetadataPublisher};
use crate::export::report::{
    ExportResult, ExportWarning, PassStatus, TargetOutcome, UnitBuildRecord,
};
use crate::export::unit::ExportUnit;
use crate::export::{ExportError, Result};
use crate::logging::LogSink;
use crate::types::{BuildPropertyMap, ExportRequest, PlatformDefaults, PlatformTuple};
use crate::workspace::ManifestReader;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// A target that passed pre-flight, with the directory it owns.
#[derive(Debug, Clone)]
struct TargetPlan {
    target: PlatformTuple,
    output_path: PathBuf,
}

/// What every pass of one run shares.
struct RunScope<'a> {
    request: &'a ExportRequest,
    units: &'a [ExportUnit],
    base: &'a BuildPropertyMap,
    logs_dir: PathBuf,
}

/// Runs an export: expands platforms, prepares hooks, builds every unit for
/// every target and reports one outcome per target.
///
/// A failing target never stops its siblings. Only problems found before the
/// first build starts (bad request, unreadable manifest, two targets sharing
/// an output directory) fail the run as a whole.
pub struct ExportOperationOrchestrator {
    config: ExportConfig,
    expander: PlatformMatrixExpander,
    assembler: BuildPropertyAssembler,
    writer: CustomizationFileWriter,
    publisher: MetadataPublisher,
    build_tool: Arc<dyn BuildTool>,
    manifests: Arc<dyn ManifestReader>,
    sink: Arc<dyn LogSink>,
}

impl ExportOperationOrchestrator {
    pub fn new(
        config: ExportConfig,
        build_tool: Arc<dyn BuildTool>,
        manifests: Arc<dyn ManifestReader>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        let publisher = MetadataPublisher::new(config.repo_flavor.clone());
        let expander = PlatformMatrixExpander::new(PlatformDefaults::host());
        let assembler = BuildPropertyAssembler::new(expander.clone(), publisher.clone());

        Self {
            config,
            expander,
            assembler,
            writer: CustomizationFileWriter::new(),
            publisher,
            build_tool,
            manifests,
            sink,
        }
    }

    /// Replace the host platform used for defaults and qualification
    pub fn with_platform_defaults(mut self, defaults: PlatformDefaults) -> Self {
        self.expander = PlatformMatrixExpander::new(defaults);
        self.assembler = BuildPropertyAssembler::new(self.expander.clone(), self.publisher.clone());
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub async fn run(&self, request: &ExportRequest) -> Result<ExportResult> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();

        request.validate()?;
        self.config.validate()?;
        let work_dir = self.config.work_dir(&request.destination);
        let units = self.resolve_units(request, &work_dir)?;

        let targets = self.expander.expand(&request.platforms);
        let plans = self.plan_targets(request, &targets, &work_dir)?;
        info!(
            "Export {} starting: {} unit(s) x {} target(s) into {}",
            run_id,
            units.len(),
            plans.len(),
            request.destination.display()
        );

        for unit in &units {
            let created = self.writer.ensure_all(unit).await?;
            debug!("Created {} hook file(s) for {}", created.len(), unit.id());
        }

        let base = self.assembler.base_properties(request, &self.config, &work_dir);
        let scope = RunScope {
            request,
            units: &units,
            base: &base,
            logs_dir: work_dir.join("logs"),
        };
        let per_target = self.build_targets(&scope, plans).await;

        let mut warnings = Vec::new();
        let metadata = if request.to_directory && request.export_metadata {
            self.publish_metadata(request, &per_target, &mut warnings)
        } else {
            None
        };

        let result = ExportResult {
            run_id,
            per_target,
            metadata,
            warnings,
            started_at,
            completed_at: Utc::now(),
        };

        let summary = format!(
            "Export {} finished: {}/{} target(s) succeeded",
            run_id,
            result.succeeded(),
            result.per_target.len()
        );
        if result.is_success() {
            self.sink.info(&summary);
        } else {
            self.sink.error(&summary);
        }

        Ok(result)
    }

    fn resolve_units(&self, request: &ExportRequest, work_dir: &Path) -> Result<Vec<ExportUnit>> {
        request
            .units
            .iter()
            .map(|unit| {
                let manifest = self.manifests.read(unit)?;
                Ok(ExportUnit::new(
                    unit.clone(),
                    manifest,
                    work_dir.join(&unit.id),
                ))
            })
            .collect()
    }

    /// Give every target its output directory and refuse the run if two of
    /// them overlap, or if the work directory lands inside one. Compared
    /// case-insensitively since the destination may live on a
    /// case-insensitive file system.
    fn plan_targets(
        &self,
        request: &ExportRequest,
        targets: &[PlatformTuple],
        work_dir: &Path,
    ) -> Result<Vec<TargetPlan>> {
        let mut plans: Vec<TargetPlan> = Vec::with_capacity(targets.len());

        for target in targets {
            let output_path = self.expander.output_path(&request.destination, target);

            if let Some(first) = plans
                .iter()
                .find(|plan| overlaps(&plan.output_path, &output_path))
            {
                return Err(ExportError::DuplicateTargetPath {
                    first: first.target.to_string(),
                    second: target.to_string(),
                    path: output_path,
                });
            }
            if overlaps(work_dir, &output_path) {
                return Err(ExportError::Configuration(format!(
                    "Work directory {} overlaps the output of {} at {}",
                    work_dir.display(),
                    target,
                    output_path.display()
                )));
            }

            plans.push(TargetPlan {
                target: target.clone(),
                output_path,
            });
        }

        Ok(plans)
    }

    /// Run targets with at most `max_parallel_builds` in flight, slotting
    /// each outcome back at its target's index.
    async fn build_targets(&self, scope: &RunScope<'_>, plans: Vec<TargetPlan>) -> Vec<TargetOutcome> {
        let limit = self.config.max_parallel_builds.max(1);
        let mut slots: Vec<Option<TargetOutcome>> = (0..plans.len()).map(|_| None).collect();

        let mut passes = stream::iter(plans.into_iter().enumerate())
            .map(move |(index, plan)| async move { (index, self.build_target(scope, plan).await) })
            .buffer_unordered(limit);

        while let Some((index, outcome)) = passes.next().await {
            slots[index] = Some(outcome);
        }

        slots.into_iter().flatten().collect()
    }

    async fn build_target(&self, scope: &RunScope<'_>, plan: TargetPlan) -> TargetOutcome {
        let mut warnings: Vec<ExportWarning> = Vec::new();
        let mut unit_builds = Vec::with_capacity(scope.units.len());

        for unit in scope.units {
            let assembly = self.assembler.assemble(
                scope.base,
                unit,
                &plan.target,
                &plan.output_path,
                scope.request,
            );
            for warning in assembly.warnings {
                if !warnings.contains(&warning) {
                    self.sink.warn(&warning.to_string());
                    warnings.push(warning);
                }
            }

            let record = self
                .build_unit(scope, unit, &plan, assembly.properties)
                .await;
            unit_builds.push(record);
        }

        let status = unit_builds
            .iter()
            .map(|record| &record.status)
            .find(|status| status.is_failure())
            .cloned()
            .unwrap_or(PassStatus::Succeeded);

        TargetOutcome {
            target: plan.target,
            output_path: plan.output_path,
            status,
            unit_builds,
            warnings,
        }
    }

    async fn build_unit(
        &self,
        scope: &RunScope<'_>,
        unit: &ExportUnit,
        plan: &TargetPlan,
        properties: BuildPropertyMap,
    ) -> UnitBuildRecord {
        let invocation = BuildInvocation {
            unit: unit.id().to_string(),
            target: plan.target.clone(),
            script: unit.script_path(),
            properties,
            working_dir: unit.location().to_path_buf(),
            log_path: scope
                .logs_dir
                .join(format!("{}-{}.log", unit.id(), plan.target.qualifier())),
        };

        let started = Instant::now();
        let result = match self.config.build_timeout() {
            Some(limit) => tokio::time::timeout(limit, self.build_tool.invoke(&invocation))
                .await
                .unwrap_or_else(|_| {
                    Err(ExportError::Timeout {
                        target: plan.target.to_string(),
                        unit: unit.id().to_string(),
                        timeout_secs: limit.as_secs(),
                    })
                }),
            None => self.build_tool.invoke(&invocation).await,
        };

        let (status, log_location) = match result {
            Ok(output) if output.success() => (PassStatus::Succeeded, output.log_location),
            Ok(output) => {
                let error = ExportError::BuildInvocation {
                    target: plan.target.to_string(),
                    unit: unit.id().to_string(),
                    reason: format!(
                        "{} exited with status {}",
                        self.build_tool.tool_name(),
                        output.exit_code
                    ),
                    log_location: output.log_location.clone(),
                };
                self.report_failure(&error);
                (PassStatus::from(&error), output.log_location)
            }
            Err(error) => {
                self.report_failure(&error);
                (PassStatus::from(&error), error.log_location().cloned())
            }
        };

        UnitBuildRecord {
            unit: unit.id().to_string(),
            status,
            log_location,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    fn report_failure(&self, error: &ExportError) {
        match error.log_location() {
            Some(log) => self.sink.error(&format!("{error} (log: {})", log.display())),
            None => self.sink.error(&error.to_string()),
        }
    }

    /// Derive the run's metadata descriptor once all targets are done.
    fn publish_metadata(
        &self,
        request: &ExportRequest,
        outcomes: &[TargetOutcome],
        warnings: &mut Vec<ExportWarning>,
    ) -> Option<MetadataDescriptor> {
        if !outcomes.iter().any(TargetOutcome::is_success) {
            self.sink
                .warn("No target built successfully; repository metadata not published");
            return None;
        }

        match self.publisher.derive(&request.destination) {
            Ok(descriptor) => {
                info!(
                    "Repository metadata published to {}",
                    descriptor.metadata_repo_url
                );
                Some(descriptor)
            }
            Err(e) => {
                let warning = ExportWarning::MetadataSkipped {
                    target: None,
                    reason: e.to_string(),
                };
                self.sink.warn(&warning.to_string());
                warnings.push(warning);
                None
            }
        }
    }
}

/// One path equals or contains the other, ignoring case
fn overlaps(a: &Path, b: &Path) -> bool {
    let fold = |path: &Path| PathBuf::from(path.to_string_lossy().to_lowercase());
    let (a, b) = (fold(a), fold(b));
    a.starts_with(&b) || b.starts_with(&a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_paths_overlap() {
        assert!(overlaps(Path::new("/srv/site"), Path::new("/srv/site/win32.win32.x86")));
        assert!(overlaps(Path::new("/srv/Site/a"), Path::new("/srv/site")));
        assert!(overlaps(Path::new("/srv/site"), Path::new("/srv/SITE")));
    }

    #[test]
    fn test_siblings_do_not_overlap() {
        assert!(!overlaps(
            Path::new("/srv/site/.export"),
            Path::new("/srv/site/linux.gtk.x86_64")
        ));
        assert!(!overlaps(
            Path::new("/srv/site/linux.gtk.x86"),
            Path::new("/srv/site/linux.gtk.x86_64")
        ));
    }
}
