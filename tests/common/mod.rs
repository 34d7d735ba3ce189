//! Shared stand-ins for export integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use site_export::build::{BuildInvocation, BuildOutput, BuildTool};
use site_export::export::{ExportError, Result};
use site_export::types::{PlatformDefaults, PlatformTuple, UnitRef};
use site_export::workspace::{ManifestReader, UnitManifest};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn test_defaults() -> PlatformDefaults {
    PlatformDefaults::new("linux", "gtk", "x86_64")
}

pub fn linux() -> PlatformTuple {
    PlatformTuple::new("linux", "gtk", "x86_64")
}

pub fn windows() -> PlatformTuple {
    PlatformTuple::new("win32", "win32", "x86_64")
}

pub fn mac() -> PlatformTuple {
    PlatformTuple::new("macosx", "cocoa", "aarch64")
}

/// Records every invocation; selected targets or units exit nonzero, fail to
/// start, or take a while.
#[derive(Default)]
pub struct RecordingBuildTool {
    invocations: Mutex<Vec<BuildInvocation>>,
    failing_targets: Vec<PlatformTuple>,
    failing_units: Vec<String>,
    unstartable_targets: Vec<PlatformTuple>,
    delays: Vec<(PlatformTuple, Duration)>,
    default_delay: Option<Duration>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl RecordingBuildTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, target: PlatformTuple) -> Self {
        self.failing_targets.push(target);
        self
    }

    pub fn failing_unit(mut self, unit: &str) -> Self {
        self.failing_units.push(unit.to_string());
        self
    }

    pub fn unstartable_on(mut self, target: PlatformTuple) -> Self {
        self.unstartable_targets.push(target);
        self
    }

    pub fn delayed(mut self, target: PlatformTuple, delay: Duration) -> Self {
        self.delays.push((target, delay));
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    pub fn invocations(&self) -> Vec<BuildInvocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn delay_for(&self, target: &PlatformTuple) -> Option<Duration> {
        self.delays
            .iter()
            .find(|(t, _)| t == target)
            .map(|(_, delay)| *delay)
            .or(self.default_delay)
    }
}

#[async_trait]
impl BuildTool for RecordingBuildTool {
    async fn invoke(&self, invocation: &BuildInvocation) -> Result<BuildOutput> {
        self.invocations.lock().unwrap().push(invocation.clone());

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        if let Some(delay) = self.delay_for(&invocation.target) {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.unstartable_targets.contains(&invocation.target) {
            return Err(ExportError::BuildInvocation {
                target: invocation.target.to_string(),
                unit: invocation.unit.clone(),
                reason: "runner not found".to_string(),
                log_location: None,
            });
        }

        let failed = self.failing_targets.contains(&invocation.target)
            || self.failing_units.contains(&invocation.unit);

        Ok(BuildOutput {
            exit_code: if failed { 1 } else { 0 },
            log_location: Some(invocation.log_path.clone()),
        })
    }

    fn tool_name(&self) -> &str {
        "recording"
    }
}

/// Manifests keyed by unit id
#[derive(Default)]
pub struct StaticManifestReader {
    manifests: HashMap<String, UnitManifest>,
}

impl StaticManifestReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: &str, manifest: UnitManifest) -> Self {
        self.manifests.insert(id.to_string(), manifest);
        self
    }
}

impl ManifestReader for StaticManifestReader {
    fn read(&self, unit: &UnitRef) -> Result<UnitManifest> {
        self.manifests
            .get(&unit.id)
            .cloned()
            .ok_or_else(|| ExportError::Manifest {
                unit: unit.id.clone(),
                reason: "unknown unit".to_string(),
            })
    }
}

/// A relative spelling of `path` from the current directory, used to get a
/// destination that cannot be turned into a file URL but still lands in a
/// temporary directory.
pub fn relative_from_cwd(path: &Path) -> PathBuf {
    let cwd = std::env::current_dir().unwrap();
    let mut relative = PathBuf::new();
    for component in cwd.components() {
        if matches!(component, Component::Normal(_)) {
            relative.push("..");
        }
    }
    for component in path.components() {
        if let Component::Normal(part) = component {
            relative.push(part);
        }
    }
    relative
}
