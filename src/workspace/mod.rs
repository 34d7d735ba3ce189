//! Unit manifests: name, version, shipped resources and build script.

use crate::export::{ExportError, Result};
use crate::types::UnitRef;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MANIFEST_FILES: [&str; 3] = ["unit.yaml", "unit.yml", "unit.json"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitManifest {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    /// Relative to the unit location
    #[serde(default = "default_build_script")]
    pub build_script: PathBuf,
}

fn default_build_script() -> PathBuf {
    PathBuf::from("build.xml")
}

impl UnitManifest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            resources: Vec::new(),
            build_script: default_build_script(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_build_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.build_script = script.into();
        self
    }
}

/// Read-only access to unit manifests
pub trait ManifestReader: Send + Sync {
    fn read(&self, unit: &UnitRef) -> Result<UnitManifest>;
}

/// Reads `unit.yaml`, `unit.yml` or `unit.json` from the unit's directory.
#[derive(Debug, Clone, Default)]
pub struct FileManifestReader;

impl FileManifestReader {
    pub fn new() -> Self {
        Self
    }

    fn locate(&self, location: &Path) -> Option<PathBuf> {
        MANIFEST_FILES
            .iter()
            .map(|name| location.join(name))
            .find(|path| path.is_file())
    }
}

impl ManifestReader for FileManifestReader {
    fn read(&self, unit: &UnitRef) -> Result<UnitManifest> {
        let manifest_error = |reason: String| ExportError::Manifest {
            unit: unit.id.clone(),
            reason,
        };

        let path = self.locate(&unit.location).ok_or_else(|| {
            manifest_error(format!(
                "no {} found in {}",
                MANIFEST_FILES.join(" / "),
                unit.location.display()
            ))
        })?;

        let content = std::fs::read_to_string(&path)
            .map_err(|e| manifest_error(format!("{}: {e}", path.display())))?;

        let manifest: UnitManifest = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| manifest_error(e.to_string()))?
        } else {
            serde_yaml::from_str(&content).map_err(|e| manifest_error(e.to_string()))?
        };

        if manifest.name.trim().is_empty() {
            return Err(manifest_error("manifest name is empty".to_string()));
        }
        if manifest.build_script.is_absolute() {
            return Err(manifest_error(format!(
                "build script {} must be relative to the unit",
                manifest.build_script.display()
            )));
        }

        debug!("Read manifest for {} from {}", unit.id, path.display());
        Ok(manifest)
    }
}
