//! Export settings, loaded from YAML or JSON with defaults for anything
//! left out.

use crate::export::metadata::DEFAULT_REPO_FLAVOR;
use crate::export::{ExportError, Result};
use crate::types::request::is_plain_segment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Script runner invoked for every build pass
    pub build_program: String,
    pub build_args: Vec<String>,
    pub max_parallel_builds: usize,
    pub build_timeout_secs: Option<u64>,
    /// Directory for hooks and logs; defaults to `work_dir_name` under
    /// the destination
    pub work_dir: Option<PathBuf>,
    pub work_dir_name: String,
    pub repo_flavor: String,
    pub archive_format: String,
    pub extra_properties: BTreeMap<String, String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            build_program: "ant".to_string(),
            build_args: Vec::new(),
            max_parallel_builds: num_cpus::get(),
            build_timeout_secs: None,
            work_dir: None,
            work_dir_name: ".export".to_string(),
            repo_flavor: DEFAULT_REPO_FLAVOR.to_string(),
            archive_format: "zip".to_string(),
            extra_properties: BTreeMap::new(),
        }
    }
}

impl ExportConfig {
    /// Load from a `.yaml`/`.yml` or `.json` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExportError::Configuration(format!("Failed to read {}: {e}", path.display()))
        })?;

        let config: ExportConfig = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            _ => {
                return Err(ExportError::Configuration(format!(
                    "Unsupported configuration format: {}",
                    path.display()
                )))
            }
        };

        config.validate()?;
        debug!("Loaded export configuration from {}", path.display());
        Ok(config)
    }

    /// `~/.config/site-export/config.yaml` when it exists
    pub fn discover() -> Option<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("site-export").join("config.yaml"))
            .filter(|path| path.is_file())
    }

    pub fn validate(&self) -> Result<()> {
        if self.build_program.trim().is_empty() {
            return Err(ExportError::Configuration(
                "build_program must not be empty".to_string(),
            ));
        }
        if self.max_parallel_builds == 0 {
            return Err(ExportError::Configuration(
                "max_parallel_builds must be at least 1".to_string(),
            ));
        }
        if self.build_timeout_secs == Some(0) {
            return Err(ExportError::Configuration(
                "build_timeout_secs must be positive".to_string(),
            ));
        }
        if !is_plain_segment(&self.work_dir_name) {
            return Err(ExportError::Configuration(format!(
                "Invalid work_dir_name '{}'",
                self.work_dir_name
            )));
        }
        if self.repo_flavor.trim().is_empty() {
            return Err(ExportError::Configuration(
                "repo_flavor must not be empty".to_string(),
            ));
        }
        if self.archive_format.trim().is_empty() {
            return Err(ExportError::Configuration(
                "archive_format must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn build_timeout(&self) -> Option<Duration> {
        self.build_timeout_secs.map(Duration::from_secs)
    }

    /// Where hooks and logs go for an export into `destination`
    pub fn work_dir(&self, destination: &Path) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| destination.join(&self.work_dir_name))
    }
}
