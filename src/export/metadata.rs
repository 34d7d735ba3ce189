use crate::export::{ExportError, Result};
use crate::types::{keys, BuildPropertyMap};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use url::Url;

pub const DEFAULT_REPO_FLAVOR: &str = "tooling";

/// Repository metadata settings for an export destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataDescriptor {
    pub repo_flavor: String,
    pub metadata_repo_url: String,
    pub artifact_repo_url: String,
    pub publish_artifacts: bool,
}

impl MetadataDescriptor {
    pub fn merge_into(&self, properties: &mut BuildPropertyMap) {
        properties.insert_flag(keys::GENERATE_P2_METADATA, true);
        properties.insert(keys::P2_FLAVOR, self.repo_flavor.as_str());
        properties.insert_flag(keys::P2_PUBLISH_ARTIFACTS, self.publish_artifacts);
        properties.insert(keys::P2_METADATA_REPO, self.metadata_repo_url.as_str());
        properties.insert(keys::P2_ARTIFACT_REPO, self.artifact_repo_url.as_str());
    }
}

#[derive(Debug, Clone)]
pub struct MetadataPublisher {
    flavor: String,
}

impl MetadataPublisher {
    pub fn new(flavor: impl Into<String>) -> Self {
        Self {
            flavor: flavor.into(),
        }
    }

    pub fn flavor(&self) -> &str {
        &self.flavor
    }

    /// Derive the descriptor for a staged directory at `destination`.
    ///
    /// Both repositories point at the destination itself. A staged directory
    /// is raw build output, so artifacts are never published from it.
    pub fn derive(&self, destination: &Path) -> Result<MetadataDescriptor> {
        let url = file_url(destination)?;
        Ok(MetadataDescriptor {
            repo_flavor: self.flavor.clone(),
            metadata_repo_url: url.clone(),
            artifact_repo_url: url,
            publish_artifacts: false,
        })
    }
}

impl Default for MetadataPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_REPO_FLAVOR)
    }
}

/// Render `path` as a `file:/absolute/path` URL with reserved characters
/// escaped. Relative paths are rejected: there is nothing to resolve them
/// against without touching the file system.
pub fn file_url(path: &Path) -> Result<String> {
    let conversion_error = |reason: &str| ExportError::PathConversion {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if path.as_os_str().is_empty() {
        return Err(conversion_error("path is empty"));
    }
    if !path.is_absolute() {
        return Err(conversion_error("relative paths cannot be resolved"));
    }

    let normalized = normalize(path);
    let url = Url::from_file_path(&normalized)
        .map_err(|()| conversion_error("not representable as a file URL"))?;

    Ok(format!("file:{}", url.path()))
}

/// Lexically resolve `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(
                    normalized.components().next_back(),
                    Some(Component::RootDir | Component::Prefix(_)) | None
                ) {
                    normalized.pop();
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
