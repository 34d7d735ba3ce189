//! Post-processing hook files picked up by the build scripts.

use crate::export::unit::ExportUnit;
use crate::export::Result;
use crate::types::keys;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PostProcessingKind {
    Feature,
    Plugin,
}

impl PostProcessingKind {
    pub const ALL: [PostProcessingKind; 2] = [PostProcessingKind::Feature, PostProcessingKind::Plugin];

    pub fn file_name(self) -> &'static str {
        match self {
            PostProcessingKind::Feature => "features.postProcessingSteps.properties",
            PostProcessingKind::Plugin => "plugins.postProcessingSteps.properties",
        }
    }

    pub fn property_key(self) -> &'static str {
        match self {
            PostProcessingKind::Feature => keys::FEATURE_POST_PROCESSING,
            PostProcessingKind::Plugin => keys::PLUGIN_POST_PROCESSING,
        }
    }

    fn subject(self) -> &'static str {
        match self {
            PostProcessingKind::Feature => "features",
            PostProcessingKind::Plugin => "plug-ins",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostProcessingFile {
    pub unit: String,
    pub kind: PostProcessingKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct CustomizationFileWriter;

impl CustomizationFileWriter {
    pub fn new() -> Self {
        Self
    }

    /// Create the hook file at `target_path` unless something is already
    /// there. Returns whether a file was created; existing content is never
    /// touched.
    pub async fn ensure(
        &self,
        unit: &str,
        kind: PostProcessingKind,
        target_path: &Path,
    ) -> Result<bool> {
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let open = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(target_path)
            .await;

        match open {
            Ok(mut file) => {
                file.write_all(template(unit, kind).as_bytes()).await?;
                file.flush().await?;
                debug!("Created {:?} hook for {} at {:?}", kind, unit, target_path);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("Keeping existing {:?} hook at {:?}", kind, target_path);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// One `ensure` per hook kind for `unit`; returns the files created now.
    pub async fn ensure_all(&self, unit: &ExportUnit) -> Result<Vec<PostProcessingFile>> {
        let mut created = Vec::new();
        for kind in PostProcessingKind::ALL {
            let path = unit.hook_path(kind);
            if self.ensure(unit.id(), kind, &path).await? {
                created.push(PostProcessingFile {
                    unit: unit.id().to_string(),
                    kind,
                    path,
                });
            }
        }
        Ok(created)
    }
}

fn template(unit: &str, kind: PostProcessingKind) -> String {
    format!(
        "# Post-processing steps applied to the {subject} of {unit} after they are built.\n\
         # Map an artifact id to a comma separated list of steps, for example:\n\
         #   org.example.bundle=sign\n",
        subject = kind.subject()
    )
}
