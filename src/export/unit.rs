use crate::export::customization::PostProcessingKind;
use crate::types::UnitRef;
use crate::workspace::UnitManifest;
use std::path::{Path, PathBuf};

/// A requested unit joined with its manifest and the directory holding its
/// post-processing hooks for this run.
#[derive(Debug, Clone)]
pub struct ExportUnit {
    pub reference: UnitRef,
    pub manifest: UnitManifest,
    pub hooks_dir: PathBuf,
}

impl ExportUnit {
    pub fn new(reference: UnitRef, manifest: UnitManifest, hooks_dir: PathBuf) -> Self {
        Self {
            reference,
            manifest,
            hooks_dir,
        }
    }

    pub fn id(&self) -> &str {
        &self.reference.id
    }

    pub fn location(&self) -> &Path {
        &self.reference.location
    }

    pub fn script_path(&self) -> PathBuf {
        self.reference.location.join(&self.manifest.build_script)
    }

    pub fn hook_path(&self, kind: PostProcessingKind) -> PathBuf {
        self.hooks_dir.join(kind.file_name())
    }
}
