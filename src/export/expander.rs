use crate::types::{PlatformDefaults, PlatformTuple};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Turns the requested platform list into concrete build targets.
#[derive(Debug, Clone)]
pub struct PlatformMatrixExpander {
    defaults: PlatformDefaults,
}

impl PlatformMatrixExpander {
    pub fn new(defaults: PlatformDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &PlatformDefaults {
        &self.defaults
    }

    /// Expand `platforms` into deduplicated, fully specified targets.
    ///
    /// An empty list means "build for the host" and yields exactly the
    /// default tuple. Blank fields are filled from the defaults before
    /// deduplication; first-seen order is kept.
    pub fn expand(&self, platforms: &[PlatformTuple]) -> Vec<PlatformTuple> {
        if platforms.is_empty() {
            return vec![self.defaults.tuple()];
        }

        let mut seen = HashSet::new();
        platforms
            .iter()
            .map(|tuple| self.complete(tuple))
            .filter(|tuple| seen.insert(tuple.clone()))
            .collect()
    }

    /// Substitute the default for every blank field
    pub fn complete(&self, tuple: &PlatformTuple) -> PlatformTuple {
        fn pick(value: &str, fallback: &str) -> String {
            let value = value.trim();
            if value.is_empty() {
                fallback.to_string()
            } else {
                value.to_string()
            }
        }

        PlatformTuple::new(
            pick(&tuple.os, &self.defaults.os),
            pick(&tuple.ws, &self.defaults.ws),
            pick(&tuple.arch, &self.defaults.arch),
        )
    }

    /// Where a target's build output lands: its own `os.ws.arch`
    /// subdirectory of `destination`, so no target's output contains
    /// another's.
    pub fn output_path(&self, destination: &Path, tuple: &PlatformTuple) -> PathBuf {
        destination.join(output_segment(tuple))
    }
}

impl Default for PlatformMatrixExpander {
    fn default() -> Self {
        Self::new(PlatformDefaults::host())
    }
}

fn output_segment(tuple: &PlatformTuple) -> String {
    tuple
        .qualifier()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}
