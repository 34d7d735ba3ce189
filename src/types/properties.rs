use serde::Serialize;
use std::collections::btree_map::{self, BTreeMap};

/// Property names understood by the build scripts.
pub mod keys {
    pub const OS: &str = "os";
    pub const WS: &str = "ws";
    pub const ARCH: &str = "arch";

    pub const BUILD_DIRECTORY: &str = "buildDirectory";
    pub const OUTPUT_DIRECTORY: &str = "outputDirectory";
    pub const OUTPUT_TYPE: &str = "outputType";
    pub const ARCHIVE_PREFIX: &str = "archivePrefix";
    pub const ARCHIVES_FORMAT: &str = "archivesFormat";
    pub const SIGN_JARS: &str = "signJars";
    pub const FORCE_CONTEXT_QUALIFIER: &str = "forceContextQualifier";

    pub const TOP_LEVEL_ELEMENT_ID: &str = "topLevelElementId";
    pub const TOP_LEVEL_ELEMENT_VERSION: &str = "topLevelElementVersion";
    pub const FEATURE_POST_PROCESSING: &str = "features.postProcessingSteps";
    pub const PLUGIN_POST_PROCESSING: &str = "plugins.postProcessingSteps";

    pub const GENERATE_P2_METADATA: &str = "generate.p2.metadata";
    pub const P2_FLAVOR: &str = "p2.flavor";
    pub const P2_PUBLISH_ARTIFACTS: &str = "p2.publish.artifacts";
    pub const P2_METADATA_REPO: &str = "p2.metadata.repo";
    pub const P2_ARTIFACT_REPO: &str = "p2.artifact.repo";

    /// Every key contributed by repository metadata enrichment
    pub const METADATA_KEYS: [&str; 5] = [
        GENERATE_P2_METADATA,
        P2_FLAVOR,
        P2_PUBLISH_ARTIFACTS,
        P2_METADATA_REPO,
        P2_ARTIFACT_REPO,
    ];

    pub const TRUE: &str = "true";
    pub const FALSE: &str = "false";
}

/// Properties handed to one build invocation.
///
/// Values are never empty: an unset optional is left out of the map rather
/// than stored as `""`, so `insert` ignores empty and whitespace-only values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildPropertyMap(BTreeMap<String, String>);

impl BuildPropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a property, returning false when the value was blank and skipped
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let value = value.into();
        if value.trim().is_empty() {
            return false;
        }
        self.0.insert(key.into(), value);
        true
    }

    pub fn insert_opt(&mut self, key: impl Into<String>, value: Option<impl Into<String>>) -> bool {
        match value {
            Some(value) => self.insert(key, value),
            None => false,
        }
    }

    pub fn insert_flag(&mut self, key: impl Into<String>, value: bool) {
        self.0.insert(
            key.into(),
            if value { keys::TRUE } else { keys::FALSE }.to_string(),
        );
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for BuildPropertyMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for BuildPropertyMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a> IntoIterator for &'a BuildPropertyMap {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
