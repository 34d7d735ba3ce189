use crate::config::ExportConfig;
use crate::export::customization::PostProcessingKind;
use crate::export::expander::PlatformMatrixExpander;
use crate::export::metadata::MetadataPublisher;
use crate::export::report::ExportWarning;
use crate::export::unit::ExportUnit;
use crate::types::{keys, BuildPropertyMap, ExportRequest, PlatformTuple};
use std::path::Path;

const DEFAULT_ARCHIVE_NAME: &str = "export";

/// Properties for one build pass plus anything worth reporting about how
/// they were put together.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub properties: BuildPropertyMap,
    pub warnings: Vec<ExportWarning>,
}

/// Composes per-pass build properties from a shared base map.
#[derive(Debug, Clone)]
pub struct BuildPropertyAssembler {
    expander: PlatformMatrixExpander,
    publisher: MetadataPublisher,
}

impl BuildPropertyAssembler {
    pub fn new(expander: PlatformMatrixExpander, publisher: MetadataPublisher) -> Self {
        Self {
            expander,
            publisher,
        }
    }

    /// Keys shared by every pass of a run. `work_dir` is where the build
    /// tool keeps its intermediate state.
    pub fn base_properties(
        &self,
        request: &ExportRequest,
        config: &ExportConfig,
        work_dir: &Path,
    ) -> BuildPropertyMap {
        let mut base = BuildPropertyMap::new();
        base.extend(config.extra_properties.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        base.insert(keys::BUILD_DIRECTORY, work_dir.to_string_lossy());
        base.insert(
            keys::OUTPUT_TYPE,
            if request.to_directory { "directory" } else { "archive" },
        );
        base.insert(
            keys::ARCHIVE_PREFIX,
            request.archive_name.as_deref().unwrap_or(DEFAULT_ARCHIVE_NAME),
        );
        if !request.to_directory {
            base.insert(keys::ARCHIVES_FORMAT, config.archive_format.as_str());
        }
        base.insert_flag(keys::SIGN_JARS, request.signing_enabled);
        base.insert_opt(keys::FORCE_CONTEXT_QUALIFIER, request.qualifier.as_deref());

        base
    }

    /// Build the property map for `unit` on `tuple`, writing to `output_dir`.
    ///
    /// `base` is only read; every call works on its own copy, so passes for
    /// different targets never see each other's keys.
    pub fn assemble(
        &self,
        base: &BuildPropertyMap,
        unit: &ExportUnit,
        tuple: &PlatformTuple,
        output_dir: &Path,
        request: &ExportRequest,
    ) -> Assembly {
        let mut properties = base.clone();
        let mut warnings = Vec::new();

        properties.insert(keys::TOP_LEVEL_ELEMENT_ID, unit.id());
        properties.insert_opt(keys::TOP_LEVEL_ELEMENT_VERSION, unit.manifest.version.as_deref());
        for kind in PostProcessingKind::ALL {
            properties.insert(kind.property_key(), unit.hook_path(kind).to_string_lossy());
        }

        self.add_platform_qualifiers(&mut properties, tuple);
        properties.insert(keys::OUTPUT_DIRECTORY, output_dir.to_string_lossy());

        if request.to_directory && request.export_metadata {
            match self.publisher.derive(&request.destination) {
                Ok(descriptor) => descriptor.merge_into(&mut properties),
                Err(e) => warnings.push(ExportWarning::MetadataSkipped {
                    target: Some(tuple.to_string()),
                    reason: e.to_string(),
                }),
            }
        }

        Assembly {
            properties,
            warnings,
        }
    }

    /// Only fields that differ from the host default are qualified, which
    /// keeps default-platform output portable.
    fn add_platform_qualifiers(&self, properties: &mut BuildPropertyMap, tuple: &PlatformTuple) {
        let defaults = self.expander.defaults();
        if tuple.os != defaults.os {
            properties.insert(keys::OS, tuple.os.as_str());
        }
        if tuple.ws != defaults.ws {
            properties.insert(keys::WS, tuple.ws.as_str());
        }
        if tuple.arch != defaults.arch {
            properties.insert(keys::ARCH, tuple.arch.as_str());
        }
    }
}
