use crate::export::{ExportError, Result};
use crate::types::platform::PlatformTuple;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// A unit to export, identified by `id` and rooted at `location`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnitRef {
    pub id: String,
    pub location: PathBuf,
}

impl UnitRef {
    pub fn new(id: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            location: location.into(),
        }
    }

    /// Use the directory name as the unit id
    pub fn from_location(location: impl Into<PathBuf>) -> Result<Self> {
        let location = location.into();
        let id = location
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                ExportError::InvalidRequest(format!(
                    "Cannot derive a unit id from {}",
                    location.display()
                ))
            })?
            .to_string();
        Ok(Self { id, location })
    }
}

/// True when `name` joins onto a directory as exactly one child: not blank,
/// no separators, not `.` or `..`.
pub(crate) fn is_plain_segment(name: &str) -> bool {
    !name.trim().is_empty() && !name.contains(['/', '\\']) && name != "." && name != ".."
}

/// Everything a caller asks of one export run.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub units: Vec<UnitRef>,
    pub platforms: Vec<PlatformTuple>,
    pub destination: PathBuf,
    /// Stage a directory tree instead of producing archives
    pub to_directory: bool,
    pub export_metadata: bool,
    pub signing_enabled: bool,
    pub qualifier: Option<String>,
    pub archive_name: Option<String>,
}

impl ExportRequest {
    pub fn builder(destination: impl Into<PathBuf>) -> ExportRequestBuilder {
        ExportRequestBuilder::new(destination)
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Checks the invariants every run relies on: a destination, at least one
    /// unit, and no unit listed twice.
    pub fn validate(&self) -> Result<()> {
        if self.destination.as_os_str().is_empty() {
            return Err(ExportError::InvalidRequest(
                "Export destination must not be empty".to_string(),
            ));
        }

        if self.units.is_empty() {
            return Err(ExportError::InvalidRequest(
                "No units selected for export".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for unit in &self.units {
            if unit.id.trim().is_empty() {
                return Err(ExportError::InvalidRequest(format!(
                    "Unit at {} has an empty id",
                    unit.location.display()
                )));
            }
            // Ids name the unit's hook directory and log files
            if !is_plain_segment(&unit.id) {
                return Err(ExportError::InvalidRequest(format!(
                    "Unit id '{}' must be a single path segment",
                    unit.id
                )));
            }
            if !seen.insert(unit.id.as_str()) {
                return Err(ExportError::InvalidRequest(format!(
                    "Unit '{}' is listed more than once",
                    unit.id
                )));
            }
        }

        if let Some(name) = &self.archive_name {
            if !is_plain_segment(name) {
                return Err(ExportError::InvalidRequest(format!(
                    "Invalid archive name '{name}'"
                )));
            }
        }

        Ok(())
    }
}

pub struct ExportRequestBuilder {
    request: ExportRequest,
}

impl ExportRequestBuilder {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            request: ExportRequest {
                units: Vec::new(),
                platforms: Vec::new(),
                destination: destination.into(),
                to_directory: true,
                export_metadata: false,
                signing_enabled: false,
                qualifier: None,
                archive_name: None,
            },
        }
    }

    pub fn unit(mut self, unit: UnitRef) -> Self {
        self.request.units.push(unit);
        self
    }

    pub fn units(mut self, units: impl IntoIterator<Item = UnitRef>) -> Self {
        self.request.units.extend(units);
        self
    }

    pub fn platform(mut self, platform: PlatformTuple) -> Self {
        self.request.platforms.push(platform);
        self
    }

    pub fn platforms(mut self, platforms: impl IntoIterator<Item = PlatformTuple>) -> Self {
        self.request.platforms.extend(platforms);
        self
    }

    pub fn to_directory(mut self, to_directory: bool) -> Self {
        self.request.to_directory = to_directory;
        self
    }

    pub fn export_metadata(mut self, export_metadata: bool) -> Self {
        self.request.export_metadata = export_metadata;
        self
    }

    pub fn signing(mut self, enabled: bool) -> Self {
        self.request.signing_enabled = enabled;
        self
    }

    pub fn qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.request.qualifier = Some(qualifier.into());
        self
    }

    pub fn archive_name(mut self, name: impl Into<String>) -> Self {
        self.request.archive_name = Some(name.into());
        self
    }

    pub fn build(self) -> Result<ExportRequest> {
        self.request.validate()?;
        Ok(self.request)
    }
}
