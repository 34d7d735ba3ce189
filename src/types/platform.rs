use crate::export::ExportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One build configuration: operating system, windowing system and CPU
/// architecture, using the build tool's naming (`linux`, `gtk`, `x86_64`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlatformTuple {
    pub os: String,
    pub ws: String,
    pub arch: String,
}

impl PlatformTuple {
    pub fn new(os: impl Into<String>, ws: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            ws: ws.into(),
            arch: arch.into(),
        }
    }

    /// True when none of the three fields is blank.
    pub fn is_concrete(&self) -> bool {
        ![&self.os, &self.ws, &self.arch]
            .iter()
            .any(|field| field.trim().is_empty())
    }

    /// `os.ws.arch`, the form used for output directories and log names.
    pub fn qualifier(&self) -> String {
        format!("{}.{}.{}", self.os, self.ws, self.arch)
    }
}

impl fmt::Display for PlatformTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualifier())
    }
}

/// Parses the `os,ws,arch` command-line form. Fields may be left empty
/// (`linux,,`) to fall back to the host default during expansion.
impl FromStr for PlatformTuple {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [os, ws, arch] => Ok(Self::new(*os, *ws, *arch)),
            _ => Err(ExportError::InvalidRequest(format!(
                "Platform '{s}' must have the form os,ws,arch"
            ))),
        }
    }
}

/// The environment default platform, substituted for anything the caller
/// leaves unspecified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDefaults {
    pub os: String,
    pub ws: String,
    pub arch: String,
}

impl PlatformDefaults {
    pub fn new(os: impl Into<String>, ws: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            ws: ws.into(),
            arch: arch.into(),
        }
    }

    /// Detect the platform this process runs on
    pub fn host() -> Self {
        let os = if cfg!(target_os = "linux") {
            "linux"
        } else if cfg!(target_os = "macos") {
            "macosx"
        } else if cfg!(target_os = "windows") {
            "win32"
        } else if cfg!(target_os = "freebsd") {
            "freebsd"
        } else {
            std::env::consts::OS
        };

        let ws = match os {
            "macosx" => "cocoa",
            "win32" => "win32",
            _ => "gtk",
        };

        let arch = if cfg!(target_arch = "x86_64") {
            "x86_64"
        } else if cfg!(target_arch = "aarch64") {
            "aarch64"
        } else if cfg!(target_arch = "x86") {
            "x86"
        } else if cfg!(target_arch = "powerpc64") {
            "ppc64le"
        } else {
            std::env::consts::ARCH
        };

        Self::new(os, ws, arch)
    }

    pub fn tuple(&self) -> PlatformTuple {
        PlatformTuple::new(&self.os, &self.ws, &self.arch)
    }

    pub fn is_default(&self, tuple: &PlatformTuple) -> bool {
        tuple.os == self.os && tuple.ws == self.ws && tuple.arch == self.arch
    }
}

impl Default for PlatformDefaults {
    fn default() -> Self {
        Self::host()
    }
}
