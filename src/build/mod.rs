pub mod script;

pub use script::ScriptBuildTool;

use crate::export::Result;
use crate::types::{BuildPropertyMap, PlatformTuple};
use async_trait::async_trait;
use std::path::PathBuf;

/// One run of the external build tool.
#[derive(Debug, Clone)]
pub struct BuildInvocation {
    pub unit: String,
    pub target: PlatformTuple,
    pub script: PathBuf,
    pub properties: BuildPropertyMap,
    pub working_dir: PathBuf,
    /// Where the tool's output should be captured
    pub log_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    pub exit_code: i32,
    pub log_location: Option<PathBuf>,
}

impl BuildOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// The external build step. Returning `Err` means the tool could not be
/// run at all; a tool that ran and failed reports a nonzero `exit_code`.
#[async_trait]
pub trait BuildTool: Send + Sync {
    async fn invoke(&self, invocation: &BuildInvocation) -> Result<BuildOutput>;

    fn tool_name(&self) -> &str;
}
