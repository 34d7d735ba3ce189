//! Script runner backend: `<program> [args] -buildfile <script> -Dkey=value ...`
use super::{BuildInvocation, BuildOutput, BuildTool};
use crate::config::ExportConfig;
use crate::export::{ExportError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ScriptBuildTool {
    program: PathBuf,
    extra_args: Vec<String>,
}

impl ScriptBuildTool {
    pub fn new(program: &str, extra_args: Vec<String>) -> Self {
        let program = match which::which(program) {
            Ok(path) => path,
            Err(_) => {
                warn!("{} not found on PATH, invoking it by name", program);
                PathBuf::from(program)
            }
        };

        Self {
            program,
            extra_args,
        }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(&config.build_program, config.build_args.clone())
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    fn command(&self, invocation: &BuildInvocation) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.extra_args)
            .arg("-buildfile")
            .arg(&invocation.script)
            .args(define_args(invocation))
            .current_dir(&invocation.working_dir)
            .kill_on_drop(true);
        cmd
    }
}

fn define_args(invocation: &BuildInvocation) -> Vec<String> {
    invocation
        .properties
        .iter()
        .map(|(key, value)| format!("-D{key}={value}"))
        .collect()
}

#[async_trait]
impl BuildTool for ScriptBuildTool {
    async fn invoke(&self, invocation: &BuildInvocation) -> Result<BuildOutput> {
        info!(
            "Building {} for {} with {}",
            invocation.unit,
            invocation.target,
            invocation.script.display()
        );

        if let Some(parent) = invocation.log_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ExportError::BuildInvocation {
                    target: invocation.target.to_string(),
                    unit: invocation.unit.clone(),
                    reason: format!("Cannot create log directory {}: {e}", parent.display()),
                    log_location: None,
                })?;
        }

        let mut cmd = self.command(invocation);
        debug!("Running build command: {:?}", cmd);

        let output = cmd
            .output()
            .await
            .map_err(|e| ExportError::BuildInvocation {
                target: invocation.target.to_string(),
                unit: invocation.unit.clone(),
                reason: format!("Failed to execute {}: {e}", self.program.display()),
                log_location: None,
            })?;

        // Killed by a signal has no exit code
        let exit_code = output.status.code().unwrap_or(-1);
        debug!(
            "{} for {} exited with {}",
            invocation.unit, invocation.target, exit_code
        );

        // The exit code decides the pass; a lost log only loses the location
        let mut log = output.stdout;
        log.extend_from_slice(&output.stderr);
        let log_location = match fs::write(&invocation.log_path, &log).await {
            Ok(()) => Some(invocation.log_path.clone()),
            Err(e) => {
                warn!(
                    "Failed to write build log {}: {}",
                    invocation.log_path.display(),
                    e
                );
                None
            }
        };

        Ok(BuildOutput {
            exit_code,
            log_location,
        })
    }

    fn tool_name(&self) -> &str {
        "script"
    }
}
