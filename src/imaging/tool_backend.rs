//! External-tool backend: header probing in-process, resampling out of process.
//!
//! `identify` delegates to [`header::read_metadata`](super::header::read_metadata).
//! `resize` runs the configured tool as a child process:
//!
//! ```text
//! <program> [global_args…] -i <source> -s <W>x<H> <destination>
//! ```
//!
//! With the stock config that is exactly `ffmpeg -i <source> -s <W>x<H> <destination>`.
//! Stdin is closed, stdout is discarded, and stderr is captured so a failure can
//! be reported with the tool's own last word. The exit status is always
//! checked: a tool that cannot be launched or exits non-zero is an error.
//!
//! The child is spawned with `kill_on_drop`, so dropping the `resize` future
//! (a connection aborted after the shutdown grace period) kills the tool
//! before it can write the destination.

use super::backend::{BackendError, ImageBackend};
use super::header;
use super::params::{PhotoMetadata, ResizeParams};
use crate::config::ToolConfig;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Arguments passed after the global args: input, scale spec, output.
pub fn tool_arguments(params: &ResizeParams) -> Vec<OsString> {
    vec![
        "-i".into(),
        params.source.clone().into_os_string(),
        "-s".into(),
        params.target.scale_spec().into(),
        params.output.clone().into_os_string(),
    ]
}

/// Backend that shells out to an external image tool for resizing.
#[derive(Debug, Clone)]
pub struct ToolBackend {
    program: String,
    global_args: Vec<String>,
}

impl ToolBackend {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            global_args: Vec::new(),
        }
    }

    /// Arguments inserted between the program and `-i`.
    pub fn with_global_args(mut self, args: Vec<String>) -> Self {
        self.global_args = args;
        self
    }

    pub fn from_config(config: &ToolConfig) -> Self {
        Self::new(config.program.clone()).with_global_args(config.global_args.clone())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Build the child process command for a resize without running it.
    pub fn command(&self, params: &ResizeParams) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.global_args)
            .args(tool_arguments(params))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

impl Default for ToolBackend {
    fn default() -> Self {
        Self::from_config(&ToolConfig::default())
    }
}

/// Last non-empty line of the tool's stderr.
fn stderr_summary(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
        .to_string()
}

impl ImageBackend for ToolBackend {
    fn identify(&self, path: &Path) -> Result<PhotoMetadata, BackendError> {
        header::read_metadata(path)
    }

    async fn resize(&self, params: &ResizeParams) -> Result<(), BackendError> {
        debug!(
            program = %self.program,
            source = %params.source.display(),
            output = %params.output.display(),
            scale = %params.target,
            "invoking resize tool"
        );

        let output = self
            .command(params)
            .output()
            .await
            .map_err(|source| BackendError::ToolLaunch {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(BackendError::ToolFailed {
                program: self.program.clone(),
                status: output.status,
                stderr: stderr_summary(&output.stderr),
            });
        }
        Ok(())
    }
}
