//! Image backend trait and shared error type.
//!
//! The [`ImageBackend`] trait defines the two operations the service needs:
//! `identify` (read pixel dimensions from a container header) and `resize`
//! (produce a smaller copy at planned dimensions).
//!
//! `identify` is a short blocking read and is called from tokio's blocking
//! pool. `resize` is asynchronous: dropping its future must stop the work, so
//! a connection aborted at shutdown leaves no tool running behind it.
//!
//! The production implementation is
//! [`ToolBackend`](super::tool_backend::ToolBackend): header probing through
//! the `image` crate, resampling through an external tool (ffmpeg by default).

use super::params::{PhotoMetadata, ResizeParams};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Photo not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Unreadable photo format {}: {reason}", .path.display())]
    UnreadableFormat { path: PathBuf, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to launch {program}: {source}")]
    ToolLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    ToolFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// Trait for image backends.
///
/// Implementations must be shareable across connection tasks.
pub trait ImageBackend: Send + Sync {
    /// Read pixel dimensions without decoding pixel data. Blocking.
    fn identify(&self, path: &Path) -> Result<PhotoMetadata, BackendError>;

    /// Write a resized copy of `params.source` to `params.output`.
    ///
    /// Dropping the returned future before it completes cancels the resize.
    fn resize(
        &self,
        params: &ResizeParams,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}
