//! Request pipeline: validate → identify → plan → resize.
//!
//! A request runs in two halves. [`Pipeline::prepare`] does the blocking part
//! (existence check, header read, planning, the undersized copy) and runs on
//! tokio's blocking pool (see [`handler`](crate::handler)).
//! [`Pipeline::complete`] awaits the external tool on the connection's own
//! task, so aborting the connection also stops the tool.
//!
//! Each step either hands its result to the next or returns immediately with a
//! [`RequestError`]; nothing runs after an error.

use crate::config::{ResizeConfig, UndersizedPolicy};
use crate::imaging::{
    BackendError, ImageBackend, PhotoMetadata, PlanError, ResizeParams, ResizeTarget,
    ensure_nonzero, needs_downscale, plan,
};
use crate::protocol::{Command, RequestError};
use std::path::Path;

/// How a successful request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The tool wrote a downscaled copy.
    Resized {
        original: PhotoMetadata,
        target: ResizeTarget,
    },
    /// Already small enough; nothing written.
    Unchanged(PhotoMetadata),
    /// Already small enough; copied verbatim to the destination.
    Copied(PhotoMetadata),
}

/// What is left to do after [`Pipeline::prepare`].
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Nothing; the request is already satisfied.
    Done(Outcome),
    /// Run the resize tool.
    Resize {
        original: PhotoMetadata,
        params: ResizeParams,
    },
}

/// Shared, read-only request processor.
pub struct Pipeline<B> {
    backend: B,
    max_resolution: u32,
    undersized: UndersizedPolicy,
}

impl<B: ImageBackend> Pipeline<B> {
    pub fn new(backend: B, config: &ResizeConfig) -> Self {
        Self {
            backend,
            max_resolution: config.max_resolution,
            undersized: config.undersized,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn max_resolution(&self) -> u32 {
        self.max_resolution
    }

    /// The downscale target for a photo, or `None` if it is narrow enough.
    pub fn target_for(&self, metadata: PhotoMetadata) -> Result<Option<ResizeTarget>, PlanError> {
        ensure_nonzero(metadata)?;
        if !needs_downscale(metadata, self.max_resolution) {
            return Ok(None);
        }
        plan(metadata, self.max_resolution).map(Some)
    }

    /// Validate, identify and plan one command. Blocking.
    pub fn prepare(&self, command: &Command) -> Result<Step, RequestError> {
        let source = command.source_path.as_path();
        let destination = command.destination_path.as_path();

        if !is_regular_file(source) {
            return Err(RequestError::SourceNotFound(source.to_path_buf()));
        }

        let original = self
            .backend
            .identify(source)
            .map_err(RequestError::MetadataUnreadable)?;

        match self.target_for(original)? {
            None => self
                .handle_undersized(source, destination, original)
                .map(Step::Done),
            Some(target) => Ok(Step::Resize {
                original,
                params: ResizeParams {
                    source: source.to_path_buf(),
                    output: destination.to_path_buf(),
                    target,
                },
            }),
        }
    }

    /// Finish a prepared step, running the resize tool if one is needed.
    pub async fn complete(&self, step: Step) -> Result<Outcome, RequestError> {
        match step {
            Step::Done(outcome) => Ok(outcome),
            Step::Resize { original, params } => {
                self.backend
                    .resize(&params)
                    .await
                    .map_err(RequestError::ExternalToolFailure)?;
                Ok(Outcome::Resized {
                    original,
                    target: params.target,
                })
            }
        }
    }

    fn handle_undersized(
        &self,
        source: &Path,
        destination: &Path,
        original: PhotoMetadata,
    ) -> Result<Outcome, RequestError> {
        match self.undersized {
            UndersizedPolicy::Skip => Ok(Outcome::Unchanged(original)),
            // Copying a file onto itself would truncate it.
            UndersizedPolicy::Copy if same_file(source, destination) => {
                Ok(Outcome::Unchanged(original))
            }
            UndersizedPolicy::Copy => {
                std::fs::copy(source, destination)
                    .map_err(|e| RequestError::ExternalToolFailure(BackendError::Io(e)))?;
                Ok(Outcome::Copied(original))
            }
        }
    }
}

/// True when `path` exists and is a regular file (after following symlinks).
fn is_regular_file(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|m| m.is_file())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
