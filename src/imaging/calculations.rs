//! Pure calculation functions for downscale planning.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! ## Rounding
//!
//! The planned height is `height * max_resolution / width` rounded half away
//! from zero. It is computed in integers so exact halves are never lost to
//! floating-point error. A source of 1000x1333 capped at 500 therefore plans
//! 500x667 (666.5 rounds up), and 608x76 plans 500x63 (62.5 rounds up).
//! Heights that would round to zero are clamped to 1.

use super::params::{PhotoMetadata, ResizeTarget};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("photo reports a zero dimension ({width}x{height})")]
    ZeroDimension { width: u32, height: u32 },
    #[error("maximum resolution must be greater than zero")]
    ZeroThreshold,
}

/// Reject metadata with a zero width or height.
pub fn ensure_nonzero(metadata: PhotoMetadata) -> Result<(), PlanError> {
    if metadata.width == 0 || metadata.height == 0 {
        return Err(PlanError::ZeroDimension {
            width: metadata.width,
            height: metadata.height,
        });
    }
    Ok(())
}

/// Whether a photo is wider than `max_resolution` and must be shrunk.
///
/// Only the width is compared; tall narrow photos pass through untouched.
pub fn needs_downscale(metadata: PhotoMetadata, max_resolution: u32) -> bool {
    metadata.width > max_resolution
}

/// Plan the output dimensions for a photo capped at `max_resolution` wide.
///
/// The width becomes `max_resolution` exactly and the height follows the
/// source aspect ratio (see the [module docs](self) for the rounding rule).
///
/// # Examples
/// ```
/// # use imgproc::imaging::{PhotoMetadata, ResizeTarget, plan};
/// let target = plan(PhotoMetadata { width: 1000, height: 2000 }, 500).unwrap();
/// assert_eq!(target, ResizeTarget { width: 500, height: 1000 });
/// ```
pub fn plan(metadata: PhotoMetadata, max_resolution: u32) -> Result<ResizeTarget, PlanError> {
    ensure_nonzero(metadata)?;
    if max_resolution == 0 {
        return Err(PlanError::ZeroThreshold);
    }

    // round(h * max / w), half away from zero, in exact integer arithmetic
    let (w, h, max) = (
        metadata.width as u128,
        metadata.height as u128,
        max_resolution as u128,
    );
    let height = u32::try_from((2 * h * max + w) / (2 * w)).unwrap_or(u32::MAX);

    Ok(ResizeTarget {
        width: max_resolution,
        height: height.max(1),
    })
}
