//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the request [`pipeline`](crate::pipeline) (which decides
//! whether and how far to shrink a photo) and the [`backend`](super::backend)
//! (which reads headers and drives the external tool). Swapping the backend
//! for a mock in tests leaves the decision logic untouched.
//!
//! ## Types
//!
//! - [`PhotoMetadata`]: pixel dimensions read from a photo's container header.
//! - [`ResizeTarget`]: planned output dimensions; renders as the `WxH` scale spec.
//! - [`ResizeParams`]: everything a resize needs: source, output path, target.

use std::fmt;
use std::path::PathBuf;

/// Dimensions of a photo as stored in its container.
///
/// `width` is the number of pixels per encoded row and `height` the number of
/// rows. EXIF orientation is not applied: these are the dimensions the
/// external tool sees when it scales the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoMetadata {
    pub width: u32,
    pub height: u32,
}

/// Output dimensions for a downscale. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeTarget {
    pub width: u32,
    pub height: u32,
}

impl ResizeTarget {
    /// Scale specification in the `<width>x<height>` form the tool expects.
    pub fn scale_spec(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ResizeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl fmt::Display for PhotoMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Parameters for a single resize operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub target: ResizeTarget,
}
