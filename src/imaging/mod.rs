//! Image operations: header probing in-process, resampling in an external tool.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` (header only) |
//! | **Plan** | pure arithmetic, see [`plan`] |
//! | **Resize** | external tool (`ffmpeg -i <src> -s WxH <dst>`) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for downscale planning (unit testable)
//! - **Parameters**: Data structures describing photos and resize targets
//! - **Backend**: [`ImageBackend`] trait + [`ToolBackend`]
//! - **Header**: the dimension probe behind `identify`

pub mod backend;
mod calculations;
pub mod header;
mod params;
pub mod tool_backend;

pub use backend::{BackendError, ImageBackend};
pub use calculations::{PlanError, ensure_nonzero, needs_downscale, plan};
pub use params::{PhotoMetadata, ResizeParams, ResizeTarget};
pub use tool_backend::ToolBackend;
