//! CLI output formatting for the local commands.
//!
//! The server itself reports through `tracing`; this module only covers what
//! the `plan` and `send` commands print for a human.
//!
//! # Output Format
//!
//! ## Plan
//!
//! ```text
//! photos/cat.jpg
//!     Dimensions: 4000x3000
//!     Plan: 500x375 (max width 500)
//!     Tool: ffmpeg -i photos/cat.jpg -s 500x375 <destination>
//! ```
//!
//! ## Send
//!
//! ```text
//! DOWN-RESOLUTE photos/cat.jpg thumbs/cat.jpg
//!     Response: OK
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::imaging::{PhotoMetadata, ResizeTarget};
use crate::protocol::Command;
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

// ============================================================================
// Plan
// ============================================================================

/// Format the dry-run plan for one photo.
///
/// `target` is `None` when the photo is already within `max_resolution`.
pub fn format_plan(
    photo: &Path,
    metadata: PhotoMetadata,
    max_resolution: u32,
    target: Option<ResizeTarget>,
    program: &str,
) -> Vec<String> {
    let mut lines = vec![
        photo.display().to_string(),
        format!("{}Dimensions: {}", indent(1), metadata),
    ];
    match target {
        Some(target) => {
            lines.push(format!(
                "{}Plan: {} (max width {})",
                indent(1),
                target,
                max_resolution
            ));
            lines.push(format!(
                "{}Tool: {} -i {} -s {} <destination>",
                indent(1),
                program,
                photo.display(),
                target.scale_spec()
            ));
        }
        None => lines.push(format!(
            "{}Plan: unchanged (width {} <= {})",
            indent(1),
            metadata.width,
            max_resolution
        )),
    }
    lines
}

pub fn print_plan(
    photo: &Path,
    metadata: PhotoMetadata,
    max_resolution: u32,
    target: Option<ResizeTarget>,
    program: &str,
) {
    for line in format_plan(photo, metadata, max_resolution, target, program) {
        println!("{}", line);
    }
}

// ============================================================================
// Send
// ============================================================================

/// Format a request and the server's answer.
pub fn format_send(command: &Command, response: &str) -> Vec<String> {
    let answer = if response.is_empty() {
        "(closed without a response)"
    } else {
        response
    };
    vec![
        command.to_wire(),
        format!("{}Response: {}", indent(1), answer),
    ]
}

pub fn print_send(command: &Command, response: &str) {
    for line in format_send(command, response) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_output_shows_target_and_tool_invocation() {
        let lines = format_plan(
            Path::new("photos/cat.jpg"),
            PhotoMetadata {
                width: 4000,
                height: 3000,
            },
            500,
            Some(ResizeTarget {
                width: 500,
                height: 375,
            }),
            "ffmpeg",
        );
        assert_eq!(
            lines,
            vec![
                "photos/cat.jpg",
                "    Dimensions: 4000x3000",
                "    Plan: 500x375 (max width 500)",
                "    Tool: ffmpeg -i photos/cat.jpg -s 500x375 <destination>",
            ]
        );
    }

    #[test]
    fn plan_output_for_small_photo() {
        let lines = format_plan(
            Path::new("icon.png"),
            PhotoMetadata {
                width: 64,
                height: 64,
            },
            500,
            None,
            "ffmpeg",
        );
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "    Plan: unchanged (width 64 <= 500)");
    }

    #[test]
    fn send_output_shows_request_and_response() {
        let command = Command::down_resolute("a.jpg", "b.jpg");
        assert_eq!(
            format_send(&command, "OK"),
            vec!["DOWN-RESOLUTE a.jpg b.jpg", "    Response: OK"]
        );
    }

    #[test]
    fn send_output_marks_silent_close() {
        let command = Command::down_resolute("a.jpg", "b.jpg");
        assert_eq!(
            format_send(&command, "")[1],
            "    Response: (closed without a response)"
        );
    }
}
