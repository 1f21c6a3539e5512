//! Wire protocol: one text request, one text response, per connection.
//!
//! ## Request
//!
//! ```text
//! DOWN-RESOLUTE <source_path> <destination_path>
//! ```
//!
//! Fields are separated by single ASCII spaces, so paths cannot contain
//! spaces. One trailing `\n` or `\r\n` is tolerated and stripped.
//!
//! ## Framing
//!
//! A request is whatever arrives in **one** read of at most
//! `server.read_buffer_size` bytes (1024 by default). There is no length prefix
//! and no reassembly across reads: a request split by the transport, or longer
//! than the buffer, is parsed as truncated. This is a known limitation of the
//! protocol, kept for compatibility with existing clients.
//!
//! ## Responses
//!
//! Plain ASCII, no trailing newline. After writing one response the server
//! closes the connection.
//!
//! | Bytes | Meaning |
//! |---|---|
//! | `OK` | photo resized, or nothing to do |
//! | `INVALID COMMAND GIVEN` | the first field is not `DOWN-RESOLUTE` |
//! | `MALFORMED COMMAND` | not UTF-8, wrong field count, or an empty path |
//! | `FILE DOES NOT EXIST` | source is missing or not a regular file |
//! | `UNREADABLE PHOTO` | container not recognized, or zero dimensions |
//! | `RESIZE FAILED` | the external tool failed (or the copy did) |

use crate::imaging::{BackendError, PlanError};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The only verb the service understands.
pub const VERB: &str = "DOWN-RESOLUTE";

/// A parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: String,
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
}

impl Command {
    pub fn down_resolute(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            verb: VERB.to_string(),
            source_path: source.into(),
            destination_path: destination.into(),
        }
    }

    /// Render the request exactly as it goes on the wire.
    pub fn to_wire(&self) -> String {
        format!(
            "{} {} {}",
            self.verb,
            self.source_path.display(),
            self.destination_path.display()
        )
    }
}

/// Every response the service can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Ok,
    InvalidCommand,
    MalformedCommand,
    FileDoesNotExist,
    UnreadablePhoto,
    ResizeFailed,
}

impl Response {
    pub fn as_str(self) -> &'static str {
        match self {
            Response::Ok => "OK",
            Response::InvalidCommand => "INVALID COMMAND GIVEN",
            Response::MalformedCommand => "MALFORMED COMMAND",
            Response::FileDoesNotExist => "FILE DOES NOT EXIST",
            Response::UnreadablePhoto => "UNREADABLE PHOTO",
            Response::ResizeFailed => "RESIZE FAILED",
        }
    }

    pub fn as_bytes(self) -> &'static [u8] {
        self.as_str().as_bytes()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request did not end in `OK`.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("malformed command: {0}")]
    MalformedCommand(String),
    #[error("unknown verb {0:?}")]
    UnknownVerb(String),
    #[error("source photo does not exist: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error("cannot read photo metadata: {0}")]
    MetadataUnreadable(#[source] BackendError),
    #[error("invalid photo dimensions: {0}")]
    InvalidDimensions(#[from] PlanError),
    #[error("resize failed: {0}")]
    ExternalToolFailure(#[source] BackendError),
}

impl RequestError {
    /// The response the client receives for this error.
    pub fn response(&self) -> Response {
        match self {
            RequestError::MalformedCommand(_) => Response::MalformedCommand,
            RequestError::UnknownVerb(_) => Response::InvalidCommand,
            RequestError::SourceNotFound(_) => Response::FileDoesNotExist,
            RequestError::MetadataUnreadable(_) | RequestError::InvalidDimensions(_) => {
                Response::UnreadablePhoto
            }
            RequestError::ExternalToolFailure(_) => Response::ResizeFailed,
        }
    }
}

/// Strip one trailing line terminator, if present.
fn trim_line_ending(text: &str) -> &str {
    text.strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text)
}

/// Parse one request from the bytes of a single read.
///
/// The verb is checked before the field count, so any unrecognized verb is
/// reported as such regardless of what follows it.
pub fn parse_command(bytes: &[u8]) -> Result<Command, RequestError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| RequestError::MalformedCommand("request is not valid UTF-8".into()))?;
    let text = trim_line_ending(text);

    let fields: Vec<&str> = text.split(' ').collect();
    let verb = fields[0];
    if verb != VERB {
        return Err(RequestError::UnknownVerb(verb.to_string()));
    }

    let [_, source, destination] = fields.as_slice() else {
        return Err(RequestError::MalformedCommand(format!(
            "expected 3 space-separated fields, got {}",
            fields.len()
        )));
    };
    if source.is_empty() || destination.is_empty() {
        return Err(RequestError::MalformedCommand("empty path field".into()));
    }

    Ok(Command::down_resolute(*source, *destination))
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // parse_command tests
    // =========================================================================

    #[test]
    fn parses_well_formed_request() {
        let command = parse_command(b"DOWN-RESOLUTE /photos/a.jpg /thumbs/a.jpg").unwrap();
        assert_eq!(command.verb, "DOWN-RESOLUTE");
        assert_eq!(command.source_path, PathBuf::from("/photos/a.jpg"));
        assert_eq!(command.destination_path, PathBuf::from("/thumbs/a.jpg"));
    }

    #[test]
    fn strips_one_trailing_newline() {
        let command = parse_command(b"DOWN-RESOLUTE a.jpg b.jpg\n").unwrap();
        assert_eq!(command.destination_path, PathBuf::from("b.jpg"));

        let command = parse_command(b"DOWN-RESOLUTE a.jpg b.jpg\r\n").unwrap();
        assert_eq!(command.destination_path, PathBuf::from("b.jpg"));
    }

    #[test]
    fn unknown_verb_is_rejected_before_field_count() {
        assert!(matches!(
            parse_command(b"SHRINK a.jpg b.jpg"),
            Err(RequestError::UnknownVerb(v)) if v == "SHRINK"
        ));
        assert!(matches!(
            parse_command(b"HELLO"),
            Err(RequestError::UnknownVerb(_))
        ));
    }

    #[test]
    fn verb_is_case_sensitive() {
        assert!(matches!(
            parse_command(b"down-resolute a.jpg b.jpg"),
            Err(RequestError::UnknownVerb(_))
        ));
    }

    #[test]
    fn verb_alone_is_malformed() {
        assert!(matches!(
            parse_command(b"DOWN-RESOLUTE"),
            Err(RequestError::MalformedCommand(_))
        ));
    }

    #[test]
    fn missing_destination_is_malformed() {
        assert!(matches!(
            parse_command(b"DOWN-RESOLUTE a.jpg"),
            Err(RequestError::MalformedCommand(_))
        ));
    }

    #[test]
    fn extra_fields_are_malformed() {
        assert!(matches!(
            parse_command(b"DOWN-RESOLUTE my photo.jpg out.jpg"),
            Err(RequestError::MalformedCommand(_))
        ));
    }

    #[test]
    fn double_space_yields_empty_path() {
        assert!(matches!(
            parse_command(b"DOWN-RESOLUTE  b.jpg"),
            Err(RequestError::MalformedCommand(_))
        ));
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        assert!(matches!(
            parse_command(&[0xff, 0xfe, b' ', b'a']),
            Err(RequestError::MalformedCommand(_))
        ));
    }

    // =========================================================================
    // Response bytes
    // =========================================================================

    #[test]
    fn legacy_response_bytes_are_exact() {
        assert_eq!(Response::Ok.as_bytes(), b"OK");
        assert_eq!(Response::InvalidCommand.as_bytes(), b"INVALID COMMAND GIVEN");
        assert_eq!(Response::FileDoesNotExist.as_bytes(), b"FILE DOES NOT EXIST");
    }

    #[test]
    fn error_responses_map_by_kind() {
        assert_eq!(
            RequestError::UnknownVerb("X".into()).response(),
            Response::InvalidCommand
        );
        assert_eq!(
            RequestError::SourceNotFound("/x".into()).response(),
            Response::FileDoesNotExist
        );
        assert_eq!(
            RequestError::InvalidDimensions(PlanError::ZeroThreshold).response(),
            Response::UnreadablePhoto
        );
        assert_eq!(
            RequestError::ExternalToolFailure(BackendError::Io(std::io::Error::other("x")))
                .response(),
            Response::ResizeFailed
        );
    }

    #[test]
    fn command_renders_wire_form() {
        let command = Command::down_resolute("/in/a.jpg", "/out/a.jpg");
        assert_eq!(command.to_wire(), "DOWN-RESOLUTE /in/a.jpg /out/a.jpg");
        assert_eq!(parse_command(command.to_wire().as_bytes()).unwrap(), command);
    }
}
