//! # imgproc
//!
//! A small TCP service that downscales photos on request. A client connects,
//! sends one line, and gets one fixed response back:
//!
//! ```text
//! → DOWN-RESOLUTE /photos/cat.jpg /thumbs/cat.jpg
//! ← OK
//! ```
//!
//! Photos wider than the configured maximum (500px by default) are handed to an
//! external tool (`ffmpeg` by default) which writes a copy exactly that wide,
//! keeping the aspect ratio. Narrower photos are left alone.
//!
//! # Architecture: One Connection, One Request
//!
//! ```text
//! Server::run       accept loop, one task per connection
//!   handle_connection   read → parse → prepare → complete → respond → close
//!     Pipeline::prepare     exists? → identify → plan   (blocking pool)
//!     Pipeline::complete    resize                      (external tool)
//!       ImageBackend          header read + external tool
//! ```
//!
//! Header reads run on tokio's blocking pool and the tool is awaited as a
//! child process, so a slow resize never stalls the accept loop or other
//! connections. Aborting a connection kills its tool.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`server`] | Binds the listener, accepts connections, coordinates graceful shutdown |
//! | [`handler`] | Per-connection state machine: one read, one response, one close |
//! | [`protocol`] | Request parsing, the `Command` type, fixed `Response` strings |
//! | [`pipeline`] | Validate → identify → plan → resize for a parsed command |
//! | [`imaging`] | Dimension planning, header-only metadata, the external tool backend |
//! | [`config`] | `imgproc.toml` loading, environment and flag overrides, validation |
//! | [`client`] | One-shot client used by the `send` command |
//! | [`output`] | CLI output formatting for `plan` and `send` |
//!
//! # Design Decisions
//!
//! ## Single-Read Framing
//!
//! A request is whatever arrives in the first read of at most
//! `read_buffer_size` bytes (1024 by default). There is no length prefix and no
//! delimiter scan. Clients that split a request across TCP segments, or paths
//! long enough to overflow the buffer, get `MALFORMED COMMAND`. Existing
//! clients depend on this framing, so it is kept and documented rather than
//! replaced by line reading.
//!
//! ## Stored Pixel Width
//!
//! "Width" is the width stored in the image header. EXIF orientation is
//! ignored: a portrait photo shot sideways is planned on its stored landscape
//! width, and the tool receives the stored-orientation target.
//!
//! ## Rounding
//!
//! The planned height is `height × max / width` rounded half away from zero
//! and never less than one pixel. A 1000×1333 photo becomes 500×667.
//!
//! ## Graceful Shutdown
//!
//! SIGINT or SIGTERM stops the accept loop and closes the listener. Connections
//! still waiting for their request are closed without a response; requests
//! already being processed get a grace period to finish and answer; after
//! that they are aborted and their resize tool is killed.

pub mod client;
pub mod config;
pub mod handler;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod protocol;
pub mod server;
