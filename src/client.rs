//! Minimal client for the `send` command and for tests.

use crate::protocol::Command;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Send one request to `address` and return the raw response text.
///
/// The server closes the connection after responding, so the response is
/// everything read until EOF. An empty string means the server closed without
/// answering.
pub async fn send_request(address: &str, command: &Command) -> std::io::Result<String> {
    let mut stream = TcpStream::connect(address).await?;
    stream.write_all(command.to_wire().as_bytes()).await?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    Ok(String::from_utf8_lossy(&response).into_owned())
}
