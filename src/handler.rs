//! Per-connection handler: exactly one request/response cycle, then close.
//!
//! ```text
//! AwaitingRequest → Parsing → Validating → Processing → Responding → Closed
//! ```
//!
//! Any stage can jump straight to `Closed`. Stages up to `Parsing` run on the
//! connection's task. `Validating` and planning run inside
//! [`Pipeline::prepare`] on the blocking pool; the resize tool itself is
//! awaited back on the connection's task through [`Pipeline::complete`], so
//! aborting the task kills the tool. Whatever happens, the stream is shut down
//! once, in [`handle_connection`], and then dropped.
//!
//! No response is written when the read fails, the peer sends nothing, the
//! server begins shutting down before a request arrives, or the pipeline
//! panics. Every other path writes exactly one [`Response`].

use crate::imaging::ImageBackend;
use crate::pipeline::Pipeline;
use crate::protocol::{RequestError, Response, parse_command};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AwaitingRequest,
    Parsing,
    Validating,
    Processing,
    Responding,
    Closed,
}

impl RequestError {
    /// The stage in which this error ends a request.
    pub fn stage(&self) -> Stage {
        match self {
            RequestError::MalformedCommand(_) | RequestError::UnknownVerb(_) => Stage::Parsing,
            RequestError::SourceNotFound(_) => Stage::Validating,
            _ => Stage::Processing,
        }
    }
}

/// What happened on a connection, reported once it is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOutcome {
    /// The response written, if any.
    pub response: Option<Response>,
    /// The stage that decided the response (or the abort).
    pub decided_at: Stage,
}

/// Resolve once the shutdown flag is raised. Never resolves if the sender is
/// dropped without raising it.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        let raised = *shutdown.borrow_and_update();
        if raised {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Serve one request on `stream`, then close it.
pub async fn handle_connection<S, B>(
    mut stream: S,
    pipeline: Arc<Pipeline<B>>,
    read_buffer_size: usize,
    mut shutdown: watch::Receiver<bool>,
) -> ConnectionOutcome
where
    S: AsyncRead + AsyncWrite + Unpin,
    B: ImageBackend + 'static,
{
    let (decided_at, response) =
        exchange(&mut stream, pipeline, read_buffer_size, &mut shutdown).await;

    if let Some(response) = response {
        debug!(stage = ?Stage::Responding, %response);
        if let Err(err) = stream.write_all(response.as_bytes()).await {
            warn!(%err, "failed to write response");
        }
    }

    if let Err(err) = stream.shutdown().await {
        debug!(%err, "connection shutdown failed");
    }
    drop(stream);
    debug!(stage = ?Stage::Closed, from = ?decided_at, "connection closed");

    ConnectionOutcome {
        response,
        decided_at,
    }
}

/// Read, parse, and process one request. Returns the deciding stage and the
/// response to send, if any.
async fn exchange<S, B>(
    stream: &mut S,
    pipeline: Arc<Pipeline<B>>,
    read_buffer_size: usize,
    shutdown: &mut watch::Receiver<bool>,
) -> (Stage, Option<Response>)
where
    S: AsyncRead + Unpin,
    B: ImageBackend + 'static,
{
    let mut buffer = vec![0u8; read_buffer_size];
    let read = tokio::select! {
        read = stream.read(&mut buffer) => read,
        () = cancelled(shutdown) => {
            debug!("shutdown began before a request arrived");
            return (Stage::AwaitingRequest, None);
        }
    };

    let len = match read {
        Ok(0) => {
            debug!("peer closed without sending a request");
            return (Stage::AwaitingRequest, None);
        }
        Ok(len) => len,
        Err(err) => {
            warn!(%err, "failed to read request");
            return (Stage::AwaitingRequest, None);
        }
    };

    let command = match parse_command(&buffer[..len]) {
        Ok(command) => command,
        Err(err) => {
            warn!(%err, "rejecting request");
            return (err.stage(), Some(err.response()));
        }
    };
    info!(
        source = %command.source_path.display(),
        destination = %command.destination_path.display(),
        "processing request"
    );

    let prepared = {
        let pipeline = Arc::clone(&pipeline);
        tokio::task::spawn_blocking(move || pipeline.prepare(&command)).await
    };
    let result = match prepared {
        Ok(Ok(step)) => pipeline.complete(step).await,
        Ok(Err(err)) => Err(err),
        Err(err) => {
            error!(%err, "request pipeline panicked");
            return (Stage::Processing, None);
        }
    };

    match result {
        Ok(outcome) => {
            info!(?outcome, "request completed");
            (Stage::Processing, Some(Response::Ok))
        }
        Err(err) => {
            warn!(%err, "request failed");
            (err.stage(), Some(err.response()))
        }
    }
}
