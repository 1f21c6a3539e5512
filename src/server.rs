//! TCP listener, accept loop, and shutdown coordination.
//!
//! [`Server::bind`] fails fast: if the address cannot be bound the error is
//! returned to the caller and nothing else starts. [`Server::run`] accepts
//! connections until its shutdown future resolves, handing each one to
//! [`handle_connection`] on its own task. Accept errors (such as running out
//! of file descriptors) are logged and the loop pauses for
//! [`ACCEPT_ERROR_BACKOFF`] before accepting again.
//!
//! ## Shutdown
//!
//! 1. The shutdown future resolves (see [`shutdown_signal`] for SIGINT/SIGTERM).
//! 2. The accept loop exits and the listener is dropped, closing the socket.
//! 3. The cancellation flag is raised on a `watch` channel shared with every
//!    handler; handlers still waiting for their request close immediately.
//! 4. In-flight handlers get `shutdown_grace` to finish; stragglers are aborted,
//!    which kills any resize tool they are still waiting on.
//! 5. `run` returns `Ok(())`.

use crate::config::ServerConfig;
use crate::handler::{ConnectionOutcome, handle_connection};
use crate::imaging::ImageBackend;
use crate::pipeline::Pipeline;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Pause after a failed `accept` so a persistent error does not spin the loop.
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A bound, not yet running, service.
pub struct Server<B> {
    listener: TcpListener,
    pipeline: Arc<Pipeline<B>>,
    read_buffer_size: usize,
    shutdown_grace: Duration,
}

impl<B: ImageBackend + 'static> Server<B> {
    /// Bind the listening socket described by `config`.
    pub async fn bind(config: &ServerConfig, pipeline: Pipeline<B>) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.address.as_str())
            .await
            .map_err(|source| ServerError::Bind {
                address: config.address.clone(),
                source,
            })?;

        Ok(Self {
            listener,
            pipeline: Arc::new(pipeline),
            read_buffer_size: config.read_buffer_size,
            shutdown_grace: config.shutdown_grace(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` resolves, then drain and return.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<(), ServerError> {
        let Server {
            listener,
            pipeline,
            read_buffer_size,
            shutdown_grace,
        } = self;
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let mut connections: JoinSet<ConnectionOutcome> = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let span = info_span!("connection", %peer);
                        connections.spawn(
                            handle_connection(
                                stream,
                                Arc::clone(&pipeline),
                                read_buffer_size,
                                cancel_rx.clone(),
                            )
                            .instrument(span),
                        );
                    }
                    Err(err) => back_off_after_accept_error(&err).await,
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    report(joined);
                }
            }
        }

        drop(listener);
        info!(
            in_flight = connections.len(),
            "listener closed, draining connections"
        );
        // Receivers only go away with their handlers; a send error means none are left.
        let _ = cancel_tx.send(true);

        let drain = async {
            while let Some(joined) = connections.join_next().await {
                report(joined);
            }
        };
        if tokio::time::timeout(shutdown_grace, drain).await.is_err() {
            warn!(
                remaining = connections.len(),
                grace_secs = shutdown_grace.as_secs_f64(),
                "grace period elapsed, aborting remaining connections"
            );
            connections.shutdown().await;
        }

        info!("server stopped");
        Ok(())
    }
}

async fn back_off_after_accept_error(err: &std::io::Error) {
    warn!(
        %err,
        backoff_ms = ACCEPT_ERROR_BACKOFF.as_millis() as u64,
        "failed to accept connection"
    );
    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
}

fn report(joined: Result<ConnectionOutcome, JoinError>) {
    match joined {
        Ok(outcome) => debug!(?outcome, "connection task finished"),
        Err(err) if err.is_cancelled() => debug!("connection task aborted"),
        Err(err) => error!(%err, "connection task panicked"),
    }
}

/// Resolve on SIGINT (Ctrl-C) or, on Unix, SIGTERM.
///
/// If a handler cannot be installed that signal is logged and ignored rather
/// than triggering an immediate shutdown.
pub async fn shutdown_signal() {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(%err, "cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(%err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => info!("detected SIGINT"),
        () = terminate => info!("detected SIGTERM"),
    }
}
