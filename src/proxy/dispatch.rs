//! Per-connection processing.
//!
//! # Responsibilities
//! - Read one request under the per-connection read deadline
//! - Run the interceptor, then re-derive the request from the raw bytes
//! - Hand the raw bytes to the forwarder and close the connection
//!
//! # Design Decisions
//! - Every failure is fatal to its connection only
//! - No synthesized response on failure; the socket is closed

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::BufReader;
use tracing::Instrument;
use uuid::Uuid;

use crate::forward::{ForwardError, Forwarder};
use crate::http::{Method, ParseError, ParsedRequest, RequestReader};
use crate::intercept::Interceptor;
use crate::lifecycle::ShutdownListener;
use crate::net::{AdmissionReceiver, ConnectionSlot, ConnectionTracker};
use crate::observability::metrics;

/// Why a dispatched connection was closed without completing.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("request not received within {0:?}")]
    ReadTimeout(Duration),

    #[error("intercepted request no longer parses: {0}")]
    MessageReconstruction(#[source] ParseError),

    #[error("forwarding failed: {0}")]
    Forward(#[from] ForwardError),
}

impl ConnectionError {
    pub fn kind(&self) -> &'static str {
        match self {
            ConnectionError::Parse(e) => e.kind(),
            ConnectionError::ReadTimeout(_) => "read_timeout",
            ConnectionError::MessageReconstruction(_) => "message_reconstruction",
            ConnectionError::Forward(_) => "forward",
        }
    }
}

/// Everything a dispatch worker needs to process a connection.
pub(crate) struct Dispatcher {
    pub(crate) reader: RequestReader,
    pub(crate) interceptor: Arc<dyn Interceptor>,
    pub(crate) forwarder: Arc<dyn Forwarder>,
    pub(crate) read_timeout: Duration,
    pub(crate) tracker: ConnectionTracker,
}

impl Dispatcher {
    /// Process one connection; the socket is closed when this returns.
    pub(crate) async fn handle(&self, slot: ConnectionSlot) {
        let connection_id = slot.id();
        let span = tracing::info_span!(
            "connection",
            connection_id = %connection_id,
            request_id = %Uuid::new_v4(),
            peer_addr = %slot.peer_addr(),
        );

        async move {
            let _guard = self.tracker.track(connection_id);
            let started = Instant::now();
            tracing::debug!(queued_ms = slot.age().as_millis() as u64, "Dispatching connection");

            match self.process(slot).await {
                Ok(method) => {
                    metrics::record_request(method.as_str(), "forwarded", started.elapsed());
                    tracing::info!(
                        method = %method,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Request completed"
                    );
                }
                Err(e) => {
                    metrics::record_failure(e.kind());
                    match &e {
                        ConnectionError::Forward(_) => tracing::error!(error = %e, "Request failed"),
                        _ => tracing::warn!(error = %e, kind = e.kind(), "Request rejected, closing connection"),
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn process(&self, slot: ConnectionSlot) -> Result<Method, ConnectionError> {
        let mut reader = BufReader::new(slot.into_stream());

        let (mut raw, request) = tokio::time::timeout(self.read_timeout, self.reader.read_request(&mut reader))
            .await
            .map_err(|_| ConnectionError::ReadTimeout(self.read_timeout))??;

        self.interceptor.intercept(&request, &mut raw).await;
        let request = ParsedRequest::from_raw(&raw).map_err(ConnectionError::MessageReconstruction)?;

        let mut stream = reader.into_inner();
        self.forwarder.forward(&request, &raw, &mut stream).await?;
        Ok(request.method())
    }
}

/// Drain the admission queue until shutdown or until the queue closes.
pub(crate) async fn dispatch_loop(
    worker: usize,
    receiver: AdmissionReceiver,
    dispatcher: Arc<Dispatcher>,
    mut shutdown: ShutdownListener,
) {
    tracing::debug!(worker, "Dispatch worker started");
    loop {
        let slot = tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            slot = receiver.recv() => match slot {
                Some(slot) => slot,
                None => break,
            },
        };
        metrics::record_queue_depth(receiver.pending());

        tokio::select! {
            biased;
            _ = shutdown.recv() => {
                tracing::info!(worker, "Shutdown interrupted an in-flight connection");
                break;
            }
            _ = dispatcher.handle(slot) => {}
        }
    }
    tracing::debug!(worker, "Dispatch worker stopped");
}
