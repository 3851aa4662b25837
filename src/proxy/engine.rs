//! Proxy engine: listener, admission queue, accept loop and dispatch workers.
//!
//! # Responsibilities
//! - Drive the lifecycle `Created → Initialized → Serving → Stopped`
//! - Run the accept loop, admitting connections without ever blocking
//! - Run the dispatch workers that parse, intercept and forward
//!
//! # Design Decisions
//! - Lifecycle state is a shared atomic, shutdown a broadcast signal
//! - Both loops race their blocking waits against shutdown, so `stop()`
//!   does not wait for the next connection to arrive
//! - Only initialization and bind failures are returned from `serve()`

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::ProxyConfig;
use crate::forward::{Forwarder, UpstreamForwarder};
use crate::http::{ReaderOptions, RequestReader};
use crate::intercept::{Interceptor, PassThrough};
use crate::lifecycle::{Shutdown, ShutdownListener};
use crate::net::{
    admission_queue, AdmissionError, AdmissionQueue, AdmissionReceiver, ConnectionTracker, Listener,
    ListenerError,
};
use crate::observability::metrics;
use crate::proxy::dispatch::{dispatch_loop, Dispatcher};

/// Lifecycle state of the engine.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Created = 0,
    Initialized = 1,
    Serving = 2,
    Stopped = 3,
}

impl From<u8> for EngineState {
    fn from(val: u8) -> Self {
        match val {
            1 => EngineState::Initialized,
            2 => EngineState::Serving,
            3 => EngineState::Stopped,
            _ => EngineState::Created,
        }
    }
}

/// Errors surfaced to the caller of [`ProxyServer::serve`].
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("proxy not initialized")]
    NotInitialized,

    #[error("proxy already started")]
    AlreadyStarted,

    #[error(transparent)]
    Bind(#[from] ListenerError),
}

/// The intercepting proxy.
pub struct ProxyServer {
    config: ProxyConfig,
    state: Arc<AtomicU8>,
    queue: Option<(AdmissionQueue, AdmissionReceiver)>,
    interceptor: Arc<dyn Interceptor>,
    forwarder: Arc<dyn Forwarder>,
    shutdown: Shutdown,
}

impl ProxyServer {
    /// Create an engine in the `Created` state.
    ///
    /// Requests pass through unmodified and are forwarded upstream until
    /// another interceptor or forwarder is installed.
    pub fn new(config: ProxyConfig) -> Self {
        let forwarder = UpstreamForwarder::new(
            Duration::from_secs(config.timeouts.connect_secs),
            Duration::from_secs(config.timeouts.read_secs),
        );
        Self {
            config,
            state: Arc::new(AtomicU8::new(EngineState::Created as u8)),
            queue: None,
            interceptor: Arc::new(PassThrough),
            forwarder: Arc::new(forwarder),
            shutdown: Shutdown::new(),
        }
    }

    /// Allocate the admission queue. Calling it again is a no-op.
    pub fn init(&mut self) {
        if self.state() != EngineState::Created {
            return;
        }
        self.queue = Some(admission_queue(self.config.listener.queue_capacity));
        self.state.store(EngineState::Initialized as u8, Ordering::SeqCst);
        tracing::debug!(
            queue_capacity = self.config.listener.queue_capacity,
            "Proxy initialized"
        );
    }

    pub fn set_interceptor(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptor = interceptor;
    }

    pub fn set_forwarder(&mut self, forwarder: Arc<dyn Forwarder>) {
        self.forwarder = forwarder;
    }

    pub fn state(&self) -> EngineState {
        self.state.load(Ordering::SeqCst).into()
    }

    /// Bind the listener and start the accept loop and dispatch workers.
    pub async fn serve(&mut self) -> Result<ServerHandle, ProxyError> {
        match self.state() {
            EngineState::Created => return Err(ProxyError::NotInitialized),
            EngineState::Initialized => {}
            EngineState::Serving | EngineState::Stopped => return Err(ProxyError::AlreadyStarted),
        }

        let listener = Listener::bind(&self.config.listener.bind_address).await?;
        let local_addr = listener.local_addr().map_err(|source| ListenerError::Bind {
            address: self.config.listener.bind_address.clone(),
            source,
        })?;
        let (queue, receiver) = self.queue.take().ok_or(ProxyError::NotInitialized)?;

        self.state.store(EngineState::Serving as u8, Ordering::SeqCst);

        let tracker = ConnectionTracker::new();
        let dispatcher = Arc::new(Dispatcher {
            reader: RequestReader::new(ReaderOptions::from_config(&self.config.limits, &self.config.parser)),
            interceptor: Arc::clone(&self.interceptor),
            forwarder: Arc::clone(&self.forwarder),
            read_timeout: Duration::from_secs(self.config.timeouts.read_secs),
            tracker: tracker.clone(),
        });

        let workers = self.config.listener.dispatch_workers;
        let mut tasks = Vec::with_capacity(workers + 1);
        for worker in 0..workers {
            tasks.push(tokio::spawn(dispatch_loop(
                worker,
                receiver.clone(),
                Arc::clone(&dispatcher),
                self.shutdown.subscribe(),
            )));
        }
        tasks.push(tokio::spawn(accept_loop(listener, queue, self.shutdown.subscribe())));

        tracing::info!(
            address = %local_addr,
            queue_capacity = self.config.listener.queue_capacity,
            dispatch_workers = workers,
            "Proxy serving"
        );

        Ok(ServerHandle {
            local_addr,
            state: Arc::clone(&self.state),
            shutdown: self.shutdown.clone(),
            tracker,
            tasks,
        })
    }
}

/// Handle to a serving proxy.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    state: Arc<AtomicU8>,
    shutdown: Shutdown,
    tracker: ConnectionTracker,
    tasks: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> EngineState {
        self.state.load(Ordering::SeqCst).into()
    }

    /// Connections currently held by dispatch workers.
    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Signal shutdown and wait for every loop to exit.
    ///
    /// Connections still being processed are closed without a response.
    pub async fn stop(self) {
        let in_flight = self.active_connections();
        if in_flight > 0 {
            tracing::warn!(in_flight, "Stopping with connections in flight");
        }
        self.shutdown.trigger();
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Proxy task failed");
            }
        }
        self.state.store(EngineState::Stopped as u8, Ordering::SeqCst);
        tracing::info!("Proxy stopped");
    }
}

/// Accept connections and admit them to the queue until shutdown.
async fn accept_loop(listener: Listener, queue: AdmissionQueue, mut shutdown: ShutdownListener) {
    loop {
        let accepted = tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok(slot) => {
                metrics::record_accepted();
                let connection_id = slot.id();
                let peer_addr = slot.peer_addr();
                match queue.try_admit(slot) {
                    Ok(()) => metrics::record_queue_depth(queue.pending()),
                    Err(e) => {
                        metrics::record_rejected(match e {
                            AdmissionError::QueueFull => "queue_full",
                            AdmissionError::Closed => "queue_closed",
                        });
                        tracing::warn!(
                            connection_id = %connection_id,
                            peer_addr = %peer_addr,
                            capacity = queue.capacity(),
                            error = %e,
                            "Connection rejected"
                        );
                    }
                }
            }
            Err(e) => {
                metrics::record_accept_error();
                tracing::error!(error = %e, "Accept failed");
                // Persistent errors such as EMFILE would otherwise spin.
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
    tracing::info!("Accept loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        config
    }

    #[test]
    fn state_from_u8() {
        assert_eq!(EngineState::from(0), EngineState::Created);
        assert_eq!(EngineState::from(2), EngineState::Serving);
        assert_eq!(EngineState::from(42), EngineState::Created);
    }

    #[tokio::test]
    async fn serve_requires_init() {
        let mut server = ProxyServer::new(local_config());
        assert_eq!(server.state(), EngineState::Created);
        assert!(matches!(server.serve().await, Err(ProxyError::NotInitialized)));
    }

    #[tokio::test]
    async fn lifecycle_transitions() {
        let mut server = ProxyServer::new(local_config());
        server.init();
        assert_eq!(server.state(), EngineState::Initialized);

        let handle = server.serve().await.unwrap();
        assert_eq!(server.state(), EngineState::Serving);
        assert_eq!(handle.state(), EngineState::Serving);
        assert!(matches!(server.serve().await, Err(ProxyError::AlreadyStarted)));

        tokio::time::timeout(Duration::from_secs(5), handle.stop())
            .await
            .unwrap();
        assert_eq!(server.state(), EngineState::Stopped);
    }

    #[tokio::test]
    async fn bind_failure_keeps_initialized_state() {
        let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = ProxyConfig::default();
        config.listener.bind_address = occupied.local_addr().unwrap().to_string();

        let mut server = ProxyServer::new(config);
        server.init();
        assert!(matches!(server.serve().await, Err(ProxyError::Bind(_))));
        assert_eq!(server.state(), EngineState::Initialized);
    }
}
