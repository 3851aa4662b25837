//! TCP listener implementation.
//!
//! # Responsibilities
//! - Bind to the configured address (`host:port` or `:port`)
//! - Accept incoming TCP connections and wrap them in a `ConnectionSlot`
//! - Report accept errors without tearing the listener down

use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::net::connection::ConnectionSlot;

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    /// Failed to accept connection.
    #[error("Failed to accept: {0}")]
    Accept(#[source] std::io::Error),
}

/// Expand `:port` to an all-interfaces address.
pub fn resolve_bind_address(address: &str) -> String {
    if address.starts_with(':') {
        format!("0.0.0.0{address}")
    } else {
        address.to_string()
    }
}

/// Accepting side of the proxy.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Bind to `address`.
    pub async fn bind(address: &str) -> Result<Self, ListenerError> {
        let resolved = resolve_bind_address(address);
        let listener = TcpListener::bind(&resolved)
            .await
            .map_err(|source| ListenerError::Bind {
                address: resolved.clone(),
                source,
            })?;

        let local_addr = listener.local_addr().map_err(|source| ListenerError::Bind {
            address: resolved,
            source,
        })?;

        tracing::info!(address = %local_addr, "Listener bound");

        Ok(Self { inner: listener })
    }

    /// Accept a new connection.
    pub async fn accept(&self) -> Result<ConnectionSlot, ListenerError> {
        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;
        let slot = ConnectionSlot::new(stream, addr);

        tracing::debug!(
            connection_id = %slot.id(),
            peer_addr = %addr,
            "Connection accepted"
        );

        Ok(slot)
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_port_only_address() {
        assert_eq!(resolve_bind_address(":8080"), "0.0.0.0:8080");
        assert_eq!(resolve_bind_address("127.0.0.1:8080"), "127.0.0.1:8080");
    }

    #[tokio::test]
    async fn bind_and_accept() {
        let listener = Listener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = tokio::spawn(async move { tokio::net::TcpStream::connect(addr).await.unwrap() });
        let slot = listener.accept().await.unwrap();
        let client = client.await.unwrap();

        assert_eq!(slot.peer_addr(), client.local_addr().unwrap());
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let first = Listener::bind("127.0.0.1:0").await.unwrap();
        let taken = first.local_addr().unwrap().to_string();

        let err = Listener::bind(&taken).await.unwrap_err();
        assert!(matches!(err, ListenerError::Bind { .. }));
    }
}
