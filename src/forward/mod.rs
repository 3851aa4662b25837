//! Forwarding of intercepted requests.
//!
//! # Responsibilities
//! - Resolve the upstream from an absolute-form target or the `Host` header
//! - Write the raw request bytes upstream, unchanged
//! - Relay the upstream response back to the client
//!
//! # Design Decisions
//! - Only the raw bytes are sent; the parsed view is used for routing only
//! - The relay ends when upstream closes or goes idle for the read timeout
//! - Plain HTTP only; `https` targets are rejected

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use url::Url;

use crate::http::{ParsedRequest, RawMessage};

/// Error type for forwarding.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("request has neither an absolute target nor a Host header")]
    NoUpstream,

    #[error("cannot forward to {0:?}")]
    InvalidUpstream(String),

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("connect to {authority} failed: {source}")]
    Connect {
        authority: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connect to {0} timed out")]
    ConnectTimeout(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Delivers a (possibly rewritten) request and answers the client.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(
        &self,
        request: &ParsedRequest,
        raw: &RawMessage,
        client: &mut TcpStream,
    ) -> Result<(), ForwardError>;
}

/// Drops every request; the client connection is simply closed.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardForwarder;

#[async_trait]
impl Forwarder for DiscardForwarder {
    async fn forward(
        &self,
        request: &ParsedRequest,
        raw: &RawMessage,
        _client: &mut TcpStream,
    ) -> Result<(), ForwardError> {
        tracing::debug!(
            target = %request.target(),
            bytes = raw.len(),
            "Forwarding disabled, request discarded"
        );
        Ok(())
    }
}

/// Forwards to the origin named by the request over plain TCP.
#[derive(Debug, Clone)]
pub struct UpstreamForwarder {
    connect_timeout: Duration,
    idle_timeout: Duration,
}

impl UpstreamForwarder {
    pub fn new(connect_timeout: Duration, idle_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            idle_timeout,
        }
    }

    async fn connect(&self, authority: &str) -> Result<TcpStream, ForwardError> {
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(authority)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(source)) => Err(ForwardError::Connect {
                authority: authority.to_string(),
                source,
            }),
            Err(_) => Err(ForwardError::ConnectTimeout(authority.to_string())),
        }
    }

    /// Copy upstream to client until EOF or an idle period.
    async fn relay(&self, upstream: &mut TcpStream, client: &mut TcpStream) -> Result<u64, ForwardError> {
        let mut buf = vec![0u8; 16 * 1024];
        let mut total = 0u64;
        loop {
            let n = match tokio::time::timeout(self.idle_timeout, upstream.read(&mut buf)).await {
                Ok(read) => read?,
                Err(_) => {
                    tracing::debug!(bytes = total, "Upstream idle, ending relay");
                    break;
                }
            };
            if n == 0 {
                break;
            }
            client.write_all(&buf[..n]).await?;
            total += n as u64;
        }
        client.flush().await?;
        Ok(total)
    }
}

#[async_trait]
impl Forwarder for UpstreamForwarder {
    async fn forward(
        &self,
        request: &ParsedRequest,
        raw: &RawMessage,
        client: &mut TcpStream,
    ) -> Result<(), ForwardError> {
        let authority = upstream_authority(request)?;
        let mut upstream = self.connect(&authority).await?;

        upstream.write_all(raw.as_bytes()).await?;
        upstream.flush().await?;

        let relayed = self.relay(&mut upstream, client).await?;
        tracing::debug!(upstream = %authority, sent = raw.len(), relayed, "Request forwarded");
        Ok(())
    }
}

/// `host:port` to connect to for `request`.
///
/// An absolute-form `http://` target wins over the `Host` header; port 80 is
/// assumed when none is given.
pub fn upstream_authority(request: &ParsedRequest) -> Result<String, ForwardError> {
    let target = request.target();
    if target.contains("://") {
        let url = Url::parse(target).map_err(|_| ForwardError::InvalidUpstream(target.to_string()))?;
        if url.scheme() != "http" {
            return Err(ForwardError::UnsupportedScheme(url.scheme().to_string()));
        }
        return authority_of(&url).ok_or_else(|| ForwardError::InvalidUpstream(target.to_string()));
    }

    let host = request.host().filter(|h| !h.is_empty()).ok_or(ForwardError::NoUpstream)?;
    let url = Url::parse(&format!("http://{host}/"))
        .map_err(|_| ForwardError::InvalidUpstream(host.to_string()))?;
    authority_of(&url).ok_or_else(|| ForwardError::InvalidUpstream(host.to_string()))
}

fn authority_of(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let port = url.port_or_known_default()?;
    Some(format!("{host}:{port}"))
}
