//! Request interception subsystem.
//!
//! # Data Flow
//! ```text
//! (ParsedRequest, RawMessage) from the reader
//!     → Interceptor::intercept (may rewrite the raw bytes in place)
//!     → engine re-derives ParsedRequest from the raw bytes
//!     → Forwarder
//! ```
//!
//! # Design Decisions
//! - Interceptors are injected strategy objects, swappable without touching
//!   the engine
//! - Only raw bytes are forwarded; changes must be made to `RawMessage`
//! - An interceptor may take arbitrarily long; only its dispatch worker waits

pub mod logger;
pub mod rewrite;

use async_trait::async_trait;
use std::sync::Arc;

use crate::http::{ParsedRequest, RawMessage};

pub use logger::RequestLogger;
pub use rewrite::HeaderRewriter;

/// Observe and optionally mutate a request before it is forwarded.
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn intercept(&self, request: &ParsedRequest, raw: &mut RawMessage);
}

/// Forwards every request unmodified.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

#[async_trait]
impl Interceptor for PassThrough {
    async fn intercept(&self, _request: &ParsedRequest, _raw: &mut RawMessage) {}
}

/// Adapts a plain function or closure into an [`Interceptor`].
pub struct FnInterceptor<F> {
    f: F,
}

/// Wrap a synchronous callback.
pub fn from_fn<F>(f: F) -> FnInterceptor<F>
where
    F: Fn(&ParsedRequest, &mut RawMessage) + Send + Sync,
{
    FnInterceptor { f }
}

#[async_trait]
impl<F> Interceptor for FnInterceptor<F>
where
    F: Fn(&ParsedRequest, &mut RawMessage) + Send + Sync,
{
    async fn intercept(&self, request: &ParsedRequest, raw: &mut RawMessage) {
        (self.f)(request, raw)
    }
}

/// Runs interceptors in order, re-deriving the request between steps.
#[derive(Clone, Default)]
pub struct Chain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

#[async_trait]
impl Interceptor for Chain {
    async fn intercept(&self, request: &ParsedRequest, raw: &mut RawMessage) {
        let mut current = request.clone();
        for (i, interceptor) in self.interceptors.iter().enumerate() {
            interceptor.intercept(&current, raw).await;
            if i + 1 == self.interceptors.len() {
                break;
            }
            match ParsedRequest::from_raw(raw) {
                Ok(next) => current = next,
                Err(e) => {
                    // The engine reports the failure when it re-derives.
                    tracing::warn!(error = %e, step = i, "Interceptor left an unparseable request, stopping chain");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(raw: &RawMessage) -> ParsedRequest {
        ParsedRequest::from_raw(raw).unwrap()
    }

    #[tokio::test]
    async fn pass_through_leaves_bytes() {
        let mut raw = RawMessage::from(&b"GET / HTTP/1.1\r\nHost: a\r\n\r\n"[..]);
        let before = raw.clone();
        PassThrough.intercept(&request(&raw), &mut raw).await;
        assert_eq!(raw, before);
    }

    #[tokio::test]
    async fn fn_interceptor_mutates() {
        let mut raw = RawMessage::from(&b"GET /old HTTP/1.1\r\n\r\n"[..]);
        let rewrite = from_fn(|_req: &ParsedRequest, raw: &mut RawMessage| {
            *raw.bytes_mut() = b"GET /new HTTP/1.1\r\n\r\n".to_vec();
        });
        rewrite.intercept(&request(&raw), &mut raw).await;
        assert_eq!(request(&raw).target(), "/new");
    }

    #[tokio::test]
    async fn chain_feeds_rederived_request() {
        let mut raw = RawMessage::from(&b"GET /old HTTP/1.1\r\n\r\n"[..]);
        let chain = Chain::new()
            .with(Arc::new(from_fn(|_: &ParsedRequest, raw: &mut RawMessage| {
                *raw.bytes_mut() = b"GET /new HTTP/1.1\r\n\r\n".to_vec();
            })))
            .with(Arc::new(from_fn(|req: &ParsedRequest, _: &mut RawMessage| {
                assert_eq!(req.target(), "/new");
            })));
        assert_eq!(chain.len(), 2);

        let original = request(&raw);
        chain.intercept(&original, &mut raw).await;
        assert_eq!(request(&raw).target(), "/new");
    }
}
