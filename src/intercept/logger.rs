//! Logs every intercepted request.

use async_trait::async_trait;

use super::Interceptor;
use crate::http::{ParsedRequest, RawMessage};

/// Emits the parsed request at `info` and the raw bytes at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogger;

#[async_trait]
impl Interceptor for RequestLogger {
    async fn intercept(&self, request: &ParsedRequest, raw: &mut RawMessage) {
        tracing::info!(
            method = %request.method(),
            target = %request.target(),
            version = %request.version(),
            host = request.host().unwrap_or("-"),
            headers = request.headers().len(),
            body_length = request.body_length(),
            "Intercepted request"
        );
        tracing::debug!(raw = %raw, "Raw request");
    }
}
