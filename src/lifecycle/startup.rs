//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn the `[interception]` section into an interceptor chain
//! - Turn the `[forwarding]` and `[timeouts]` sections into a forwarder
//! - Assemble a `ProxyServer` ready for `init()`
//!
//! # Design Decisions
//! - Fail fast: configuration is validated before anything is built
//! - Logging runs before rewriting, so logs show what the client sent

use std::sync::Arc;
use std::time::Duration;

use crate::config::{validate_config, ConfigError, ProxyConfig};
use crate::forward::{DiscardForwarder, Forwarder, UpstreamForwarder};
use crate::intercept::{Chain, HeaderRewriter, Interceptor, PassThrough, RequestLogger};
use crate::proxy::ProxyServer;

/// Interceptor described by `config.interception`.
pub fn build_interceptor(config: &ProxyConfig) -> Arc<dyn Interceptor> {
    let mut chain = Chain::new();
    if config.interception.log_requests {
        chain = chain.with(Arc::new(RequestLogger));
    }
    let rewriter = HeaderRewriter::from_config(&config.interception);
    if !rewriter.is_empty() {
        chain = chain.with(Arc::new(rewriter));
    }

    if chain.is_empty() {
        Arc::new(PassThrough)
    } else {
        Arc::new(chain)
    }
}

/// Forwarder described by `config.forwarding`.
pub fn build_forwarder(config: &ProxyConfig) -> Arc<dyn Forwarder> {
    if !config.forwarding.enabled {
        return Arc::new(DiscardForwarder);
    }
    Arc::new(UpstreamForwarder::new(
        Duration::from_secs(config.timeouts.connect_secs),
        Duration::from_secs(config.timeouts.read_secs),
    ))
}

/// Validate `config` and build a server in the `Created` state.
pub fn build_server(config: ProxyConfig) -> Result<ProxyServer, ConfigError> {
    validate_config(&config).map_err(ConfigError::Validation)?;

    let interceptor = build_interceptor(&config);
    let forwarder = build_forwarder(&config);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        queue_capacity = config.listener.queue_capacity,
        dispatch_workers = config.listener.dispatch_workers,
        forwarding = config.forwarding.enabled,
        "Configuration loaded"
    );

    let mut server = ProxyServer::new(config);
    server.set_interceptor(interceptor);
    server.set_forwarder(forwarder);
    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeaderRule;
    use crate::proxy::EngineState;

    #[test]
    fn build_server_starts_created() {
        let server = build_server(ProxyConfig::default()).unwrap();
        assert_eq!(server.state(), EngineState::Created);
    }

    #[test]
    fn build_server_rejects_invalid_config() {
        let mut config = ProxyConfig::default();
        config.listener.queue_capacity = 0;
        assert!(matches!(build_server(config), Err(ConfigError::Validation(_))));
    }

    #[tokio::test]
    async fn interceptor_applies_configured_rewrites() {
        let mut config = ProxyConfig::default();
        config.interception.log_requests = false;
        config.interception.set_headers.push(HeaderRule {
            name: "X-Intercepted".into(),
            value: "1".into(),
        });

        let interceptor = build_interceptor(&config);
        let mut raw = crate::http::RawMessage::from(&b"GET / HTTP/1.1\r\nHost: a\r\n\r\n"[..]);
        let request = crate::http::ParsedRequest::from_raw(&raw).unwrap();
        interceptor.intercept(&request, &mut raw).await;

        let request = crate::http::ParsedRequest::from_raw(&raw).unwrap();
        assert_eq!(request.headers().get("x-intercepted"), Some("1"));
    }
}
