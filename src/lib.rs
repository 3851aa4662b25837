//! Intercepting HTTP/1.1 proxy library.
//!
//! # Architecture Overview
//!
//! ```text
//!   client ──▶ net::listener ──▶ net::queue ──▶ proxy::dispatch
//!                 (accept)      (admit/reject)      │
//!                                                   ▼
//!                                        http::reader (raw + parsed)
//!                                                   │
//!                                                   ▼
//!                                        intercept::Interceptor
//!                                                   │
//!                                                   ▼
//!                                  ParsedRequest re-derived from raw
//!                                                   │
//!                                                   ▼
//!                                        forward::Forwarder ──▶ upstream
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod proxy;

// Request handling strategies
pub mod forward;
pub mod intercept;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ProxyConfig;
pub use forward::{Forwarder, ForwardError};
pub use http::{ParseError, ParsedRequest, RawMessage};
pub use intercept::Interceptor;
pub use lifecycle::Shutdown;
pub use proxy::{EngineState, ProxyError, ProxyServer, ServerHandle};
