//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the intercepting proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener and admission queue settings.
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits enforced by the reader.
    pub limits: LimitsConfig,

    /// Parser leniency switches.
    pub parser: ParserConfig,

    /// Built-in interception behaviour.
    pub interception: InterceptionConfig,

    /// Upstream forwarding.
    pub forwarding: ForwardingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address, `host:port` or `:port` for all interfaces.
    pub bind_address: String,

    /// Capacity of the admission queue between accept and dispatch.
    pub queue_capacity: usize,

    /// Number of dispatch workers draining the admission queue.
    pub dispatch_workers: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: ":8080".to_string(),
            queue_capacity: 100,
            dispatch_workers: 1,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for reading one full request from a client, in seconds.
    pub read_secs: u64,

    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_secs: 30,
            connect_secs: 5,
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum length of the request line or a header line, terminator included.
    pub max_line_bytes: usize,

    /// Maximum number of header fields.
    pub max_headers: usize,

    /// Maximum declared `Content-Length`.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: 8192,
            max_headers: 100,
            max_body_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Parser leniency.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ParserConfig {
    /// Reject requests whose stream ends before the blank line.
    pub strict_header_termination: bool,
}

/// Interception settings used to build the default interceptor chain.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct InterceptionConfig {
    /// Log every intercepted request.
    pub log_requests: bool,

    /// Headers to set (replacing any existing value) on every request.
    pub set_headers: Vec<HeaderRule>,

    /// Headers to strip from every request.
    pub remove_headers: Vec<String>,
}

impl Default for InterceptionConfig {
    fn default() -> Self {
        Self {
            log_requests: true,
            set_headers: Vec::new(),
            remove_headers: Vec::new(),
        }
    }
}

/// A header name/value pair from the config file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct HeaderRule {
    pub name: String,
    pub value: String,
}

/// Forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Forward intercepted requests upstream; when false they are dropped.
    pub enabled: bool,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
