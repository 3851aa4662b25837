//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacities, timeouts and limits > 0)
//! - Check the bind address and configured header names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !has_port(&config.listener.bind_address) {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("expected host:port or :port, got {:?}", config.listener.bind_address),
        ));
    }

    let positive = [
        ("listener.queue_capacity", config.listener.queue_capacity as u64),
        ("listener.dispatch_workers", config.listener.dispatch_workers as u64),
        ("timeouts.read_secs", config.timeouts.read_secs),
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("limits.max_line_bytes", config.limits.max_line_bytes as u64),
        ("limits.max_headers", config.limits.max_headers as u64),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }

    for rule in &config.interception.set_headers {
        if !is_header_name(&rule.name) {
            errors.push(ValidationError::new(
                "interception.set_headers",
                format!("invalid header name {:?}", rule.name),
            ));
        }
        if rule.value.contains(['\r', '\n']) {
            errors.push(ValidationError::new(
                "interception.set_headers",
                format!("value for {} contains a line break", rule.name),
            ));
        }
    }
    for name in &config.interception.remove_headers {
        if !is_header_name(name) {
            errors.push(ValidationError::new(
                "interception.remove_headers",
                format!("invalid header name {name:?}"),
            ));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("not a socket address: {:?}", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn has_port(address: &str) -> bool {
    match address.rsplit_once(':') {
        Some((_, port)) => port.parse::<u16>().is_ok(),
        None => false,
    }
}

fn is_header_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_graphic() && b != b':')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::HeaderRule;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "localhost".into();
        config.listener.queue_capacity = 0;
        config.timeouts.read_secs = 0;
        config.interception.set_headers.push(HeaderRule {
            name: "Bad Name".into(),
            value: "x".into(),
        });
        config.interception.remove_headers.push(String::new());

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "listener.queue_capacity",
                "timeouts.read_secs",
                "interception.set_headers",
                "interception.remove_headers",
            ]
        );
    }

    #[test]
    fn bind_address_forms() {
        assert!(has_port(":8080"));
        assert!(has_port("0.0.0.0:8080"));
        assert!(has_port("[::1]:8080"));
        assert!(!has_port("8080"));
        assert!(!has_port("host:http"));
    }

    #[test]
    fn metrics_address_checked_when_enabled() {
        let mut config = ProxyConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn header_value_line_break_rejected() {
        let mut config = ProxyConfig::default();
        config.interception.set_headers.push(HeaderRule {
            name: "X-Ok".into(),
            value: "a\r\nInjected: 1".into(),
        });
        assert!(validate_config(&config).is_err());
    }
}
