//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → CLI overrides applied in main.rs
//!     → handed to the proxy engine
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the engine is created
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, read_config, ConfigError};
pub use schema::{
    ForwardingConfig, HeaderRule, InterceptionConfig, LimitsConfig, ListenerConfig,
    ObservabilityConfig, ParserConfig, ProxyConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
