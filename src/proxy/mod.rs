//! Proxy engine subsystem.
//!
//! # Data Flow
//! ```text
//! engine.rs accept loop
//!     → net::queue (try_admit, reject when full)
//!     → dispatch.rs worker (read → intercept → re-derive → forward)
//!     → connection closed
//! ```

pub mod dispatch;
pub mod engine;

pub use dispatch::ConnectionError;
pub use engine::{EngineState, ProxyError, ProxyServer, ServerHandle};
