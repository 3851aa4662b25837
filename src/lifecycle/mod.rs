//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → interceptor chain + forwarder → ProxyServer (Created)
//!
//! Shutdown (shutdown.rs):
//!     trigger() → accept loop and dispatch workers exit → Stopped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Startup builds components from config; binding happens in `serve()`
//! - Shutdown is a broadcast, so any number of loops can observe it

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownListener};
pub use signals::wait_for_signal;
pub use startup::{build_forwarder, build_interceptor, build_server};
