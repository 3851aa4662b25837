//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! accept loop, dispatch workers, interceptors produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt subscriber)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Every dispatched connection runs inside a span carrying its
//!   connection ID and a request ID
//! - Metrics are cheap (atomic increments) and off unless enabled

pub mod logging;
pub mod metrics;
