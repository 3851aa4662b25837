//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, wrap in ConnectionSlot)
//!     → queue.rs (bounded admission, reject when full)
//!     → connection.rs (lifecycle tracking while dispatched)
//!     → Hand off to the HTTP reader
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - A full queue closes the new connection instead of stalling accept
//! - Each dispatched connection is tracked for shutdown reporting

pub mod connection;
pub mod listener;
pub mod queue;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionSlot, ConnectionTracker};
pub use listener::{resolve_bind_address, Listener, ListenerError};
pub use queue::{admission_queue, AdmissionError, AdmissionQueue, AdmissionReceiver};
