//! Bounded admission queue between the accept loop and dispatch workers.
//!
//! # Responsibilities
//! - Decouple accepting sockets from processing requests
//! - Reject, never wait, when the queue is full
//! - Hand each queued item to exactly one consumer
//!
//! # Design Decisions
//! - Backed by a bounded `tokio::sync::mpsc` channel
//! - Consumers share the receiver behind an async mutex, so any number of
//!   dispatch workers can drain it while each item is claimed once
//! - Both halves share a pending counter; a worker parked in `recv` holds
//!   the mutex, so the depth cannot be read from the receiver itself

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::net::connection::ConnectionSlot;

/// Why an item could not be admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    #[error("admission queue is full")]
    QueueFull,
    #[error("admission queue is closed")]
    Closed,
}

/// Producer half of the admission queue.
#[derive(Debug)]
pub struct AdmissionQueue<T = ConnectionSlot> {
    tx: mpsc::Sender<T>,
    capacity: usize,
    pending: Arc<AtomicUsize>,
}

impl<T> Clone for AdmissionQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            capacity: self.capacity,
            pending: Arc::clone(&self.pending),
        }
    }
}

/// Consumer half of the admission queue. Cheap to clone per worker.
#[derive(Debug)]
pub struct AdmissionReceiver<T = ConnectionSlot> {
    rx: Arc<Mutex<mpsc::Receiver<T>>>,
    pending: Arc<AtomicUsize>,
}

impl<T> Clone for AdmissionReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            rx: Arc::clone(&self.rx),
            pending: Arc::clone(&self.pending),
        }
    }
}

/// Create a queue holding at most `capacity` pending items.
///
/// # Panics
/// Panics if `capacity` is zero; configuration validation rejects that.
pub fn admission_queue<T>(capacity: usize) -> (AdmissionQueue<T>, AdmissionReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    let pending = Arc::new(AtomicUsize::new(0));
    (
        AdmissionQueue {
            tx,
            capacity,
            pending: Arc::clone(&pending),
        },
        AdmissionReceiver {
            rx: Arc::new(Mutex::new(rx)),
            pending,
        },
    )
}

impl<T> AdmissionQueue<T> {
    /// Enqueue without waiting.
    ///
    /// On failure the item is dropped; for a `ConnectionSlot` that closes
    /// the socket.
    pub fn try_admit(&self, item: T) -> Result<(), AdmissionError> {
        // Counted before the send so a consumer never decrements first.
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.tx.try_send(item).map_err(|e| {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            match e {
                mpsc::error::TrySendError::Full(_) => AdmissionError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => AdmissionError::Closed,
            }
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items waiting to be dispatched.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

impl<T> AdmissionReceiver<T> {
    /// Wait for the next item. `None` once every producer is gone and the
    /// queue is drained.
    pub async fn recv(&self) -> Option<T> {
        let item = self.rx.lock().await.recv().await;
        if item.is_some() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        item
    }

    /// Number of items waiting to be dispatched.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}
