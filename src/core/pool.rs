//! Fixed-count message buffer pool
//!
//! The free-list is a bounded crossbeam channel pre-filled with every buffer
//! at construction. Producers acquire with a non-blocking `try_recv`; the
//! worker releases with `send`, which can never block because the channel
//! capacity equals the pool size and each buffer occupies at most one slot
//! anywhere in the system.

use super::buffer::LogMessage;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use std::time::Duration;

pub struct MessagePool {
    free_tx: Sender<LogMessage>,
    free_rx: Receiver<LogMessage>,
    size: usize,
}

impl MessagePool {
    pub fn new(pool_size: usize, buffer_size: usize, string_capacity: usize) -> Self {
        let (free_tx, free_rx) = bounded(pool_size);
        for _ in 0..pool_size {
            free_tx
                .send(LogMessage::new_pooled(buffer_size, string_capacity))
                .expect("free-list sized to hold the whole pool");
        }
        Self {
            free_tx,
            free_rx,
            size: pool_size,
        }
    }

    /// A free buffer, or `None` when every buffer is in flight.
    pub fn acquire(&self) -> Option<LogMessage> {
        match self.free_rx.try_recv() {
            Ok(msg) => Some(msg),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Wait up to `timeout` for a free buffer. Used by the bounded-wait
    /// phase of the `WaitUntilAvailable` exhaustion strategy.
    pub fn acquire_timeout(&self, timeout: Duration) -> Option<LogMessage> {
        self.free_rx.recv_timeout(timeout).ok()
    }

    /// Return a buffer to the free-list. Only pooled buffers re-enter the
    /// pool; the empty and constant variants are dropped.
    pub fn release(&self, mut msg: LogMessage) {
        if !msg.is_pooled() {
            return;
        }
        msg.reset();
        // Cannot fail: capacity equals pool size and ownership is linear.
        let _ = self.free_tx.send(msg);
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn count_free(&self) -> usize {
        self.free_rx.len()
    }
}
