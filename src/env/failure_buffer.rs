//! Bounded queue of failed episode seeds for replay

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Shared FIFO of episode seeds
///
/// Clones share the same queue, so several environments on different
/// threads can feed and drain one buffer. Puts and takes never block; a put
/// into a full buffer drops the seed.
#[derive(Debug, Clone)]
pub struct FailureBuffer {
    tx: Sender<u64>,
    rx: Receiver<u64>,
}

impl FailureBuffer {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self { tx, rx }
    }

    /// Offer a seed; returns false if it was dropped
    pub fn try_put(&self, seed: u64) -> bool {
        match self.tx.try_send(seed) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn try_take(&self) -> Option<u64> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.rx.capacity().unwrap_or(0)
    }

    /// Move `n` seeds from the front to the back
    pub fn rotate(&self, n: usize) {
        for _ in 0..n {
            match self.try_take() {
                Some(seed) => {
                    self.try_put(seed);
                }
                None => break,
            }
        }
    }
}
