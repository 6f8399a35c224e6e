//! Run-wide request spacing
//!
//! Every fetch attempt reserves a dispatch slot from a single chain. Each
//! reservation pushes the tail of the chain `delay` further, so two dispatches
//! are never closer than `delay` no matter how many queue slots exist.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// A serialized delay chain shared by the whole run
#[derive(Debug)]
pub struct RequestSpacer {
    delay: Duration,

    /// Earliest instant the next reservation may dispatch at
    tail: Mutex<Option<Instant>>,
}

impl RequestSpacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            tail: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Reserves the next dispatch slot and sleeps until it arrives
    ///
    /// Returns the reserved dispatch instant.
    pub async fn wait(&self) -> Instant {
        let slot = self.reserve();
        tokio::time::sleep_until(slot).await;
        slot
    }

    /// Takes the current tail as this caller's slot and extends the chain
    fn reserve(&self) -> Instant {
        let mut tail = self.tail.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let slot = match *tail {
            Some(next) if next > now => next,
            _ => now,
        };
        *tail = Some(slot + self.delay);
        slot
    }
}
