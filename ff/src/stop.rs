//! Cooperative stop signaling
//!
//! A `StopToken` is shared between the scheduler and the runners of one
//! task. Triggering it never interrupts an in-flight LLM call; runners
//! observe the flag at step and workflow boundaries.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable stop flag observed at suspension points
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    flag: Arc<AtomicBool>,
}

impl StopToken {
    /// Create a fresh, untriggered token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop; idempotent
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested
    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
