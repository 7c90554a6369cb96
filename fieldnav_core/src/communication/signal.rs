//! Cross-thread flags shared between the navigator and its supervisors.
//!
//! Each flag has one writer and any number of readers. Writers store with
//! `Release`, readers load with `Acquire`, so a reader that observes the flag
//! also observes everything the writer did before raising it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Emergency halt raised by a safety monitor and read once per control tick
#[derive(Debug, Clone, Default)]
pub struct HaltSignal {
    flag: Arc<AtomicBool>,
}

impl HaltSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.flag.store(false, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Cooperative mission cancellation, checked at tick boundaries
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
