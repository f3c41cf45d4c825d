// SPDX-License-Identifier: GPL-3.0-only

//! Capture progress listeners
//!
//! Listeners are held in a copy-on-write list: registration swaps in a new
//! list while a notification in progress keeps iterating the snapshot it
//! started with. A listener that panics is logged and skipped so the rest
//! still receive the event.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{error, trace};

/// Observer of a capture run
///
/// Callbacks run on the scheduler's thread and should return quickly.
pub trait ProgressListener: Send + Sync {
    fn capture_started(&self, period_secs: u32, max_repeats: u32) {
        let _ = (period_secs, max_repeats);
    }

    fn capture_canceled(&self) {}

    fn capture_finished(&self) {}

    /// A shot succeeded; `current` counts the repeats consumed so far
    fn picture_taken(&self, current: u32, max: u32) {
        let _ = (current, max);
    }
}

/// Lifecycle event of a capture run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    Started { period_secs: u32, max_repeats: u32 },
    PictureTaken { current: u32, max: u32 },
    Finished,
    Canceled,
}

impl CaptureEvent {
    /// Invoke the matching listener callback
    pub fn deliver(&self, listener: &dyn ProgressListener) {
        match *self {
            CaptureEvent::Started {
                period_secs,
                max_repeats,
            } => listener.capture_started(period_secs, max_repeats),
            CaptureEvent::PictureTaken { current, max } => listener.picture_taken(current, max),
            CaptureEvent::Finished => listener.capture_finished(),
            CaptureEvent::Canceled => listener.capture_canceled(),
        }
    }

    /// Whether this event ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, CaptureEvent::Finished | CaptureEvent::Canceled)
    }
}

type ListenerList = Arc<Vec<Arc<dyn ProgressListener>>>;

/// Thread-safe fan-out of capture events
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<ListenerList>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<dyn ProgressListener>) {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = Vec::with_capacity(listeners.len() + 1);
        next.extend(listeners.iter().cloned());
        next.push(listener);
        *listeners = Arc::new(next);
    }

    /// Remove a listener by identity; returns whether it was registered
    pub fn remove(&self, listener: &Arc<dyn ProgressListener>) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let Some(index) = listeners.iter().position(|l| Arc::ptr_eq(l, listener)) else {
            return false;
        };
        let mut next: Vec<_> = listeners.iter().cloned().collect();
        next.remove(index);
        *listeners = Arc::new(next);
        true
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    fn snapshot(&self) -> ListenerList {
        Arc::clone(&self.listeners.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Deliver an event to every listener registered when the call began,
    /// in registration order
    pub fn notify(&self, event: CaptureEvent) {
        let listeners = self.snapshot();
        trace!(?event, listeners = listeners.len(), "Dispatching capture event");

        for listener in listeners.iter() {
            if catch_unwind(AssertUnwindSafe(|| event.deliver(listener.as_ref()))).is_err() {
                error!(?event, "Progress listener panicked");
            }
        }
    }
}
