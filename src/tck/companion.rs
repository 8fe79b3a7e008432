//! Per-variant companion: an opaque resource plus a per-thread capture cell.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::thread::{self, ThreadId};

/// Value reported by [`CaptureCell::get`] when nothing was captured on the
/// calling thread.
pub const CAPTURE_DEFAULT: &str = "none";

/// Per-thread string slot.
///
/// Each thread sees its own independent value, keyed by [`ThreadId`]. The
/// interceptor writes the slot right before scheduled work runs and clears it
/// right after, on the executing thread.
#[derive(Default)]
pub struct CaptureCell {
    slots: Mutex<HashMap<ThreadId, String>>,
}

impl CaptureCell {
    /// Creates an empty cell.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` for the calling thread.
    pub fn set(&self, value: impl Into<String>) {
        self.slots.lock().insert(thread::current().id(), value.into());
    }

    /// Returns the calling thread's value, or [`CAPTURE_DEFAULT`].
    #[must_use]
    pub fn get(&self) -> String {
        self.get_for(thread::current().id())
    }

    /// Returns the value stored for `thread`, or [`CAPTURE_DEFAULT`].
    #[must_use]
    pub fn get_for(&self, thread: ThreadId) -> String {
        self.slots
            .lock()
            .get(&thread)
            .cloned()
            .unwrap_or_else(|| CAPTURE_DEFAULT.to_string())
    }

    /// Clears the calling thread's value.
    pub fn clear(&self) {
        self.slots.lock().remove(&thread::current().id());
    }

    /// Number of threads currently holding a value.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.slots.lock().len()
    }
}

impl fmt::Debug for CaptureCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureCell")
            .field("occupied", &self.occupied())
            .finish()
    }
}

/// Carrier of one variant's resource and capture cell.
///
/// Exactly one companion exists per generated variant, so capture state of a
/// boxed run can never leak into the fused run of the same family.
pub struct Companion<R> {
    resource: R,
    capture: CaptureCell,
}

impl<R> Companion<R> {
    /// Wraps `resource`. Use `()` when the test needs none.
    #[must_use]
    pub fn new(resource: R) -> Self {
        Self {
            resource,
            capture: CaptureCell::new(),
        }
    }

    /// The test-supplied resource.
    #[must_use]
    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// The capture cell written by the interceptor.
    #[must_use]
    pub fn capture(&self) -> &CaptureCell {
        &self.capture
    }
}

impl<R: fmt::Debug> fmt::Debug for Companion<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Companion")
            .field("resource", &self.resource)
            .field("capture", &self.capture)
            .finish()
    }
}
