//! Callback tables for pipeline event listeners.
//!
//! Callbacks are identified by their `Arc` allocation: registering the same
//! `Arc` (or a clone of it) twice is a duplicate, while two separately
//! allocated closures with identical code are distinct listeners.

use crate::engine::{DisplayEvent, PipelineState};
use std::any::Any;
use std::sync::Arc;

/// Opaque data handed back to a callback on every invocation.
pub type UserData = Arc<dyn Any + Send + Sync>;

pub type StateChangeFn = dyn Fn(PipelineState, PipelineState, Option<&UserData>) + Send + Sync;

/// Called with `(previous, current)` on every pipeline state change.
pub type StateChangeListener = Arc<StateChangeFn>;

pub type DisplayEventFn = dyn Fn(&DisplayEvent, Option<&UserData>) + Send + Sync;

/// Called for every window-system event raised by the pipeline's display.
pub type DisplayEventHandler = Arc<DisplayEventFn>;

/// Registration order is dispatch order.
pub struct CallbackTable<F: ?Sized> {
    entries: Vec<(Arc<F>, Option<UserData>)>,
}

impl<F: ?Sized> CallbackTable<F> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn contains(&self, callback: &Arc<F>) -> bool {
        self.entries.iter().any(|(f, _)| Arc::ptr_eq(f, callback))
    }

    /// Returns false if the callback is already registered.
    pub fn add(&mut self, callback: Arc<F>, user_data: Option<UserData>) -> bool {
        if self.contains(&callback) {
            return false;
        }
        self.entries.push((callback, user_data));
        true
    }

    /// Returns false if the callback was never registered.
    pub fn remove(&mut self, callback: &Arc<F>) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(f, _)| !Arc::ptr_eq(f, callback));
        self.entries.len() != before
    }

    /// Clone the table so callbacks can run without the service lock held
    pub fn snapshot(&self) -> Vec<(Arc<F>, Option<UserData>)> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<F: ?Sized> Default for CallbackTable<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> std::fmt::Debug for CallbackTable<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackTable")
            .field("len", &self.entries.len())
            .finish()
    }
}
