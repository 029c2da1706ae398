//! Hand-off of work to the thread that may present system UI.
//!
//! Native credential sheets can only be opened from the foreground UI
//! context (the main thread on Apple platforms and Android). The orchestrating
//! future may be polled anywhere, so platform adapters route the call that
//! opens the sheet through a [`UiDispatcher`] supplied by the host.

use crate::ConditionalSync;
use std::sync::Arc;

/// A unit of work destined for the UI thread.
#[cfg(not(target_arch = "wasm32"))]
pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// A unit of work destined for the UI thread.
#[cfg(target_arch = "wasm32")]
pub type UiTask = Box<dyn FnOnce() + 'static>;

/// Schedules [`UiTask`]s on the foreground UI context.
///
/// Implementations must eventually run every task exactly once. They must
/// not block the caller until the task completes.
pub trait UiDispatcher: ConditionalSync {
    /// Schedule `task` to run on the UI context.
    fn dispatch(&self, task: UiTask);
}

/// Runs tasks immediately on the calling thread.
///
/// Correct when the caller is already on the UI thread, which is the case
/// for single-threaded hosts and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineDispatcher;

impl UiDispatcher for InlineDispatcher {
    fn dispatch(&self, task: UiTask) {
        task()
    }
}

impl<D> UiDispatcher for Arc<D>
where
    D: UiDispatcher + ?Sized,
{
    fn dispatch(&self, task: UiTask) {
        (**self).dispatch(task)
    }
}
