//! Platform abstraction for deferring scheduler flushes.
//!
//! The scheduler never decides on its own when queued renders run; it hands
//! a one-shot task to a [`FlushTrigger`] supplied by the host, which lets the
//! same core run on an event loop, inside a test, or synchronously.

use std::cell::RefCell;
use std::fmt;

use crate::scheduler::FlushStats;
use crate::RenderError;

/// One-shot flush of the dirty queue handed to a [`FlushTrigger`].
pub type FlushTask = Box<dyn FnOnce() -> Result<FlushStats, RenderError> + 'static>;

/// Schedules flushes for the runtime.
///
/// Implementations must run every task exactly once. Deferred implementations
/// must not run it before the current synchronous call stack has unwound.
pub trait FlushTrigger {
    fn schedule(&self, task: FlushTask);
}

/// Trigger that flushes synchronously inside the call that armed it.
///
/// Intended for deterministic tests. A failed flush is logged and kept so the
/// caller can inspect it with [`ImmediateTrigger::take_error`].
#[derive(Default)]
pub struct ImmediateTrigger {
    last_error: RefCell<Option<RenderError>>,
}

impl ImmediateTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_error(&self) -> Option<RenderError> {
        self.last_error.borrow_mut().take()
    }
}

impl FlushTrigger for ImmediateTrigger {
    fn schedule(&self, task: FlushTask) {
        if let Err(err) = task() {
            log::error!("immediate flush failed: {err}");
            *self.last_error.borrow_mut() = Some(err);
        }
    }
}

impl fmt::Debug for ImmediateTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImmediateTrigger")
            .field("has_error", &self.last_error.borrow().is_some())
            .finish()
    }
}

#[cfg(test)]
#[derive(Default)]
pub(crate) struct TestTrigger {
    tasks: RefCell<Vec<FlushTask>>,
    scheduled: std::cell::Cell<usize>,
}

#[cfg(test)]
impl TestTrigger {
    pub(crate) fn scheduled(&self) -> usize {
        self.scheduled.get()
    }

    pub(crate) fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Runs the tasks armed so far, returning the result of the last one.
    pub(crate) fn run(&self) -> Option<Result<FlushStats, RenderError>> {
        let tasks: Vec<FlushTask> = self.tasks.borrow_mut().drain(..).collect();
        let mut last = None;
        for task in tasks {
            last = Some(task());
        }
        last
    }
}

#[cfg(test)]
impl FlushTrigger for TestTrigger {
    fn schedule(&self, task: FlushTask) {
        self.scheduled.set(self.scheduled.get() + 1);
        self.tasks.borrow_mut().push(task);
    }
}
