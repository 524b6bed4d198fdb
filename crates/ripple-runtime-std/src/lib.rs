//! Standard runtime services for Ripple.
//!
//! [`DeferredTrigger`] is the deferred flush queue a host event loop drains
//! between turns, and [`StdRuntime`] bundles it with a [`ripple_core::Runtime`].

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::task::Waker;

use futures_task::ArcWake;
use ripple_core::{
    Component, FlushStats, FlushTask, FlushTrigger, Reconciler, RenderError, Runtime,
    SchedulerHandle, State,
};

/// Flush trigger that parks tasks until the host calls
/// [`DeferredTrigger::run_pending`].
///
/// A registered [`Waker`] is woken every time a task is parked so a host loop
/// sleeping on it knows to come back and drain.
#[derive(Default)]
pub struct DeferredTrigger {
    tasks: RefCell<VecDeque<FlushTask>>,
    waker: RefCell<Option<Waker>>,
}

impl DeferredTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pending(&self) -> bool {
        !self.tasks.borrow().is_empty()
    }

    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn set_waker(&self, waker: Waker) {
        *self.waker.borrow_mut() = Some(waker);
    }

    /// Registers a plain callback as the waker.
    pub fn set_wake_fn(&self, wake: impl Fn() + Send + Sync + 'static) {
        self.set_waker(futures_task::waker(Arc::new(WakeFn(wake))));
    }

    pub fn clear_waker(&self) {
        *self.waker.borrow_mut() = None;
    }

    /// Runs parked tasks in order, including tasks parked while running.
    ///
    /// Stops at the first failing flush and returns its error; tasks behind
    /// it stay parked.
    pub fn run_pending(&self) -> Result<FlushStats, RenderError> {
        let mut total = FlushStats::default();
        loop {
            let Some(task) = self.tasks.borrow_mut().pop_front() else {
                break;
            };
            let stats = task()?;
            total.rendered += stats.rendered;
            total.skipped += stats.skipped;
        }
        Ok(total)
    }
}

impl FlushTrigger for DeferredTrigger {
    fn schedule(&self, task: FlushTask) {
        self.tasks.borrow_mut().push_back(task);
        if let Some(waker) = self.waker.borrow().as_ref() {
            waker.wake_by_ref();
        }
    }
}

impl fmt::Debug for DeferredTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredTrigger")
            .field("pending", &self.pending())
            .field("has_waker", &self.waker.borrow().is_some())
            .finish()
    }
}

struct WakeFn<F>(F);

impl<F> ArcWake for WakeFn<F>
where
    F: Fn() + Send + Sync + 'static,
{
    fn wake_by_ref(arc_self: &Arc<Self>) {
        (arc_self.0)();
    }
}

/// Convenience container bundling a [`DeferredTrigger`] and the runtime it
/// drives.
#[derive(Clone)]
pub struct StdRuntime {
    trigger: Rc<DeferredTrigger>,
    runtime: Runtime,
}

impl StdRuntime {
    pub fn new(reconciler: impl Reconciler + 'static) -> Self {
        let trigger = Rc::new(DeferredTrigger::new());
        let runtime = Runtime::new(trigger.clone(), reconciler);
        Self { trigger, runtime }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.runtime.handle()
    }

    pub fn trigger(&self) -> Rc<DeferredTrigger> {
        Rc::clone(&self.trigger)
    }

    pub fn create_component<P: 'static, S: State>(&self, props: P, state: S) -> Component<P, S> {
        self.runtime.create_component(props, state)
    }

    pub fn has_pending(&self) -> bool {
        self.trigger.has_pending()
    }

    /// Registers a callback invoked whenever a flush is scheduled.
    pub fn set_wake_fn(&self, wake: impl Fn() + Send + Sync + 'static) {
        self.trigger.set_wake_fn(wake);
    }

    /// Drains scheduled flushes, stopping at the first error.
    pub fn try_run_until_idle(&self) -> Result<FlushStats, RenderError> {
        self.trigger.run_pending()
    }

    /// Drains scheduled flushes until none are left. Failed flushes are
    /// logged and the loop moves on to the next parked task.
    pub fn run_until_idle(&self) -> FlushStats {
        let mut total = FlushStats::default();
        while self.trigger.has_pending() {
            match self.trigger.run_pending() {
                Ok(stats) => {
                    total.rendered += stats.rendered;
                    total.skipped += stats.skipped;
                }
                Err(err) => log::error!("flush failed: {err}"),
            }
        }
        total
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("trigger", &self.trigger)
            .field("runtime", &self.runtime)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_core::{HostAnchor, StateUpdate};
    use ripple_testing::{tree, RecordingReconciler};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn flushes_wait_for_run_pending() {
        let (reconciler, log) = RecordingReconciler::new();
        let runtime = StdRuntime::new(reconciler);
        let component = runtime.create_component((), ());
        let node = tree::component(&mut runtime.runtime().tree_mut(), None, component.id());
        component.core().mount(node, HostAnchor::new(0));

        component.set_state(StateUpdate::Merge(()), None);
        component.set_state(StateUpdate::Merge(()), None);

        assert!(log.is_empty());
        assert_eq!(runtime.trigger().pending(), 1);
        let stats = runtime.try_run_until_idle().expect("flush succeeds");
        assert_eq!(stats, FlushStats { rendered: 1, skipped: 0 });
        assert_eq!(log.ids(), vec![component.id()]);
        assert!(!runtime.has_pending());
    }

    #[test]
    fn waker_fires_once_per_armed_flush() {
        let (reconciler, _log) = RecordingReconciler::new();
        let runtime = StdRuntime::new(reconciler);
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&wakes);
        runtime.set_wake_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let component = runtime.create_component((), ());
        let node = tree::component(&mut runtime.runtime().tree_mut(), None, component.id());
        component.core().mount(node, HostAnchor::new(0));

        component.core().schedule_render();
        component.core().schedule_render();
        assert_eq!(wakes.load(Ordering::SeqCst), 1);

        runtime.run_until_idle();
        component.core().schedule_render();
        assert_eq!(wakes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn run_until_idle_logs_and_continues_past_errors() {
        let (reconciler, log) = RecordingReconciler::new();
        let reconciler = reconciler.fail_when(|record| record.container == 13);
        let runtime = StdRuntime::new(reconciler);
        let failing = runtime.create_component((), ());
        let node = tree::component(&mut runtime.runtime().tree_mut(), None, failing.id());
        failing.core().mount(node, HostAnchor::new(13));

        failing.core().schedule_render();
        runtime
            .trigger()
            .schedule(Box::new(|| Ok(FlushStats { rendered: 1, skipped: 0 })));
        let stats = runtime.run_until_idle();

        assert_eq!(stats, FlushStats { rendered: 1, skipped: 0 });
        assert_eq!(log.ids(), vec![failing.id()]);
        assert!(!runtime.has_pending());
        assert!(runtime.try_run_until_idle().is_ok());
    }

    #[test]
    fn tasks_parked_while_draining_run_in_the_same_call() {
        let trigger = Rc::new(DeferredTrigger::new());
        let inner = Rc::clone(&trigger);
        trigger.schedule(Box::new(move || {
            inner.schedule(Box::new(|| Ok(FlushStats { rendered: 2, skipped: 0 })));
            Ok(FlushStats { rendered: 1, skipped: 1 })
        }));

        let stats = trigger.run_pending().expect("both tasks succeed");

        assert_eq!(stats, FlushStats { rendered: 3, skipped: 1 });
        assert!(!trigger.has_pending());
    }
}
