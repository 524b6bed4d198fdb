//! Batched, deduplicated, depth-ordered re-render queue.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::component::{ComponentCore, InstanceRef};
use crate::platform::FlushTrigger;
use crate::update::UpdateOutcome;
use crate::RenderError;

/// Renders one dequeued instance. Installed by the runtime; the scheduler
/// itself never knows how a render happens.
pub type RenderHook = Rc<dyn Fn(&InstanceRef) -> Result<UpdateOutcome, RenderError> + 'static>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub rendered: usize,
    /// Entries dropped because their instance was gone, no longer dirty, or
    /// no longer mounted.
    pub skipped: usize,
}

struct SchedulerInner {
    trigger: Rc<dyn FlushTrigger>,
    queue: RefCell<VecDeque<Weak<ComponentCore>>>,
    /// A flush is pending or running; enqueues must not arm another one.
    armed: Cell<bool>,
    flushing: Cell<bool>,
    /// A flush was requested while `flushing` was held by [`Scheduler::deferring`].
    missed: Cell<bool>,
    unsorted: Cell<bool>,
    renderer: RefCell<Option<RenderHook>>,
}

impl SchedulerInner {
    fn enqueue(self: &Rc<Self>, instance: &InstanceRef) {
        if instance.mark_dirty() {
            log::trace!("component #{} already queued", instance.id());
            return;
        }
        self.queue.borrow_mut().push_back(Rc::downgrade(instance));
        self.unsorted.set(true);
        log::trace!(
            "queued component #{} at depth {}",
            instance.id(),
            instance.depth()
        );
        if self.armed.replace(true) {
            return;
        }
        self.arm();
    }

    fn arm(self: &Rc<Self>) {
        let handle = SchedulerHandle(Rc::downgrade(self));
        self.trigger.schedule(Box::new(move || handle.flush()));
    }

    fn deferring<R>(self: &Rc<Self>, f: impl FnOnce() -> R) -> R {
        if self.flushing.replace(true) {
            return f();
        }
        let result = f();
        self.flushing.set(false);
        if self.missed.replace(false) {
            log::trace!("replaying flush requested during a direct render");
            self.arm();
        }
        result
    }

    fn next_entry(&self) -> Option<Weak<ComponentCore>> {
        let mut queue = self.queue.borrow_mut();
        if self.unsorted.replace(false) {
            queue
                .make_contiguous()
                .sort_by_cached_key(|entry| entry.upgrade().map(|core| core.depth()).unwrap_or(0));
        }
        queue.pop_front()
    }

    fn render(&self, instance: &InstanceRef) -> Result<UpdateOutcome, RenderError> {
        let renderer = self.renderer.borrow().clone();
        match renderer {
            Some(render) => render(instance),
            None => {
                log::warn!(
                    "no renderer installed; dropping render of component #{}",
                    instance.id()
                );
                Ok(UpdateOutcome::Skipped)
            }
        }
    }

    fn flush(&self) -> Result<FlushStats, RenderError> {
        if self.flushing.replace(true) {
            // The running drain picks up anything queued meanwhile; a held
            // scheduler replays the flush once released.
            self.missed.set(true);
            return Ok(FlushStats::default());
        }
        let result = self.drain();
        self.flushing.set(false);
        self.missed.set(false);
        self.armed.set(false);
        match &result {
            Ok(stats) if stats.rendered + stats.skipped > 0 => {
                log::debug!(
                    "flush rendered {} skipped {}",
                    stats.rendered,
                    stats.skipped
                );
            }
            Ok(_) => {}
            Err(err) => log::debug!(
                "flush aborted with {} entries left: {err}",
                self.queue.borrow().len()
            ),
        }
        result
    }

    fn drain(&self) -> Result<FlushStats, RenderError> {
        let mut stats = FlushStats::default();
        while let Some(entry) = self.next_entry() {
            let Some(instance) = entry.upgrade() else {
                stats.skipped += 1;
                continue;
            };
            if !instance.is_dirty() {
                // Committed by an ancestor's render; its callbacks are due now.
                let delivered = instance.run_callbacks();
                log::trace!(
                    "component #{} rendered earlier; delivered {delivered} callbacks",
                    instance.id()
                );
                stats.skipped += 1;
                continue;
            }
            instance.clear_dirty();
            match self.render(&instance) {
                Ok(UpdateOutcome::Rendered { .. }) => stats.rendered += 1,
                Ok(UpdateOutcome::Skipped) => stats.skipped += 1,
                Err(RenderError::Reentrant) => {
                    instance.mark_dirty();
                    self.queue.borrow_mut().push_front(entry);
                    return Err(RenderError::Reentrant);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(stats)
    }
}

/// Owns the dirty queue and the flush trigger.
///
/// One scheduler is created per application root and handed to components
/// as a [`SchedulerHandle`].
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

impl Scheduler {
    pub fn new(trigger: Rc<dyn FlushTrigger>) -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                trigger,
                queue: RefCell::new(VecDeque::new()),
                armed: Cell::new(false),
                flushing: Cell::new(false),
                missed: Cell::new(false),
                unsorted: Cell::new(false),
                renderer: RefCell::new(None),
            }),
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle(Rc::downgrade(&self.inner))
    }

    pub fn install_renderer(
        &self,
        render: impl Fn(&InstanceRef) -> Result<UpdateOutcome, RenderError> + 'static,
    ) {
        *self.inner.renderer.borrow_mut() = Some(Rc::new(render));
    }

    /// Marks `instance` dirty and queues it, arming the trigger if this is
    /// the first entry since the last flush. Already-dirty instances are
    /// left alone.
    pub fn enqueue(&self, instance: &InstanceRef) {
        self.inner.enqueue(instance);
    }

    /// Renders queued instances shallowest first until the queue is empty,
    /// including instances queued by those renders. The first render error
    /// stops the drain and is returned; the remaining entries stay queued.
    pub fn flush(&self) -> Result<FlushStats, RenderError> {
        self.inner.flush()
    }

    /// Runs `f` with flushing held back. A flush the trigger runs while `f`
    /// is on the stack, such as one from a synchronous trigger armed inside a
    /// reconciler, is re-armed once `f` returns. Inside a running flush this
    /// just calls `f`.
    pub fn deferring<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.deferring(f)
    }

    pub fn len(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.queue.borrow().is_empty()
    }

    pub fn is_armed(&self) -> bool {
        self.inner.armed.get()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("queued", &self.len())
            .field("armed", &self.is_armed())
            .finish()
    }
}

/// Weak reference to a [`Scheduler`] held by component instances.
#[derive(Clone)]
pub struct SchedulerHandle(Weak<SchedulerInner>);

impl SchedulerHandle {
    /// Handle bound to no scheduler; enqueues are ignored.
    pub fn detached() -> Self {
        SchedulerHandle(Weak::new())
    }

    pub fn enqueue(&self, instance: &InstanceRef) {
        match self.0.upgrade() {
            Some(inner) => inner.enqueue(instance),
            None => log::trace!(
                "scheduler dropped; ignoring render of component #{}",
                instance.id()
            ),
        }
    }

    pub fn flush(&self) -> Result<FlushStats, RenderError> {
        match self.0.upgrade() {
            Some(inner) => inner.flush(),
            None => Ok(FlushStats::default()),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SchedulerHandle")
            .field(&self.is_alive())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/scheduler_tests.rs"]
mod tests;
