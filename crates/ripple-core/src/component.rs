//! Component instances: the stateful units the scheduler re-renders.
//!
//! An instance is split in two. [`ComponentCore`] holds everything the
//! scheduler and update driver need (dirty flag, depth, queued callbacks,
//! mount position) and is shared as an [`InstanceRef`]. [`Component`] is the
//! typed facade that owns props and state and implements `set_state`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::context::Context;
use crate::scheduler::SchedulerHandle;
use crate::state::State;
use crate::{next_component_id, ComponentId, HostId, NodeId};

/// Zero-argument callback run after a component's next commit.
pub type Callback = Box<dyn FnOnce() + 'static>;

pub type InstanceRef = Rc<ComponentCore>;

/// Host container a mounted component renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostAnchor {
    pub container: HostId,
    /// The container lives in the SVG namespace; descendants inherit it.
    pub svg: bool,
}

impl HostAnchor {
    pub fn new(container: HostId) -> Self {
        Self {
            container,
            svg: false,
        }
    }

    pub fn svg(container: HostId) -> Self {
        Self {
            container,
            svg: true,
        }
    }
}

pub struct ComponentCore {
    id: ComponentId,
    scheduler: SchedulerHandle,
    depth: Cell<usize>,
    dirty: Cell<bool>,
    callbacks: RefCell<Vec<Callback>>,
    node: Cell<Option<NodeId>>,
    anchor: Cell<Option<HostAnchor>>,
    context: RefCell<Context>,
}

impl ComponentCore {
    pub fn new(scheduler: SchedulerHandle) -> InstanceRef {
        Rc::new(Self {
            id: next_component_id(),
            scheduler,
            depth: Cell::new(0),
            dirty: Cell::new(false),
            callbacks: RefCell::new(Vec::new()),
            node: Cell::new(None),
            anchor: Cell::new(None),
            context: RefCell::new(Context::default()),
        })
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }

    /// Distance from the tree root. Only used to order a flush.
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    pub fn set_depth(&self, depth: usize) {
        self.depth.set(depth);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Sets the dirty flag, returning whether it was already set.
    pub(crate) fn mark_dirty(&self) -> bool {
        self.dirty.replace(true)
    }

    pub(crate) fn clear_dirty(&self) {
        self.dirty.set(false);
    }

    /// Records that the instance has just been rendered. Reconcilers call
    /// this (usually through [`Component::commit_state`]) when they render a
    /// component as part of an ancestor's update. Its queued entry is then
    /// skipped by the flush, which delivers its callbacks instead.
    pub fn mark_rendered(&self) {
        self.dirty.set(false);
    }

    /// The component's render node; present exactly while mounted.
    pub fn node(&self) -> Option<NodeId> {
        self.node.get()
    }

    pub fn anchor(&self) -> Option<HostAnchor> {
        self.anchor.get()
    }

    /// Render node and host anchor, present together while mounted.
    pub fn mount_position(&self) -> Option<(NodeId, HostAnchor)> {
        Some((self.node.get()?, self.anchor.get()?))
    }

    pub fn is_mounted(&self) -> bool {
        self.mount_position().is_some()
    }

    pub fn mount(&self, node: NodeId, anchor: HostAnchor) {
        self.node.set(Some(node));
        self.anchor.set(Some(anchor));
    }

    /// Detaches the instance from the tree. Queued callbacks are dropped and
    /// any later `force_update` becomes a no-op.
    pub fn unmount(&self) {
        self.node.set(None);
        self.anchor.set(None);
        let dropped = std::mem::take(&mut *self.callbacks.borrow_mut());
        if !dropped.is_empty() {
            log::trace!(
                "component #{} unmounted with {} pending callbacks",
                self.id,
                dropped.len()
            );
        }
    }

    pub fn context(&self) -> Context {
        self.context.borrow().clone()
    }

    pub fn set_context(&self, context: Context) {
        *self.context.borrow_mut() = context;
    }

    pub fn pending_callbacks(&self) -> usize {
        self.callbacks.borrow().len()
    }

    pub(crate) fn push_callback(&self, callback: Callback) {
        self.callbacks.borrow_mut().push(callback);
    }

    /// Runs the callbacks queued by `set_state` in queue order and returns
    /// how many ran. Call after this instance's output was committed.
    /// Callbacks queued while these run wait for the next commit.
    pub fn run_callbacks(&self) -> usize {
        let callbacks = std::mem::take(&mut *self.callbacks.borrow_mut());
        let count = callbacks.len();
        for callback in callbacks {
            callback();
        }
        count
    }

    /// Queues this instance for the next flush.
    pub fn schedule_render(self: &Rc<Self>) {
        self.scheduler.enqueue(self);
    }
}

impl fmt::Debug for ComponentCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentCore")
            .field("id", &self.id)
            .field("depth", &self.depth.get())
            .field("dirty", &self.dirty.get())
            .field("node", &self.node.get())
            .field("anchor", &self.anchor.get())
            .field("callbacks", &self.callbacks.borrow().len())
            .finish()
    }
}

/// Update passed to [`Component::set_state`].
pub enum StateUpdate<P, S: State> {
    /// Shallow-merge this partial into the pending state.
    Merge(S::Partial),
    /// Derive a partial from the pending state and props; `None` cancels the
    /// update without scheduling anything.
    Compute(Box<dyn FnOnce(&S, &P) -> Option<S::Partial> + 'static>),
}

impl<P, S: State> StateUpdate<P, S> {
    pub fn compute(f: impl FnOnce(&S, &P) -> Option<S::Partial> + 'static) -> Self {
        StateUpdate::Compute(Box::new(f))
    }
}

struct ComponentInner<P, S: State> {
    core: InstanceRef,
    props: RefCell<P>,
    state: RefCell<S>,
    pending: RefCell<Option<S>>,
}

pub struct Component<P, S: State> {
    inner: Rc<ComponentInner<P, S>>,
}

impl<P, S: State> Clone for Component<P, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<P: 'static, S: State> Component<P, S> {
    pub fn new(scheduler: SchedulerHandle, props: P, state: S) -> Self {
        Self {
            inner: Rc::new(ComponentInner {
                core: ComponentCore::new(scheduler),
                props: RefCell::new(props),
                state: RefCell::new(state),
                pending: RefCell::new(None),
            }),
        }
    }

    pub fn core(&self) -> &InstanceRef {
        &self.inner.core
    }

    pub fn id(&self) -> ComponentId {
        self.inner.core.id()
    }

    pub fn props(&self) -> P
    where
        P: Clone,
    {
        self.inner.props.borrow().clone()
    }

    pub fn with_props<R>(&self, f: impl FnOnce(&P) -> R) -> R {
        f(&*self.inner.props.borrow())
    }

    /// Replaces the props wholesale ahead of a render.
    pub fn set_props(&self, props: P) {
        *self.inner.props.borrow_mut() = props;
    }

    /// Last committed state.
    pub fn state(&self) -> S {
        self.inner.state.borrow().clone()
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&*self.inner.state.borrow())
    }

    pub fn pending_state(&self) -> Option<S> {
        self.inner.pending.borrow().clone()
    }

    pub fn has_pending_state(&self) -> bool {
        self.inner.pending.borrow().is_some()
    }

    /// Queues a state update.
    ///
    /// Updates made before the next flush coalesce into a single render.
    /// A mounted component keeps `callback` until its next commit; an
    /// unmounted one merges the update for its first render and drops the
    /// callback.
    pub fn set_state(&self, update: StateUpdate<P, S>, callback: Option<Callback>) {
        let partial = match update {
            StateUpdate::Merge(partial) => partial,
            StateUpdate::Compute(f) => {
                let draft = self.draft();
                let partial = {
                    let props = self.inner.props.borrow();
                    f(&draft, &*props)
                };
                match partial {
                    Some(partial) => partial,
                    None => {
                        log::trace!("component #{} update cancelled", self.id());
                        return;
                    }
                }
            }
        };
        self.merge_pending(partial);
        self.schedule(callback);
    }

    pub fn update_state(
        &self,
        f: impl FnOnce(&S, &P) -> Option<S::Partial> + 'static,
        callback: Option<Callback>,
    ) {
        self.set_state(StateUpdate::compute(f), callback);
    }

    /// Like [`Component::update_state`] for updaters that can fail. An error
    /// is returned as is and leaves both state and queue untouched.
    pub fn try_update_state<E>(
        &self,
        f: impl FnOnce(&S, &P) -> Result<Option<S::Partial>, E>,
        callback: Option<Callback>,
    ) -> Result<(), E> {
        let draft = self.draft();
        let partial = {
            let props = self.inner.props.borrow();
            f(&draft, &*props)?
        };
        if let Some(partial) = partial {
            self.merge_pending(partial);
            self.schedule(callback);
        }
        Ok(())
    }

    /// Promotes the pending state to the current state and clears the dirty
    /// flag. Returns whether there was a pending state to apply.
    pub fn commit_state(&self) -> bool {
        let pending = self.inner.pending.borrow_mut().take();
        self.inner.core.mark_rendered();
        match pending {
            Some(next) => {
                *self.inner.state.borrow_mut() = next;
                true
            }
            None => false,
        }
    }

    fn draft(&self) -> S {
        match &*self.inner.pending.borrow() {
            Some(pending) => pending.clone(),
            None => self.inner.state.borrow().clone(),
        }
    }

    fn merge_pending(&self, partial: S::Partial) {
        let mut pending = self.inner.pending.borrow_mut();
        let draft = pending.get_or_insert_with(|| self.inner.state.borrow().clone());
        draft.merge(partial);
    }

    fn schedule(&self, callback: Option<Callback>) {
        let core = &self.inner.core;
        if !core.is_mounted() {
            if callback.is_some() {
                log::trace!("component #{} not mounted; dropping callback", core.id());
            }
            return;
        }
        if let Some(callback) = callback {
            core.push_callback(callback);
        }
        core.schedule_render();
    }
}

impl<P, S: State + fmt::Debug> fmt::Debug for Component<P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("core", &self.inner.core)
            .field("state", &self.inner.state.borrow())
            .field("pending", &self.inner.pending.borrow())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/component_tests.rs"]
mod tests;
