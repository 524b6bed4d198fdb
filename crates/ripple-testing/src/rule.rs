use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use ripple_core::{
    Component, ComponentId, DiffRequest, FlushStats, FlushTask, FlushTrigger, HostAnchor, HostId,
    InstanceRef, NodeId, RenderError, RenderTree, Runtime, SchedulerHandle, State,
};

use crate::reconciler::{RecordingReconciler, RenderLog, ScriptTable};
use crate::tree;

/// Flush trigger that parks tasks until a test runs them.
#[derive(Default)]
pub struct ManualTrigger {
    tasks: RefCell<VecDeque<FlushTask>>,
    scheduled: Cell<usize>,
}

impl ManualTrigger {
    /// Total number of flushes armed so far.
    pub fn scheduled(&self) -> usize {
        self.scheduled.get()
    }

    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn run_next(&self) -> Option<Result<FlushStats, RenderError>> {
        let task = self.tasks.borrow_mut().pop_front()?;
        Some(task())
    }
}

impl FlushTrigger for ManualTrigger {
    fn schedule(&self, task: FlushTask) {
        self.scheduled.set(self.scheduled.get() + 1);
        self.tasks.borrow_mut().push_back(task);
    }
}

/// Headless harness owning a runtime, a [`RecordingReconciler`] and a
/// [`ManualTrigger`], so tests decide exactly when flushes happen.
pub struct TestRule {
    trigger: Rc<ManualTrigger>,
    runtime: Runtime,
    log: RenderLog,
    scripts: ScriptTable,
}

impl TestRule {
    pub fn new() -> Self {
        Self::with_reconciler(|reconciler| reconciler)
    }

    /// Builds the rule around a reconciler customised by `configure`.
    pub fn with_reconciler(
        configure: impl FnOnce(RecordingReconciler) -> RecordingReconciler,
    ) -> Self {
        let (reconciler, log) = RecordingReconciler::new();
        let scripts = reconciler.scripts();
        let trigger = Rc::new(ManualTrigger::default());
        let runtime = Runtime::new(trigger.clone(), configure(reconciler));
        Self {
            trigger,
            runtime,
            log,
            scripts,
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.runtime.handle()
    }

    pub fn log(&self) -> &RenderLog {
        &self.log
    }

    pub fn trigger(&self) -> &ManualTrigger {
        &self.trigger
    }

    /// Replaces how renders of `instance` are reconciled from now on.
    pub fn script(
        &self,
        instance: ComponentId,
        script: impl FnMut(&mut RenderTree, &mut DiffRequest<'_>) -> Result<Option<HostId>, RenderError>
            + 'static,
    ) {
        self.scripts.set(instance, script);
    }

    pub fn component<P: 'static, S: State>(&self, props: P, state: S) -> Component<P, S> {
        self.runtime.create_component(props, state)
    }

    /// Creates a render node for `instance` under `parent` and mounts the
    /// instance there, deriving its depth from the component nodes above it.
    pub fn mount(&self, instance: &InstanceRef, parent: Option<NodeId>, container: HostId) -> NodeId {
        let mut nodes = self.runtime.tree_mut();
        let node = tree::component(&mut nodes, parent, instance.id());
        instance.set_depth(tree::component_depth(&nodes, node));
        instance.mount(node, HostAnchor::new(container));
        node
    }

    /// Runs armed flushes until none are left, including flushes armed by
    /// those flushes. Stops at the first error.
    pub fn pump_until_idle(&self) -> Result<FlushStats, RenderError> {
        let mut total = FlushStats::default();
        while let Some(result) = self.trigger.run_next() {
            let stats = result?;
            total.rendered += stats.rendered;
            total.skipped += stats.skipped;
        }
        Ok(total)
    }
}

impl Default for TestRule {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for tests that only need temporary access to a
/// [`TestRule`].
pub fn run_test_rule<R>(f: impl FnOnce(&mut TestRule) -> R) -> R {
    let mut rule = TestRule::new();
    f(&mut rule)
}
