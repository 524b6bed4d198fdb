use std::cell::RefCell;
use std::rc::Rc;

use ripple_core::collections::map::HashMap;
use ripple_core::{
    ComponentId, DiffRequest, HostId, InstanceRef, NodeId, Reconciler, RenderError, RenderTree,
};

/// What the reconciler was asked to do for one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRecord {
    pub instance: ComponentId,
    pub container: HostId,
    pub is_svg: bool,
    pub anchor: Option<HostId>,
    pub ancestor: Option<ComponentId>,
    pub is_forced: bool,
    pub previous_host: Option<HostId>,
    pub previous_parent: Option<NodeId>,
}

#[derive(Default)]
struct LogInner {
    records: Vec<RenderRecord>,
    effects: Vec<(NodeId, usize)>,
}

/// Shared view of everything a [`RecordingReconciler`] has seen.
#[derive(Clone, Default)]
pub struct RenderLog(Rc<RefCell<LogInner>>);

impl RenderLog {
    pub fn records(&self) -> Vec<RenderRecord> {
        self.0.borrow().records.clone()
    }

    /// Rendered component ids in render order.
    pub fn ids(&self) -> Vec<ComponentId> {
        self.0.borrow().records.iter().map(|r| r.instance).collect()
    }

    pub fn last(&self) -> Option<RenderRecord> {
        self.0.borrow().records.last().cloned()
    }

    /// `(root, mounted count)` for every `commit_effects` call.
    pub fn effects(&self) -> Vec<(NodeId, usize)> {
        self.0.borrow().effects.clone()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().records.is_empty()
    }

    pub fn clear(&self) {
        let mut inner = self.0.borrow_mut();
        inner.records.clear();
        inner.effects.clear();
    }
}

pub type RenderScript =
    Box<dyn FnMut(&mut RenderTree, &mut DiffRequest<'_>) -> Result<Option<HostId>, RenderError>>;

/// Per-component render scripts, shared between a [`RecordingReconciler`]
/// and whoever keeps configuring it after it moved into a runtime.
#[derive(Clone, Default)]
pub struct ScriptTable(Rc<RefCell<HashMap<ComponentId, RenderScript>>>);

impl ScriptTable {
    pub fn set(
        &self,
        instance: ComponentId,
        script: impl FnMut(&mut RenderTree, &mut DiffRequest<'_>) -> Result<Option<HostId>, RenderError>
            + 'static,
    ) {
        self.0.borrow_mut().insert(instance, Box::new(script));
    }

    pub fn remove(&self, instance: ComponentId) -> bool {
        self.0.borrow_mut().remove(&instance).is_some()
    }

    pub fn contains(&self, instance: ComponentId) -> bool {
        self.0.borrow().contains_key(&instance)
    }

    fn run(
        &self,
        tree: &mut RenderTree,
        request: &mut DiffRequest<'_>,
    ) -> Option<Result<Option<HostId>, RenderError>> {
        let instance = request.instance.id();
        // Taken out while running so the script may edit the table.
        let mut script = self.0.borrow_mut().remove(&instance)?;
        let result = script(tree, request);
        self.0.borrow_mut().entry(instance).or_insert(script);
        Some(result)
    }
}

/// Reconciler that records each request and optionally runs a per-component
/// script in place of a real diff.
///
/// Without a script a render keeps the previous output and reports its first
/// host node.
#[derive(Default)]
pub struct RecordingReconciler {
    log: RenderLog,
    scripts: ScriptTable,
    fail_when: Option<Box<dyn Fn(&RenderRecord) -> bool>>,
}

impl RecordingReconciler {
    pub fn new() -> (Self, RenderLog) {
        let reconciler = Self::default();
        let log = reconciler.log.clone();
        (reconciler, log)
    }

    pub fn log(&self) -> RenderLog {
        self.log.clone()
    }

    pub fn scripts(&self) -> ScriptTable {
        self.scripts.clone()
    }

    pub fn script(
        self,
        instance: ComponentId,
        script: impl FnMut(&mut RenderTree, &mut DiffRequest<'_>) -> Result<Option<HostId>, RenderError>
            + 'static,
    ) -> Self {
        self.scripts.set(instance, script);
        self
    }

    /// Fails every render whose record matches `predicate`, after recording it.
    pub fn fail_when(mut self, predicate: impl Fn(&RenderRecord) -> bool + 'static) -> Self {
        self.fail_when = Some(Box::new(predicate));
        self
    }
}

impl Reconciler for RecordingReconciler {
    fn diff_and_commit(
        &mut self,
        tree: &mut RenderTree,
        mut request: DiffRequest<'_>,
    ) -> Result<Option<HostId>, RenderError> {
        let record = RenderRecord {
            instance: request.instance.id(),
            container: request.container,
            is_svg: request.is_svg,
            anchor: request.anchor,
            ancestor: request.ancestor,
            is_forced: request.is_forced,
            previous_host: request.previous_host,
            previous_parent: request.previous_parent,
        };
        let failed = self.fail_when.as_ref().is_some_and(|fail| fail(&record));
        let instance = record.instance;
        self.log.0.borrow_mut().records.push(record);
        if failed {
            return Err(RenderError::reconcile(format!(
                "scripted failure for component #{instance}"
            )));
        }
        self.scripts
            .run(tree, &mut request)
            .unwrap_or(Ok(request.previous_host))
    }

    fn commit_effects(
        &mut self,
        _tree: &mut RenderTree,
        mounted: Vec<InstanceRef>,
        root: NodeId,
    ) -> Result<(), RenderError> {
        self.log.0.borrow_mut().effects.push((root, mounted.len()));
        Ok(())
    }
}
