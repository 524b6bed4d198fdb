//! Contract of the external tree-diffing reconciler.

use crate::component::InstanceRef;
use crate::context::Context;
use crate::node::RenderTree;
use crate::{ComponentId, HostId, NodeId, RenderError};

/// Everything the reconciler needs to re-render one component in place.
///
/// `old_group` and `new_group` are synthetic transparent groups whose only
/// child is the component's render node. The child's own parent and sibling
/// links are untouched, so positional lookups from it still see the real tree.
pub struct DiffRequest<'a> {
    /// Component being re-rendered.
    pub instance: &'a InstanceRef,
    /// Host container the component's output is attached under.
    pub container: HostId,
    pub old_group: NodeId,
    pub new_group: NodeId,
    pub context: Context,
    pub is_svg: bool,
    /// Existing host node new output must be inserted before; `None` appends.
    pub anchor: Option<HostId>,
    /// Receives every component instance mounted during this diff.
    pub mounted: &'a mut Vec<InstanceRef>,
    /// Nearest enclosing component, for error and context propagation.
    pub ancestor: Option<ComponentId>,
    /// Bypass user-level "skip update" hooks.
    pub is_forced: bool,
    /// First host node of the previous output.
    pub previous_host: Option<HostId>,
    pub previous_parent: Option<NodeId>,
}

pub trait Reconciler {
    /// Diffs the groups of `request`, mutates the host tree, and returns the
    /// first host node of the new output. Implementations may enqueue other
    /// components on the scheduler while running, but must not call
    /// `force_update` synchronously.
    fn diff_and_commit(
        &mut self,
        tree: &mut RenderTree,
        request: DiffRequest<'_>,
    ) -> Result<Option<HostId>, RenderError>;

    /// Runs mount-time side effects for the instances a diff mounted.
    fn commit_effects(
        &mut self,
        _tree: &mut RenderTree,
        _mounted: Vec<InstanceRef>,
        _root: NodeId,
    ) -> Result<(), RenderError> {
        Ok(())
    }
}
