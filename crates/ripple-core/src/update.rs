//! Synchronous re-render of a single component.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;

use crate::component::{Callback, InstanceRef};
use crate::node::{NodeKind, RenderTree};
use crate::reconciler::{DiffRequest, Reconciler};
use crate::sibling::nearest_following_host;
use crate::{HostId, NodeId, RenderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The instance was not mounted; nothing ran.
    Skipped,
    /// The reconciler committed new output whose first host node is `host`.
    Rendered { host: Option<HostId> },
}

/// Owns the render tree and drives the external reconciler.
pub struct UpdateDriver {
    tree: RefCell<RenderTree>,
    reconciler: RefCell<Box<dyn Reconciler>>,
}

impl UpdateDriver {
    pub fn new(reconciler: impl Reconciler + 'static) -> Self {
        Self::with_tree(RenderTree::new(), reconciler)
    }

    pub fn with_tree(tree: RenderTree, reconciler: impl Reconciler + 'static) -> Self {
        Self {
            tree: RefCell::new(tree),
            reconciler: RefCell::new(Box::new(reconciler)),
        }
    }

    pub fn tree(&self) -> Ref<'_, RenderTree> {
        self.tree.borrow()
    }

    pub fn tree_mut(&self) -> RefMut<'_, RenderTree> {
        self.tree.borrow_mut()
    }

    /// Re-renders `instance` in place.
    ///
    /// Unmounted instances are skipped without invoking anything. Otherwise
    /// the reconciler runs, then mount effects, then the instance's queued
    /// callbacks in order, then `callback`.
    pub fn force_update(
        &self,
        instance: &InstanceRef,
        is_forced: bool,
        callback: Option<Callback>,
    ) -> Result<UpdateOutcome, RenderError> {
        let Some((node, anchor)) = instance.mount_position() else {
            log::trace!("component #{} not mounted; skipping update", instance.id());
            return Ok(UpdateOutcome::Skipped);
        };

        let host = {
            let mut tree = self
                .tree
                .try_borrow_mut()
                .map_err(|_| RenderError::Reentrant)?;
            let mut reconciler = self
                .reconciler
                .try_borrow_mut()
                .map_err(|_| RenderError::Reentrant)?;

            tree.get(node)?;
            let previous_host = tree.output(node).and_then(|output| tree.first_host(output));
            let previous_parent = tree.parent(node);
            let ancestor = tree.ancestor_component(node).map(|(_, id)| id);
            let insert_before = nearest_following_host(&tree, node);
            log::debug!(
                "rendering component #{} (forced: {is_forced}, anchor: {insert_before:?})",
                instance.id()
            );

            let old_group = wrap(&mut tree, node);
            let new_group = wrap(&mut tree, node);
            let mut mounted = Vec::new();
            let result = reconciler.diff_and_commit(
                &mut tree,
                DiffRequest {
                    instance,
                    container: anchor.container,
                    old_group,
                    new_group,
                    context: instance.context(),
                    is_svg: anchor.svg,
                    anchor: insert_before,
                    mounted: &mut mounted,
                    ancestor,
                    is_forced,
                    previous_host,
                    previous_parent,
                },
            );
            release(&mut tree, old_group);
            release(&mut tree, new_group);
            let host = result?;
            reconciler.commit_effects(&mut tree, mounted, node)?;
            host
        };

        instance.run_callbacks();
        if let Some(callback) = callback {
            callback();
        }
        Ok(UpdateOutcome::Rendered { host })
    }
}

impl fmt::Debug for UpdateDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nodes = self.tree.try_borrow().map(|tree| tree.len()).ok();
        f.debug_struct("UpdateDriver").field("nodes", &nodes).finish()
    }
}

/// Synthetic group listing `node` as its only child without re-parenting it.
fn wrap(tree: &mut RenderTree, node: NodeId) -> NodeId {
    let group = tree.create(NodeKind::TransparentGroup);
    tree.adopt_unlinked(group, node);
    group
}

fn release(tree: &mut RenderTree, group: NodeId) {
    tree.release_unlinked(group);
}

#[cfg(test)]
#[path = "tests/update_tests.rs"]
mod tests;
