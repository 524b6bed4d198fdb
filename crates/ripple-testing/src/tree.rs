//! Builders for render trees in tests.
//!
//! Each helper creates a node and attaches it under `parent`: appended as the
//! last child of a group or host leaf, or installed as the output of a
//! component node. The helpers panic on arena errors.

use ripple_core::{ComponentId, HostId, NodeId, NodeKind, RenderTree};

pub fn host(tree: &mut RenderTree, parent: Option<NodeId>, host: HostId) -> NodeId {
    attach(tree, parent, NodeKind::HostLeaf { host })
}

pub fn group(tree: &mut RenderTree, parent: Option<NodeId>) -> NodeId {
    attach(tree, parent, NodeKind::TransparentGroup)
}

pub fn component(tree: &mut RenderTree, parent: Option<NodeId>, instance: ComponentId) -> NodeId {
    attach(
        tree,
        parent,
        NodeKind::ComponentHost {
            instance,
            output: None,
        },
    )
}

/// `depth` transparent groups nested in one another. Returns the outermost
/// and innermost group.
pub fn group_chain(tree: &mut RenderTree, depth: usize) -> (NodeId, NodeId) {
    let root = group(tree, None);
    let mut innermost = root;
    for _ in 1..depth {
        innermost = group(tree, Some(innermost));
    }
    (root, innermost)
}

/// Number of component nodes strictly above `node`.
pub fn component_depth(tree: &RenderTree, node: NodeId) -> usize {
    let mut depth = 0;
    let mut current = node;
    while let Some((ancestor, _)) = tree.ancestor_component(current) {
        depth += 1;
        current = ancestor;
    }
    depth
}

fn attach(tree: &mut RenderTree, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
    let id = tree.create(kind);
    let Some(parent) = parent else {
        return id;
    };
    let result = match tree.kind(parent) {
        Ok(NodeKind::ComponentHost { .. }) => tree.set_output(parent, Some(id)).map(|_| ()),
        Ok(_) => tree.append_child(parent, id),
        Err(err) => Err(err),
    };
    if let Err(err) = result {
        panic!("cannot attach node {id} under {parent}: {err}");
    }
    id
}
