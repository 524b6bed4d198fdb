//! Lookup of the host node that must follow freshly rendered output.
//!
//! Transparent groups and components own no host node, so the insertion
//! point for a node is the first host node found among its following
//! siblings (searching inside transparent siblings), escaping upward through
//! transparent parents until a host-owning parent closes the container.

use crate::collections::NodeSet;
use crate::node::{NodeKind, RenderTree};
use crate::{HostId, NodeId};

enum Frame {
    /// Continue with the siblings that follow this node.
    After(NodeId),
    /// Search this subtree in document order.
    Within(NodeId),
}

/// Returns the host node that newly attached output for `node` must be
/// inserted before, or `None` when it belongs at the end of its container.
///
/// Runs on an explicit work stack so arbitrarily deep trees cannot overflow
/// the call stack; every node is expanded at most once per frame kind, which
/// keeps half-updated trees with stale links from looping.
pub fn nearest_following_host(tree: &RenderTree, node: NodeId) -> Option<HostId> {
    let mut stack = vec![Frame::After(node)];
    let mut climbed = NodeSet::default();
    let mut searched = NodeSet::default();

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::After(id) => {
                if !climbed.insert(id) {
                    continue;
                }
                match tree.next_sibling(id) {
                    Some(next) => {
                        // `Within(next)` pops first: siblings are searched before moving on.
                        stack.push(Frame::After(next));
                        stack.push(Frame::Within(next));
                    }
                    None => {
                        let parent = tree.parent(id).filter(|&parent| {
                            tree.kind(parent)
                                .map(|kind| kind.is_transparent())
                                .unwrap_or(false)
                        });
                        if let Some(parent) = parent {
                            stack.push(Frame::After(parent));
                        }
                    }
                }
            }
            Frame::Within(id) => {
                if id == node || !searched.insert(id) {
                    continue;
                }
                let Ok(candidate) = tree.get(id) else {
                    continue;
                };
                match candidate.kind {
                    NodeKind::HostLeaf { host } => return Some(host),
                    NodeKind::TransparentGroup => {
                        stack.extend(candidate.children.iter().rev().map(|&c| Frame::Within(c)));
                    }
                    NodeKind::ComponentHost { output, .. } => {
                        stack.extend(output.map(Frame::Within));
                    }
                }
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "tests/sibling_tests.rs"]
mod tests;
