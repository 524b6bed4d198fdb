//! Arena of render nodes describing the logical output tree.
//!
//! Parent and sibling links are plain indices into the arena and never own
//! anything; ownership flows from a node to its children and from a
//! component node to its previous output.

use std::fmt::Write as _;

use crate::{ComponentId, HostId, NodeError, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Owns exactly one node in the host tree.
    HostLeaf { host: HostId },
    /// Groups children without producing a host node.
    TransparentGroup,
    /// Output of one component instance; `output` is its most recently
    /// committed render.
    ComponentHost {
        instance: ComponentId,
        output: Option<NodeId>,
    },
}

impl NodeKind {
    pub fn is_host(&self) -> bool {
        matches!(self, NodeKind::HostLeaf { .. })
    }

    /// Transparent kinds contribute no host node of their own.
    pub fn is_transparent(&self) -> bool {
        !self.is_host()
    }
}

#[derive(Debug, Clone)]
pub struct RenderNode {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl RenderNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            next_sibling: None,
            children: Vec::new(),
        }
    }

    pub fn host(&self) -> Option<HostId> {
        match self.kind {
            NodeKind::HostLeaf { host } => Some(host),
            _ => None,
        }
    }
}

#[derive(Default)]
pub struct RenderTree {
    nodes: Vec<Option<RenderNode>>,
    free: Vec<NodeId>,
}

impl RenderTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let node = RenderNode::new(kind);
        if let Some(id) = self.free.pop() {
            self.nodes[id] = Some(node);
            id
        } else {
            let id = self.nodes.len();
            self.nodes.push(Some(node));
            id
        }
    }

    pub fn get(&self, id: NodeId) -> Result<&RenderNode, NodeError> {
        self.nodes
            .get(id)
            .and_then(Option::as_ref)
            .ok_or(NodeError::Missing { id })
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut RenderNode, NodeError> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(NodeError::Missing { id })
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_ok()
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self, id: NodeId) -> Result<NodeKind, NodeError> {
        self.get(id).map(|node| node.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).ok().and_then(|node| node.parent)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).ok().and_then(|node| node.next_sibling)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn host(&self, id: NodeId) -> Option<HostId> {
        self.get(id).ok().and_then(RenderNode::host)
    }

    /// Previous output of a component node.
    pub fn output(&self, id: NodeId) -> Option<NodeId> {
        match self.get(id).ok()?.kind {
            NodeKind::ComponentHost { output, .. } => output,
            _ => None,
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        self.insert_before(parent, child, None)
    }

    /// Inserts `child` under `parent` ahead of `before`, or last when `before`
    /// is `None`. The child is detached from any previous position first.
    /// On error the tree is left as it was.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        before: Option<NodeId>,
    ) -> Result<(), NodeError> {
        if parent == child {
            return Err(NodeError::InvalidParent { id: parent });
        }
        if let NodeKind::ComponentHost { .. } = self.get(parent)?.kind {
            return Err(NodeError::InvalidParent { id: parent });
        }
        self.get(child)?;
        if let Some(anchor) = before {
            if anchor == child || self.get(anchor)?.parent != Some(parent) {
                return Err(NodeError::Missing { id: anchor });
            }
        }
        self.detach(child)?;

        let siblings = &self.get(parent)?.children;
        let index = match before {
            Some(anchor) => siblings
                .iter()
                .position(|&id| id == anchor)
                .ok_or(NodeError::Missing { id: anchor })?,
            None => siblings.len(),
        };
        let previous = index.checked_sub(1).map(|i| siblings[i]);

        self.get_mut(parent)?.children.insert(index, child);
        {
            let node = self.get_mut(child)?;
            node.parent = Some(parent);
            node.next_sibling = before;
        }
        if let Some(previous) = previous {
            self.get_mut(previous)?.next_sibling = Some(child);
        }
        Ok(())
    }

    /// Replaces the previous output of a component node. The old output is
    /// detached but stays allocated; pass it to [`RenderTree::remove`] to free it.
    pub fn set_output(
        &mut self,
        component: NodeId,
        output: Option<NodeId>,
    ) -> Result<Option<NodeId>, NodeError> {
        let previous = match self.get(component)?.kind {
            NodeKind::ComponentHost { output, .. } => output,
            _ => return Err(NodeError::InvalidParent { id: component }),
        };
        if let Some(output) = output {
            self.detach(output)?;
        }
        if let Some(previous) = previous.filter(|&prev| Some(prev) != output) {
            if let Ok(node) = self.get_mut(previous) {
                node.parent = None;
            }
        }
        if let NodeKind::ComponentHost { output: slot, .. } = &mut self.get_mut(component)?.kind {
            *slot = output;
        }
        if let Some(output) = output {
            let node = self.get_mut(output)?;
            node.parent = Some(component);
            node.next_sibling = None;
        }
        Ok(previous)
    }

    /// Unlinks a node from its parent and siblings without freeing it.
    pub fn detach(&mut self, id: NodeId) -> Result<(), NodeError> {
        let Some(parent) = self.get(id)?.parent else {
            return Ok(());
        };
        let next = self.get(id)?.next_sibling;
        match self.get(parent).map(|node| node.kind) {
            Ok(NodeKind::ComponentHost { output, .. }) => {
                if output == Some(id) {
                    if let NodeKind::ComponentHost { output, .. } =
                        &mut self.get_mut(parent)?.kind
                    {
                        *output = None;
                    }
                }
            }
            Ok(_) => {
                let siblings = &mut self.get_mut(parent)?.children;
                if let Some(index) = siblings.iter().position(|&child| child == id) {
                    siblings.remove(index);
                    let previous = index.checked_sub(1).map(|i| siblings[i]);
                    if let Some(previous) = previous {
                        self.get_mut(previous)?.next_sibling = next;
                    }
                }
            }
            // Parent already freed; only the child's own links remain.
            Err(_) => {}
        }
        let node = self.get_mut(id)?;
        node.parent = None;
        node.next_sibling = None;
        Ok(())
    }

    /// Detaches and frees a whole subtree, returning the components it held
    /// in document order.
    pub fn remove(&mut self, id: NodeId) -> Result<Vec<ComponentId>, NodeError> {
        self.detach(id)?;
        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get_mut(current).and_then(Option::take) else {
                continue;
            };
            self.free.push(current);
            match node.kind {
                NodeKind::ComponentHost { instance, output } => {
                    removed.push(instance);
                    stack.extend(output);
                }
                _ => stack.extend(node.children.iter().rev()),
            }
        }
        Ok(removed)
    }

    /// Lists `child` under `group` without touching the child's own links.
    pub(crate) fn adopt_unlinked(&mut self, group: NodeId, child: NodeId) {
        if let Ok(node) = self.get_mut(group) {
            node.children.push(child);
        }
    }

    /// Frees `group` alone, leaving its listed children where they are.
    pub(crate) fn release_unlinked(&mut self, group: NodeId) {
        if self.nodes.get_mut(group).and_then(Option::take).is_some() {
            self.free.push(group);
        }
    }

    /// First host reference of a subtree in document order.
    pub fn first_host(&self, id: NodeId) -> Option<HostId> {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Ok(node) = self.get(current) else {
                continue;
            };
            match node.kind {
                NodeKind::HostLeaf { host } => return Some(host),
                NodeKind::ComponentHost { output, .. } => stack.extend(output),
                NodeKind::TransparentGroup => stack.extend(node.children.iter().rev()),
            }
        }
        None
    }

    /// Nearest enclosing component node, not counting `id` itself.
    pub fn ancestor_component(&self, id: NodeId) -> Option<(NodeId, ComponentId)> {
        let mut current = self.parent(id);
        let mut hops = 0;
        while let Some(node_id) = current {
            if hops > self.nodes.len() {
                return None;
            }
            hops += 1;
            let node = self.get(node_id).ok()?;
            if let NodeKind::ComponentHost { instance, .. } = node.kind {
                return Some((node_id, instance));
            }
            current = node.parent;
        }
        None
    }

    pub fn dump_tree(&self, root: Option<NodeId>) -> String {
        let mut output = String::new();
        let Some(root) = root else {
            output.push_str("(no root)\n");
            return output;
        };
        let mut stack = vec![(root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let indent = "  ".repeat(depth);
            match self.get(id) {
                Ok(node) => {
                    let _ = match node.kind {
                        NodeKind::HostLeaf { host } => {
                            writeln!(output, "{indent}[{id}] host #{host}")
                        }
                        NodeKind::TransparentGroup => writeln!(output, "{indent}[{id}] group"),
                        NodeKind::ComponentHost { instance, .. } => {
                            writeln!(output, "{indent}[{id}] component #{instance}")
                        }
                    };
                    match node.kind {
                        NodeKind::ComponentHost { output: out, .. } => {
                            stack.extend(out.map(|child| (child, depth + 1)));
                        }
                        _ => stack.extend(node.children.iter().rev().map(|&c| (c, depth + 1))),
                    }
                }
                Err(_) => {
                    let _ = writeln!(output, "{indent}[{id}] (missing)");
                }
            }
        }
        output
    }
}
