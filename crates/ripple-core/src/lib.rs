#![doc = r"Update scheduling and reconciliation core for the Ripple component renderer."]

pub mod collections;
pub mod component;
pub mod context;
pub mod node;
pub mod platform;
pub mod reconciler;
pub mod runtime;
pub mod scheduler;
pub mod sibling;
pub mod state;
pub mod update;

pub use component::{Callback, Component, ComponentCore, HostAnchor, InstanceRef, StateUpdate};
pub use context::{Context, ContextKey};
pub use node::{NodeKind, RenderNode, RenderTree};
pub use platform::{FlushTask, FlushTrigger, ImmediateTrigger};
pub use reconciler::{DiffRequest, Reconciler};
pub use runtime::Runtime;
pub use scheduler::{FlushStats, Scheduler, SchedulerHandle};
pub use sibling::nearest_following_host;
pub use state::State;
pub use update::{UpdateDriver, UpdateOutcome};

use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Index of a [`RenderNode`] inside a [`RenderTree`].
pub type NodeId = usize;
/// Ownership-free reference to a node in the external host tree.
pub type HostId = usize;
/// Process-unique identity of a component instance.
pub type ComponentId = usize;

static NEXT_COMPONENT_ID: AtomicUsize = AtomicUsize::new(1);

pub(crate) fn next_component_id() -> ComponentId {
    NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    Missing { id: NodeId },
    InvalidParent { id: NodeId },
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::Missing { id } => write!(f, "render node {id} missing"),
            NodeError::InvalidParent { id } => {
                write!(f, "render node {id} cannot hold children")
            }
        }
    }
}

impl Error for NodeError {}

/// Failure surfaced while re-rendering a component.
#[derive(Debug)]
pub enum RenderError {
    /// The render-node arena rejected an operation.
    Node(NodeError),
    /// `force_update` was called while the update driver was already rendering.
    Reentrant,
    /// Error raised by the external reconciler.
    Reconcile(Box<dyn Error + 'static>),
}

impl RenderError {
    pub fn reconcile(err: impl Into<Box<dyn Error + 'static>>) -> Self {
        RenderError::Reconcile(err.into())
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Node(err) => write!(f, "{err}"),
            RenderError::Reentrant => {
                write!(f, "force_update called while a render is in progress")
            }
            RenderError::Reconcile(err) => write!(f, "reconcile failed: {err}"),
        }
    }
}

impl Error for RenderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RenderError::Node(err) => Some(err),
            RenderError::Reentrant => None,
            RenderError::Reconcile(err) => Some(err.as_ref()),
        }
    }
}

impl From<NodeError> for RenderError {
    fn from(err: NodeError) -> Self {
        RenderError::Node(err)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
