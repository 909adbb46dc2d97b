//! Host tree collaborator interface.
//!
//! The host owns node lifetime. Consumers read snapshots, push attribute
//! updates and subscribe to change notifications; they never hold nodes.

use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::node::{AttributePatch, Node, NodeId};

/// Read/mutate/subscribe surface of a live, mutable node tree.
///
/// All methods take `&self`: mutation goes through the host's own interior
/// mutability, and `apply_attributes` may synchronously invoke subscribed
/// listeners before it returns.
pub trait HostTree {
    /// Every node id currently in the tree, descendants included, pre-order.
    fn all_ids(&self) -> Vec<NodeId>;

    /// Snapshot of a node, or `None` if the id no longer resolves.
    fn node(&self, id: NodeId) -> Option<Node>;

    /// Ancestors of `id`, nearest first.
    ///
    /// With `include_all == false` this is at most the immediate parent.
    fn ancestor_chain(&self, id: NodeId, include_all: bool) -> Vec<NodeId>;

    /// Commit an attribute update to a node.
    fn apply_attributes(&self, id: NodeId, patch: AttributePatch) -> Result<()>;

    /// Register a listener invoked after every tree mutation.
    fn subscribe(&self, listener: Rc<dyn Fn()>) -> Subscription;
}

/// Handle returned by [`HostTree::subscribe`].
///
/// Dropping the handle leaves the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle with nothing to cancel.
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
