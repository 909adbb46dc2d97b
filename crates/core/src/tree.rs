//! In-memory host tree with synchronous change notification.
//!
//! `MemoryTree` is the reference [`HostTree`]: single-threaded, interior
//! mutability through `RefCell`, and listeners called after the internal
//! borrow is released so they can read and mutate the tree re-entrantly.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::error::{Result, TreeError};
use crate::host::{HostTree, Subscription};
use crate::node::{AttributeMap, AttributePatch, Node, NodeId};
use crate::snapshot::NodeSnapshot;

struct Entry {
    node: Node,
    children: Vec<NodeId>,
}

#[derive(Default)]
struct TreeState {
    entries: HashMap<NodeId, Entry>,
    roots: Vec<NodeId>,
}

type ListenerList = RefCell<Vec<(u64, Rc<dyn Fn()>)>>;

pub struct MemoryTree {
    state: RefCell<TreeState>,
    listeners: Rc<ListenerList>,
    next_listener: Cell<u64>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(TreeState::default()),
            listeners: Rc::new(RefCell::new(Vec::new())),
            next_listener: Cell::new(0),
        }
    }

    /// Build a tree from root snapshots, in order.
    pub fn from_snapshot(roots: Vec<NodeSnapshot>) -> Result<Self> {
        let tree = Self::new();
        for root in roots {
            tree.insert(None, None, root)?;
        }
        Ok(tree)
    }

    /// Insert a whole subtree under `parent` (or as a root) at `index`
    /// (appended when `None`). Returns the id of the subtree root.
    pub fn insert(
        &self,
        parent: Option<NodeId>,
        index: Option<usize>,
        subtree: NodeSnapshot,
    ) -> Result<NodeId> {
        let id = {
            let mut state = self.state.borrow_mut();
            let len = state.siblings(parent)?.len();
            let index = index.unwrap_or(len);
            if index > len {
                return Err(TreeError::IndexOutOfBounds { index, len });
            }
            state.check_new_ids(&subtree)?;
            let id = state.attach_subtree(parent, subtree);
            state.siblings_mut(parent)?.insert(index, id);
            id
        };
        trace!(node = %id, parent = ?parent, "inserted subtree");
        self.notify();
        Ok(id)
    }

    /// Insert a single childless node, appended under `parent`.
    pub fn insert_node(
        &self,
        parent: Option<NodeId>,
        type_name: &str,
        attributes: AttributeMap,
    ) -> Result<NodeId> {
        let mut snapshot = NodeSnapshot::new(type_name);
        snapshot.attributes = attributes;
        self.insert(parent, None, snapshot)
    }

    /// Detach `id` and its descendants, returning them as a snapshot.
    pub fn remove(&self, id: NodeId) -> Result<NodeSnapshot> {
        let removed = {
            let mut state = self.state.borrow_mut();
            let parent = state.entry(id)?.node.parent;
            state.siblings_mut(parent)?.retain(|c| *c != id);
            state.take_subtree(id).ok_or(TreeError::NodeNotFound(id))?
        };
        trace!(node = %id, count = removed.count(), "removed subtree");
        self.notify();
        Ok(removed)
    }

    /// Re-parent `id` (with its subtree) under `new_parent` at `index`.
    pub fn move_node(
        &self,
        id: NodeId,
        new_parent: Option<NodeId>,
        index: Option<usize>,
    ) -> Result<()> {
        {
            let mut state = self.state.borrow_mut();
            let old_parent = state.entry(id)?.node.parent;
            if let Some(parent) = new_parent {
                state.entry(parent)?;
                if parent == id || state.ancestors(parent).contains(&id) {
                    return Err(TreeError::Cycle { node: id, parent });
                }
            }

            let mut len = state.siblings(new_parent)?.len();
            if old_parent == new_parent {
                len -= 1;
            }
            let index = index.unwrap_or(len);
            if index > len {
                return Err(TreeError::IndexOutOfBounds { index, len });
            }

            state.siblings_mut(old_parent)?.retain(|c| *c != id);
            state.siblings_mut(new_parent)?.insert(index, id);
            state.entry_mut(id)?.node.parent = new_parent;
        }
        trace!(node = %id, parent = ?new_parent, "moved node");
        self.notify();
        Ok(())
    }

    /// Host-side attribute edit. Same effect as [`HostTree::apply_attributes`].
    pub fn set_attributes(&self, id: NodeId, patch: &AttributePatch) -> Result<()> {
        self.state.borrow_mut().entry_mut(id)?.node.apply_patch(patch);
        trace!(node = %id, keys = patch.len(), "updated attributes");
        self.notify();
        Ok(())
    }

    /// Current tree as nested snapshots, ids included.
    pub fn snapshot(&self) -> Vec<NodeSnapshot> {
        let state = self.state.borrow();
        state
            .roots
            .iter()
            .filter_map(|id| state.snapshot_of(*id))
            .collect()
    }

    pub fn roots(&self) -> Vec<NodeId> {
        self.state.borrow().roots.clone()
    }

    pub fn children(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.state.borrow().entry(id)?.children.clone())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.state.borrow().entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().entries.is_empty()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Call every listener. The listener list is cloned first so listeners
    /// may subscribe, unsubscribe or mutate the tree while being called.
    fn notify(&self) {
        let listeners: Vec<Rc<dyn Fn()>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in listeners {
            listener();
        }
    }
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl HostTree for MemoryTree {
    fn all_ids(&self) -> Vec<NodeId> {
        let state = self.state.borrow();
        let mut ids = Vec::with_capacity(state.entries.len());
        let mut stack: Vec<NodeId> = state.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            ids.push(id);
            if let Some(entry) = state.entries.get(&id) {
                stack.extend(entry.children.iter().rev().copied());
            }
        }
        ids
    }

    fn node(&self, id: NodeId) -> Option<Node> {
        self.state.borrow().entries.get(&id).map(|e| e.node.clone())
    }

    fn ancestor_chain(&self, id: NodeId, include_all: bool) -> Vec<NodeId> {
        let state = self.state.borrow();
        let mut chain = state.ancestors(id);
        if !include_all {
            chain.truncate(1);
        }
        chain
    }

    fn apply_attributes(&self, id: NodeId, patch: AttributePatch) -> Result<()> {
        self.set_attributes(id, &patch)
    }

    fn subscribe(&self, listener: Rc<dyn Fn()>) -> Subscription {
        let key = self.next_listener.get();
        self.next_listener.set(key + 1);
        self.listeners.borrow_mut().push((key, listener));

        let listeners: Weak<ListenerList> = Rc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.borrow_mut().retain(|(k, _)| *k != key);
            }
        })
    }
}

impl TreeState {
    fn entry(&self, id: NodeId) -> Result<&Entry> {
        self.entries.get(&id).ok_or(TreeError::NodeNotFound(id))
    }

    fn entry_mut(&mut self, id: NodeId) -> Result<&mut Entry> {
        self.entries.get_mut(&id).ok_or(TreeError::NodeNotFound(id))
    }

    fn siblings(&self, parent: Option<NodeId>) -> Result<&Vec<NodeId>> {
        match parent {
            None => Ok(&self.roots),
            Some(p) => Ok(&self.entry(p)?.children),
        }
    }

    fn siblings_mut(&mut self, parent: Option<NodeId>) -> Result<&mut Vec<NodeId>> {
        match parent {
            None => Ok(&mut self.roots),
            Some(p) => Ok(&mut self.entry_mut(p)?.children),
        }
    }

    /// Nearest-first parent chain. Stops at a dangling parent reference.
    fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.entries.get(&id).and_then(|e| e.node.parent);
        while let Some(parent) = current {
            chain.push(parent);
            current = self.entries.get(&parent).and_then(|e| e.node.parent);
        }
        chain
    }

    /// Reject explicit ids that already exist or repeat inside `subtree`.
    fn check_new_ids(&self, subtree: &NodeSnapshot) -> Result<()> {
        let mut seen = HashSet::new();
        let mut stack = vec![subtree];
        while let Some(snap) = stack.pop() {
            if let Some(id) = snap.id {
                if self.entries.contains_key(&id) || !seen.insert(id) {
                    return Err(TreeError::DuplicateId(id));
                }
            }
            stack.extend(snap.children.iter());
        }
        Ok(())
    }

    fn attach_subtree(&mut self, parent: Option<NodeId>, subtree: NodeSnapshot) -> NodeId {
        let id = subtree.id.unwrap_or_default();
        let children = subtree
            .children
            .into_iter()
            .map(|child| self.attach_subtree(Some(id), child))
            .collect();
        let node = Node {
            id,
            type_name: subtree.type_name,
            attributes: subtree.attributes,
            parent,
        };
        self.entries.insert(id, Entry { node, children });
        id
    }

    fn take_subtree(&mut self, id: NodeId) -> Option<NodeSnapshot> {
        let entry = self.entries.remove(&id)?;
        let children = entry
            .children
            .iter()
            .filter_map(|child| self.take_subtree(*child))
            .collect();
        Some(NodeSnapshot {
            id: Some(id),
            type_name: entry.node.type_name,
            attributes: entry.node.attributes,
            children,
        })
    }

    fn snapshot_of(&self, id: NodeId) -> Option<NodeSnapshot> {
        let entry = self.entries.get(&id)?;
        Some(NodeSnapshot {
            id: Some(id),
            type_name: entry.node.type_name.clone(),
            attributes: entry.node.attributes.clone(),
            children: entry
                .children
                .iter()
                .filter_map(|child| self.snapshot_of(*child))
                .collect(),
        })
    }
}
