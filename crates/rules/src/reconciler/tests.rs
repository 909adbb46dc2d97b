use std::cell::{Cell, RefCell};
use std::rc::Rc;

use inner_defaults_core::{
    AttrValue, AttributeMap, AttributePatch, HostTree, MemoryTree, Node, NodeId, NodeSnapshot,
    Subscription, TreeError, CLASS_ATTRIBUTE,
};

use super::*;
use crate::rule::Rule;

fn classes_of(tree: &MemoryTree, id: NodeId) -> Option<String> {
    tree.node(id)
        .and_then(|n| n.attributes.get(CLASS_ATTRIBUTE).cloned())
        .and_then(|v| v.as_str().map(str::to_string))
}

fn button_in_buttons() -> Rule {
    let mut rule = Rule::new("button");
    rule.parent_type = Some("buttons".into());
    rule.variation_class = Some("is-style-outline".into());
    rule
}

fn store(rules: Vec<Rule>) -> RuleStore {
    RuleStore::new(rules)
}

// ── Manual passes ───────────────────────────────────────────────────

#[test]
fn primed_nodes_are_never_processed() {
    let tree = MemoryTree::from_snapshot(vec![NodeSnapshot::new("buttons")
        .with_child(NodeSnapshot::new("button"))])
    .unwrap();
    let mut reconciler = Reconciler::new(store(vec![button_in_buttons()]));
    reconciler.prime(&tree);
    assert_eq!(reconciler.seen_len(), 2);

    let report = reconciler.handle_change(&tree);
    assert!(report.is_noop());
    for id in tree.all_ids() {
        assert_eq!(classes_of(&tree, id), None);
    }
}

#[test]
fn new_node_is_processed_once() {
    let tree = MemoryTree::new();
    let group = tree.insert_node(None, "buttons", AttributeMap::new()).unwrap();
    let mut reconciler = Reconciler::new(store(vec![button_in_buttons()]));
    reconciler.prime(&tree);

    let button = tree.insert_node(Some(group), "button", AttributeMap::new()).unwrap();
    let report = reconciler.handle_change(&tree);
    assert_eq!(report.discovered, 1);
    assert_eq!(report.updated, 1);
    assert_eq!(classes_of(&tree, button).as_deref(), Some("is-style-outline"));

    // A later user edit is left alone.
    let mut patch = AttributePatch::new();
    patch.insert(CLASS_ATTRIBUTE.into(), Some("is-style-fill".into()));
    tree.set_attributes(button, &patch).unwrap();
    let report = reconciler.handle_change(&tree);
    assert!(report.is_noop());
    assert_eq!(classes_of(&tree, button).as_deref(), Some("is-style-fill"));
}

#[test]
fn removed_then_reinserted_id_is_processed_again() {
    let tree = MemoryTree::new();
    let group = tree.insert_node(None, "buttons", AttributeMap::new()).unwrap();
    let mut reconciler = Reconciler::new(store(vec![button_in_buttons()]));
    reconciler.prime(&tree);

    let button = tree.insert_node(Some(group), "button", AttributeMap::new()).unwrap();
    reconciler.handle_change(&tree);

    let mut detached = tree.remove(button).unwrap();
    let report = reconciler.handle_change(&tree);
    assert_eq!(report.evicted, 1);
    assert!(!reconciler.is_seen(button));

    detached.attributes.shift_remove(CLASS_ATTRIBUTE);
    tree.insert(Some(group), None, detached).unwrap();
    let report = reconciler.handle_change(&tree);
    assert_eq!(report.updated, 1);
    assert_eq!(classes_of(&tree, button).as_deref(), Some("is-style-outline"));
}

#[test]
fn moved_node_is_not_reprocessed() {
    let tree = MemoryTree::new();
    let first = tree.insert_node(None, "buttons", AttributeMap::new()).unwrap();
    let second = tree.insert_node(None, "buttons", AttributeMap::new()).unwrap();
    let mut reconciler = Reconciler::new(store(vec![button_in_buttons()]));
    reconciler.prime(&tree);

    let button = tree.insert_node(Some(first), "button", AttributeMap::new()).unwrap();
    reconciler.handle_change(&tree);

    tree.move_node(button, Some(second), None).unwrap();
    let report = reconciler.handle_change(&tree);
    assert!(report.is_noop());
}

#[test]
fn inserted_and_removed_between_passes_is_never_seen() {
    let tree = MemoryTree::new();
    let group = tree.insert_node(None, "buttons", AttributeMap::new()).unwrap();
    let mut reconciler = Reconciler::new(store(vec![button_in_buttons()]));
    reconciler.prime(&tree);

    let button = tree.insert_node(Some(group), "button", AttributeMap::new()).unwrap();
    tree.remove(button).unwrap();
    let report = reconciler.handle_change(&tree);
    assert!(report.is_noop());
    assert_eq!(reconciler.seen_len(), 1);
}

#[test]
fn whole_subtree_is_processed_in_document_order() {
    let tree = MemoryTree::new();
    let mut group_rule = Rule::new("buttons");
    group_rule.add_classes = vec!["is-layout-flex".into()];
    let mut button_rule = Rule::new("button");
    button_rule.parent_type = Some("buttons".into());
    button_rule.parent_classes = vec!["is-layout-flex".into()];
    button_rule.add_classes = vec!["in-flex".into()];

    let mut reconciler = Reconciler::new(store(vec![group_rule, button_rule]));
    reconciler.prime(&tree);

    let group = tree
        .insert(
            None,
            None,
            NodeSnapshot::new("buttons")
                .with_child(NodeSnapshot::new("button"))
                .with_child(NodeSnapshot::new("button")),
        )
        .unwrap();
    let report = reconciler.handle_change(&tree);
    assert_eq!(report.discovered, 3);
    assert_eq!(report.updated, 3);

    // The parent is committed before its children are evaluated.
    for child in tree.children(group).unwrap() {
        assert_eq!(classes_of(&tree, child).as_deref(), Some("in-flex"));
    }
}

#[test]
fn ancestor_scope_follows_match_ancestors() {
    let tree = MemoryTree::new();
    let section = tree.insert_node(None, "section", AttributeMap::new()).unwrap();
    let column = tree.insert_node(Some(section), "column", AttributeMap::new()).unwrap();

    let mut near = Rule::new("card");
    near.parent_type = Some("section".into());
    near.add_classes = vec!["near".into()];
    let mut far = near.clone();
    far.match_ancestors = true;
    far.add_classes = vec!["far".into()];

    let mut reconciler = Reconciler::new(store(vec![near, far]));
    assert!(reconciler.rules().needs_full_ancestry());
    reconciler.prime(&tree);

    let card = tree.insert_node(Some(column), "card", AttributeMap::new()).unwrap();
    reconciler.handle_change(&tree);
    assert_eq!(classes_of(&tree, card).as_deref(), Some("far"));
}

#[test]
fn unconstrained_rule_matches_root_node() {
    let tree = MemoryTree::new();
    let mut rule = Rule::new("card");
    rule.add_classes = vec!["has-shadow".into()];
    let mut reconciler = Reconciler::new(store(vec![rule]));
    reconciler.prime(&tree);

    let card = tree.insert_node(None, "card", AttributeMap::new()).unwrap();
    reconciler.handle_change(&tree);
    assert_eq!(classes_of(&tree, card).as_deref(), Some("has-shadow"));
}

#[test]
fn constrained_rule_never_matches_root_node() {
    let tree = MemoryTree::new();
    let mut reconciler = Reconciler::new(store(vec![button_in_buttons()]));
    reconciler.prime(&tree);

    let button = tree.insert_node(None, "button", AttributeMap::new()).unwrap();
    let report = reconciler.handle_change(&tree);
    assert_eq!(report.unmatched, 1);
    assert_eq!(classes_of(&tree, button), None);
}

#[test]
fn several_rules_land_in_one_commit() {
    let tree = MemoryTree::new();
    let group = tree.insert_node(None, "buttons", AttributeMap::new()).unwrap();

    let mut size = Rule::new("button");
    size.parent_type = Some("buttons".into());
    size.remove_style_classes = false;
    size.attributes.values.insert("size".into(), "small".into());
    size.attributes.values.insert("width".into(), AttrValue::Int(50));
    let mut width = Rule::new("button");
    width.remove_style_classes = false;
    width.attributes.values.insert("width".into(), AttrValue::Int(100));

    let mut reconciler = Reconciler::new(store(vec![button_in_buttons(), size, width]));
    reconciler.prime(&tree);

    let commits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&commits);
    let _subscription = tree.subscribe(Rc::new(move || counter.set(counter.get() + 1)));

    let mut attributes = AttributeMap::new();
    attributes.insert(CLASS_ATTRIBUTE.into(), "is-style-fill custom".into());
    let button = tree.insert_node(Some(group), "button", attributes).unwrap();
    commits.set(0);

    reconciler.handle_change(&tree);
    assert_eq!(commits.get(), 1);

    let node = tree.node(button).unwrap();
    assert_eq!(
        node.attributes.get(CLASS_ATTRIBUTE).and_then(AttrValue::as_str),
        Some("custom is-style-outline")
    );
    assert_eq!(node.attributes.get("size").and_then(AttrValue::as_str), Some("small"));
    assert_eq!(node.attributes.get("width"), Some(&AttrValue::Int(100)));
}

#[test]
fn unmatched_parent_classes_leave_node_untouched() {
    let tree = MemoryTree::new();
    let group = tree.insert_node(None, "buttons", AttributeMap::new()).unwrap();
    let mut rule = button_in_buttons();
    rule.parent_classes = vec!["is-vertical".into()];
    let mut reconciler = Reconciler::new(store(vec![rule]));
    reconciler.prime(&tree);

    let button = tree.insert_node(Some(group), "button", AttributeMap::new()).unwrap();
    let report = reconciler.handle_change(&tree);
    assert_eq!(report.unmatched, 1);
    assert_eq!(tree.node(button).unwrap().attributes.len(), 0);
}

// ── Misbehaving hosts ───────────────────────────────────────────────

/// Wraps a memory tree, hiding one id from lookups and rejecting commits.
struct FlakyTree {
    inner: MemoryTree,
    hidden: Cell<Option<NodeId>>,
    reject_commits: bool,
}

impl HostTree for FlakyTree {
    fn all_ids(&self) -> Vec<NodeId> {
        self.inner.all_ids()
    }

    fn node(&self, id: NodeId) -> Option<Node> {
        if self.hidden.get() == Some(id) {
            return None;
        }
        self.inner.node(id)
    }

    fn ancestor_chain(&self, id: NodeId, include_all: bool) -> Vec<NodeId> {
        self.inner.ancestor_chain(id, include_all)
    }

    fn apply_attributes(&self, id: NodeId, patch: AttributePatch) -> inner_defaults_core::error::Result<()> {
        if self.reject_commits {
            return Err(TreeError::NodeNotFound(id));
        }
        self.inner.apply_attributes(id, patch)
    }

    fn subscribe(&self, listener: Rc<dyn Fn()>) -> Subscription {
        self.inner.subscribe(listener)
    }
}

#[test]
fn vanished_node_counts_as_missing() {
    let tree = FlakyTree {
        inner: MemoryTree::new(),
        hidden: Cell::new(None),
        reject_commits: false,
    };
    let mut reconciler = Reconciler::new(store(vec![Rule::new("card")]));
    reconciler.prime(&tree);

    let card = tree.inner.insert_node(None, "card", AttributeMap::new()).unwrap();
    tree.hidden.set(Some(card));
    let report = reconciler.handle_change(&tree);
    assert_eq!(report.missing, 1);
    assert_eq!(report.updated, 0);
    assert!(reconciler.is_seen(card));
}

#[test]
fn hidden_ancestor_never_satisfies() {
    let tree = FlakyTree {
        inner: MemoryTree::new(),
        hidden: Cell::new(None),
        reject_commits: false,
    };
    let group = tree.inner.insert_node(None, "buttons", AttributeMap::new()).unwrap();
    let mut reconciler = Reconciler::new(store(vec![button_in_buttons()]));
    reconciler.prime(&tree);

    tree.hidden.set(Some(group));
    tree.inner.insert_node(Some(group), "button", AttributeMap::new()).unwrap();
    let report = reconciler.handle_change(&tree);
    assert_eq!(report.unmatched, 1);
}

#[test]
fn rejected_commit_is_counted_not_raised() {
    let tree = FlakyTree {
        inner: MemoryTree::new(),
        hidden: Cell::new(None),
        reject_commits: true,
    };
    let mut reconciler = Reconciler::new(store(vec![Rule::new("card")]));
    reconciler.prime(&tree);

    tree.inner.insert_node(None, "card", AttributeMap::new()).unwrap();
    let report = reconciler.handle_change(&tree);
    assert_eq!(report.failed, 1);
    assert_eq!(reconciler.stats().failed, 1);
}

// ── Attached ────────────────────────────────────────────────────────

#[test]
fn attached_reconciler_converges_under_reentrant_notification() {
    let tree = Rc::new(MemoryTree::new());
    let group = tree.insert_node(None, "buttons", AttributeMap::new()).unwrap();
    let attachment = Reconciler::new(store(vec![button_in_buttons()])).attach(&tree);
    assert_eq!(attachment.seen_len(), 1);

    let button = tree.insert_node(Some(group), "button", AttributeMap::new()).unwrap();
    assert_eq!(classes_of(&tree, button).as_deref(), Some("is-style-outline"));

    let stats = attachment.stats();
    assert_eq!(stats.updated, 1);
    assert_eq!(stats.processed, 1);
    // The insert pass, plus one follow-up for the commit's own notification.
    assert_eq!(stats.passes, 2);
}

#[test]
fn other_listeners_see_the_commit() {
    let tree = Rc::new(MemoryTree::new());
    let group = tree.insert_node(None, "buttons", AttributeMap::new()).unwrap();
    let _attachment = Reconciler::new(store(vec![button_in_buttons()])).attach(&tree);

    let observed = Rc::new(Cell::new(0));
    let observer = Rc::clone(&observed);
    let weak = Rc::downgrade(&tree);
    let _subscription = tree.subscribe(Rc::new(move || {
        if let Some(tree) = weak.upgrade() {
            let styled = tree
                .all_ids()
                .into_iter()
                .filter(|id| classes_of(&tree, *id).is_some())
                .count();
            observer.set(styled);
        }
    }));

    tree.insert_node(Some(group), "button", AttributeMap::new()).unwrap();
    tree.insert_node(Some(group), "button", AttributeMap::new()).unwrap();
    assert_eq!(observed.get(), 2);
}

#[test]
fn detach_stops_processing() {
    let tree = Rc::new(MemoryTree::new());
    let group = tree.insert_node(None, "buttons", AttributeMap::new()).unwrap();
    let attachment = Reconciler::new(store(vec![button_in_buttons()])).attach(&tree);
    assert_eq!(tree.listener_count(), 1);

    let stats = attachment.detach();
    assert_eq!(stats.passes, 0);
    assert_eq!(tree.listener_count(), 0);

    let button = tree.insert_node(Some(group), "button", AttributeMap::new()).unwrap();
    assert_eq!(classes_of(&tree, button), None);
}

#[test]
fn node_reinserted_during_a_pass_is_processed_again() {
    let tree = Rc::new(MemoryTree::new());
    let group = tree.insert_node(None, "buttons", AttributeMap::new()).unwrap();
    let existing = tree.insert_node(Some(group), "button", AttributeMap::new()).unwrap();
    let attachment = Reconciler::new(store(vec![button_in_buttons()])).attach(&tree);

    // Once the new button has been committed, a second listener pulls the
    // existing button out and puts it back, still inside the reconciler's pass.
    let new_button = Rc::new(Cell::new(None::<NodeId>));
    let armed = Rc::new(Cell::new(true));
    let (target, flag, weak) = (Rc::clone(&new_button), Rc::clone(&armed), Rc::downgrade(&tree));
    let _subscription = tree.subscribe(Rc::new(move || {
        let (Some(tree), Some(id)) = (weak.upgrade(), target.get()) else {
            return;
        };
        if flag.get() && classes_of(&tree, id).is_some() {
            flag.set(false);
            let snapshot = tree.remove(existing).unwrap();
            tree.insert(Some(group), Some(0), snapshot).unwrap();
        }
    }));

    let mut snapshot = NodeSnapshot::new("button");
    let id = NodeId::new();
    snapshot.id = Some(id);
    new_button.set(Some(id));
    tree.insert(Some(group), None, snapshot).unwrap();

    assert!(!armed.get());
    assert_eq!(classes_of(&tree, id).as_deref(), Some("is-style-outline"));
    assert_eq!(classes_of(&tree, existing).as_deref(), Some("is-style-outline"));

    let stats = attachment.stats();
    assert_eq!(stats.processed, 2);
    assert_eq!(stats.updated, 2);
    assert_eq!(stats.evicted, 1);
}

#[test]
fn stats_are_readable_from_another_listener_mid_pass() {
    let tree = Rc::new(MemoryTree::new());
    let group = tree.insert_node(None, "buttons", AttributeMap::new()).unwrap();
    let attachment = Rc::new(Reconciler::new(store(vec![button_in_buttons()])).attach(&tree));

    let observed = Rc::new(RefCell::new(Vec::new()));
    let (log, watched) = (Rc::clone(&observed), Rc::clone(&attachment));
    let _subscription = tree.subscribe(Rc::new(move || {
        log.borrow_mut()
            .push((watched.stats().updated, watched.seen_len()));
    }));

    tree.insert_node(Some(group), "button", AttributeMap::new()).unwrap();

    // First from inside the pass (last finished totals), then after it.
    assert_eq!(*observed.borrow(), vec![(0, 1), (1, 2)]);
}
