//! Rule matching against a node and its ancestors, and the accumulated
//! class/attribute transformation of every matching rule.

use inner_defaults_core::{AttrValue, AttributeMap, AttributePatch, ClassList, Node, CLASS_ATTRIBUTE};

use crate::rule::{Rule, RuleStore, STYLE_CLASS_PREFIX};

// ── Matching ────────────────────────────────────────────────────────

/// Step 1: the node's type must equal the rule target. An empty target
/// matches nothing.
pub fn targets(rule: &Rule, node: &Node) -> bool {
    !rule.target_type.is_empty() && node.type_name == rule.target_type
}

/// The ancestors a rule may look at: the immediate parent only, or the
/// whole nearest-first chain when `match_ancestors` is set.
pub fn candidates<'a>(rule: &Rule, ancestors: &'a [Option<Node>]) -> &'a [Option<Node>] {
    if rule.match_ancestors {
        ancestors
    } else {
        &ancestors[..ancestors.len().min(1)]
    }
}

/// Type and class constraints checked against one ancestor.
pub fn ancestor_satisfies(rule: &Rule, ancestor: &Node) -> bool {
    if let Some(parent_type) = rule.parent_type() {
        if ancestor.type_name != parent_type {
            return false;
        }
    }

    if !rule.parent_classes.is_empty() {
        let classes = ancestor.class_list();
        if !classes.is_superset_of(rule.parent_classes.iter().map(String::as_str)) {
            return false;
        }
    }

    true
}

/// Steps 3-5: vacuously true without a constraint, otherwise at least one
/// resolvable candidate must satisfy it. Which candidate satisfied it is
/// irrelevant; this is an existence test.
pub fn ancestors_satisfy(rule: &Rule, ancestors: &[Option<Node>]) -> bool {
    if !rule.has_ancestor_constraint() {
        return true;
    }
    candidates(rule, ancestors)
        .iter()
        .flatten()
        .any(|ancestor| ancestor_satisfies(rule, ancestor))
}

/// Full match test. `ancestors` is the nearest-first chain; unresolvable
/// entries are `None`.
pub fn rule_matches(rule: &Rule, node: &Node, ancestors: &[Option<Node>]) -> bool {
    targets(rule, node) && ancestors_satisfy(rule, ancestors)
}

// ── Application ─────────────────────────────────────────────────────

/// Working copy of a node's classes and the attributes merged into it,
/// accumulated over every matching rule in store order.
#[derive(Debug, Clone)]
pub struct NodeTransform {
    classes: ClassList,
    values: AttributeMap,
    applied: usize,
}

impl NodeTransform {
    pub fn from_node(node: &Node) -> Self {
        Self {
            classes: node.class_list(),
            values: AttributeMap::new(),
            applied: 0,
        }
    }

    /// Fold one matching rule into the working copy.
    pub fn apply(&mut self, rule: &Rule) {
        if rule.remove_style_classes {
            self.classes.strip_prefix_tokens(STYLE_CLASS_PREFIX);
        }

        if let Some(variation) = rule.variation_class.as_deref() {
            self.classes.push(variation);
        }

        self.classes
            .extend(rule.add_classes.iter().map(String::as_str));
        self.classes.extend(rule.attributes.classes.iter());

        for (key, value) in &rule.attributes.values {
            if key == CLASS_ATTRIBUTE {
                continue;
            }
            self.values.insert(key.clone(), value.clone());
        }

        self.applied += 1;
    }

    pub fn classes(&self) -> &ClassList {
        &self.classes
    }

    pub fn values(&self) -> &AttributeMap {
        &self.values
    }

    /// Number of rules folded in so far.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// The single attribute update to commit: the serialized class list
    /// (unset when empty) followed by the merged values.
    pub fn into_patch(self) -> AttributePatch {
        let mut patch = AttributePatch::with_capacity(self.values.len() + 1);
        patch.insert(
            CLASS_ATTRIBUTE.to_string(),
            self.classes.to_attr().map(AttrValue::String),
        );
        for (key, value) in self.values {
            patch.insert(key, Some(value));
        }
        patch
    }
}

/// Run every rule in `store` against `node`.
///
/// `load_ancestors` is called at most once, and only when a rule that
/// targets this node has an ancestor constraint. Returns `None` when no
/// rule matched.
pub fn evaluate<F>(store: &RuleStore, node: &Node, load_ancestors: F) -> Option<NodeTransform>
where
    F: FnOnce() -> Vec<Option<Node>>,
{
    let mut load = Some(load_ancestors);
    let mut ancestors = Vec::new();
    let mut transform: Option<NodeTransform> = None;

    for rule in store {
        if !targets(rule, node) {
            continue;
        }
        if rule.has_ancestor_constraint() {
            if let Some(load) = load.take() {
                ancestors = load();
            }
            if !ancestors_satisfy(rule, &ancestors) {
                continue;
            }
        }
        transform
            .get_or_insert_with(|| NodeTransform::from_node(node))
            .apply(rule);
    }

    transform
}
