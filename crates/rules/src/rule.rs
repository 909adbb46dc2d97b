//! Validated rule records and the immutable, ordered rule store.

use inner_defaults_core::{AttributeMap, ClassList};

/// Reserved prefix of variation ("style") class tokens.
pub const STYLE_CLASS_PREFIX: &str = "is-style-";

/// Extra attributes a rule merges into a matching node.
///
/// Class tokens given under the reserved class key are kept apart from the
/// plain values so they join the class-list computation instead of
/// overwriting it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleAttributes {
    pub classes: ClassList,
    pub values: AttributeMap,
}

impl RuleAttributes {
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.values.is_empty()
    }
}

/// A single declarative rule: "a `target_type` node inserted under a
/// matching ancestor gets these classes and attributes".
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub target_type: String,
    pub parent_type: Option<String>,
    /// Tokens the matching ancestor must carry (subset test).
    pub parent_classes: Vec<String>,
    /// Consider every ancestor up to the root, not only the immediate parent.
    pub match_ancestors: bool,
    pub variation_class: Option<String>,
    pub add_classes: Vec<String>,
    pub attributes: RuleAttributes,
    /// Strip existing [`STYLE_CLASS_PREFIX`] tokens before adding the variation.
    pub remove_style_classes: bool,
}

impl Rule {
    /// A rule for `target_type` with no constraint and no effect.
    pub fn new(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            parent_type: None,
            parent_classes: Vec::new(),
            match_ancestors: false,
            variation_class: None,
            add_classes: Vec::new(),
            attributes: RuleAttributes::default(),
            remove_style_classes: true,
        }
    }

    /// Required ancestor type, with an empty string read as "none".
    pub fn parent_type(&self) -> Option<&str> {
        self.parent_type.as_deref().filter(|t| !t.is_empty())
    }

    /// Whether matching depends on the ancestor chain at all.
    pub fn has_ancestor_constraint(&self) -> bool {
        self.parent_type().is_some() || !self.parent_classes.is_empty()
    }
}

/// Immutable, ordered rule sequence. Order is the tie-break order when
/// several rules match one node.
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    rules: Vec<Rule>,
    needs_full_ancestry: bool,
}

impl RuleStore {
    pub fn new(rules: Vec<Rule>) -> Self {
        let needs_full_ancestry = rules
            .iter()
            .any(|r| r.match_ancestors && r.has_ancestor_constraint());
        Self {
            rules,
            needs_full_ancestry,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// True when some rule looks past the immediate parent.
    pub fn needs_full_ancestry(&self) -> bool {
        self.needs_full_ancestry
    }
}

impl<'a> IntoIterator for &'a RuleStore {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

impl FromIterator<Rule> for RuleStore {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
