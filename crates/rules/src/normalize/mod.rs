//! Rule normalization: loosely-typed configuration in, validated [`Rule`]s out.
//!
//! A raw rule is dropped (an *error*) when it is not a mapping or has no
//! usable `block`. Individual fields that cannot be used are discarded with
//! a *warning* and the rest of the rule is kept.

pub mod sanitize;


use inner_defaults_core::{AttrValue, ClassList, CLASS_ATTRIBUTE};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::warn;

use crate::rule::{Rule, RuleAttributes, STYLE_CLASS_PREFIX};
use crate::schema::{RawRule, RuleSetDocument};

use sanitize::{sanitize_attribute_key, sanitize_html_class, sanitize_text, sanitize_title, truthy};

/// Keys a raw rule mapping may carry.
pub(crate) const KNOWN_RULE_KEYS: &[&str] = &[
    "block",
    "parent",
    "parent_class",
    "parent_classes",
    "variation",
    "class",
    "classes",
    "attributes",
    "match_ancestors",
    "remove_style_classes",
];

// ── Result types ────────────────────────────────────────────────────

/// Outcome of normalizing one or more raw rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

/// A dropped rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// Location such as `"theme-buttons.rules[2].block"`.
    pub path: String,
    pub message: String,
}

/// A discarded field or an ignored key; the rule itself was kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
    /// Optional "Did you mean …?" suggestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        let (path, message) = (path.into(), message.into());
        warn!(path = %path, "dropped rule: {message}");
        self.valid = false;
        self.errors.push(ValidationError { path, message });
    }

    pub(crate) fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.push_warning(path.into(), message.into(), None);
    }

    pub(crate) fn warn_with_suggestion(
        &mut self,
        path: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) {
        self.push_warning(path.into(), message.into(), Some(suggestion.into()));
    }

    fn push_warning(&mut self, path: String, message: String, suggestion: Option<String>) {
        warn!(path = %path, suggestion = ?suggestion, "{message}");
        self.warnings.push(ValidationWarning {
            path,
            message,
            suggestion,
        });
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Fold another result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.valid &= other.valid;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

// ── Public API ──────────────────────────────────────────────────────

/// Normalize every rule of a document, in order. Paths are prefixed with
/// the document id.
pub fn normalize_document(doc: &RuleSetDocument) -> (Vec<Rule>, ValidationResult) {
    normalize_rules(&doc.rules, &format!("{}.rules", doc.id()))
}

/// Normalize a list of raw rules, keeping declaration order.
pub fn normalize_rules(raw: &[Value], path: &str) -> (Vec<Rule>, ValidationResult) {
    let mut result = ValidationResult::new();
    let rules = raw
        .iter()
        .enumerate()
        .filter_map(|(i, value)| normalize_rule(value, &format!("{path}[{i}]"), &mut result))
        .collect();
    (rules, result)
}

/// Normalize one raw rule. Returns `None` (and records an error) when the
/// rule has to be dropped.
pub fn normalize_rule(value: &Value, path: &str, result: &mut ValidationResult) -> Option<Rule> {
    let Some(mapping) = value.as_mapping() else {
        result.error(path, "rule must be a mapping");
        return None;
    };

    for key in mapping.keys() {
        let Some(key) = key.as_str() else {
            result.warn(path, "ignored non-string key");
            continue;
        };
        if KNOWN_RULE_KEYS.contains(&key) {
            continue;
        }
        let key_path = format!("{path}.{key}");
        match suggest_key(key) {
            Some(suggestion) => result.warn_with_suggestion(
                key_path,
                format!("unknown key '{key}'"),
                format!("did you mean '{suggestion}'?"),
            ),
            None => result.warn(key_path, format!("unknown key '{key}'")),
        }
    }

    let raw: RawRule = match serde_yaml::from_value(value.clone()) {
        Ok(raw) => raw,
        Err(e) => {
            result.error(path, format!("unreadable rule: {e}"));
            return None;
        }
    };

    let target_type = raw
        .block
        .as_ref()
        .and_then(Value::as_str)
        .map(sanitize_text)
        .unwrap_or_default();
    if target_type.is_empty() {
        result.error(format!("{path}.block"), "`block` must be a non-empty string");
        return None;
    }

    let parent_type = match raw.parent.as_ref() {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(sanitize_text(s)).filter(|p| !p.is_empty()),
        Some(_) => {
            result.warn(format!("{path}.parent"), "`parent` must be a string; ignored");
            None
        }
    };

    let parent_classes = class_tokens(raw.parent_class_input(), &format!("{path}.parent_class"), result)
        .iter()
        .map(str::to_string)
        .collect();
    let add_classes = class_tokens(raw.class_input(), &format!("{path}.class"), result)
        .iter()
        .map(str::to_string)
        .collect();
    let variation_class = variation(raw.variation.as_ref(), &format!("{path}.variation"), result);
    let attributes = attributes(raw.attributes.as_ref(), &format!("{path}.attributes"), result);

    Some(Rule {
        target_type,
        parent_type,
        parent_classes,
        match_ancestors: raw.match_ancestors.as_ref().map(truthy).unwrap_or(false),
        variation_class,
        add_classes,
        attributes,
        remove_style_classes: raw.remove_style_classes.as_ref().map(truthy).unwrap_or(true),
    })
}

/// Closest known rule key within three edits, compared case-insensitively.
fn suggest_key(key: &str) -> Option<&'static str> {
    let key = key.to_ascii_lowercase();
    KNOWN_RULE_KEYS
        .iter()
        .copied()
        .min_by_key(|known| strsim::levenshtein(&key, known))
        .filter(|known| strsim::levenshtein(&key, known) <= 3)
}

// ── Field normalizers ───────────────────────────────────────────────

/// A whitespace-separated string or a list of strings, each token sanitized
/// as an HTML class. List items are sanitized whole; non-strings are skipped.
fn class_tokens(value: Option<&Value>, path: &str, result: &mut ValidationResult) -> ClassList {
    let mut list = ClassList::new();
    match value {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) => {
            for token in s.split_whitespace() {
                list.push(&sanitize_html_class(token));
            }
        }
        Some(Value::Sequence(items)) => {
            for (i, item) in items.iter().enumerate() {
                match item.as_str() {
                    Some(s) => {
                        list.push(&sanitize_html_class(s));
                    }
                    None => result.warn(format!("{path}[{i}]"), "class must be a string; skipped"),
                }
            }
        }
        Some(_) => result.warn(path, "classes must be a string or a list of strings; ignored"),
    }
    list
}

/// A full `is-style-*` class, or a slug that gets the prefix.
fn variation(value: Option<&Value>, path: &str, result: &mut ValidationResult) -> Option<String> {
    let raw = match value {
        None | Some(Value::Null) => return None,
        Some(Value::String(s)) => s.trim(),
        Some(_) => {
            result.warn(path, "`variation` must be a string; ignored");
            return None;
        }
    };
    if raw.is_empty() {
        return None;
    }

    let class = if raw.starts_with(STYLE_CLASS_PREFIX) {
        sanitize_html_class(raw)
    } else {
        let slug = sanitize_title(raw);
        if slug.is_empty() {
            String::new()
        } else {
            sanitize_html_class(&format!("{STYLE_CLASS_PREFIX}{slug}"))
        }
    };

    if class.is_empty() {
        result.warn(path, format!("variation '{raw}' sanitizes to nothing; ignored"));
        None
    } else {
        Some(class)
    }
}

fn attributes(value: Option<&Value>, path: &str, result: &mut ValidationResult) -> RuleAttributes {
    let mut attrs = RuleAttributes::default();
    let mapping = match value {
        None | Some(Value::Null) => return attrs,
        Some(Value::Mapping(m)) => m,
        Some(_) => {
            result.warn(path, "`attributes` must be a mapping; ignored");
            return attrs;
        }
    };

    for (key, value) in mapping {
        let Some(raw_key) = key.as_str() else {
            result.warn(path, "attribute key must be a string; skipped");
            continue;
        };
        let key = sanitize_attribute_key(raw_key);
        let key_path = format!("{path}.{raw_key}");
        if key.is_empty() {
            result.warn(key_path, "attribute key sanitizes to nothing; skipped");
            continue;
        }

        if key == CLASS_ATTRIBUTE {
            let tokens = class_tokens(Some(value), &key_path, result);
            attrs.classes.extend(tokens.iter());
            continue;
        }

        match scalar(value) {
            Some(v) => {
                attrs.values.insert(key, v);
            }
            None => result.warn(key_path, "attribute value must be a scalar or string; skipped"),
        }
    }

    attrs
}

fn scalar(value: &Value) -> Option<AttrValue> {
    match value {
        Value::Null => Some(AttrValue::Null),
        Value::Bool(b) => Some(AttrValue::Bool(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(AttrValue::Int)
            .or_else(|| n.as_f64().map(AttrValue::Float)),
        Value::String(s) => Some(AttrValue::String(sanitize_text(s))),
        Value::Tagged(tagged) => scalar(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}
