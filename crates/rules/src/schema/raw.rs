//! Loosely-typed rule as written in configuration.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Every field is kept as raw YAML: a wrong type is a normalization
/// concern, not a parse failure. Unknown keys are ignored.
///
/// ```yaml
/// block: core/button          # required target type
/// parent: core/buttons        # optional ancestor type
/// parent_class: highlighted   # or parent_classes; string or list
/// variation: outline          # slug or full `is-style-*` class
/// class: [cta, wide]          # or classes; string or list
/// attributes: { width: 50, className: "extra" }
/// match_ancestors: true       # default false
/// remove_style_classes: false # default true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRule {
    #[serde(default)]
    pub block: Option<Value>,
    #[serde(default)]
    pub parent: Option<Value>,
    #[serde(default)]
    pub parent_class: Option<Value>,
    #[serde(default)]
    pub parent_classes: Option<Value>,
    #[serde(default)]
    pub variation: Option<Value>,
    #[serde(default)]
    pub class: Option<Value>,
    #[serde(default)]
    pub classes: Option<Value>,
    #[serde(default)]
    pub attributes: Option<Value>,
    #[serde(default)]
    pub match_ancestors: Option<Value>,
    #[serde(default)]
    pub remove_style_classes: Option<Value>,
}

impl RawRule {
    /// `parent_class`, falling back to `parent_classes`.
    pub fn parent_class_input(&self) -> Option<&Value> {
        first_present(&self.parent_class, &self.parent_classes)
    }

    /// `class`, falling back to `classes`.
    pub fn class_input(&self) -> Option<&Value> {
        first_present(&self.class, &self.classes)
    }
}

fn first_present<'a>(primary: &'a Option<Value>, fallback: &'a Option<Value>) -> Option<&'a Value> {
    match primary {
        Some(v) if !v.is_null() => Some(v),
        _ => fallback.as_ref().filter(|v| !v.is_null()),
    }
}
