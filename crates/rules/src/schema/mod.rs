//! YAML schema types for rule-set documents.
//!
//! - `RuleSetDocument`: envelope (apiVersion, kind, metadata) plus raw rules
//! - `RawRule`: one loosely-typed rule as written by a configuration author
//!
//! Raw rules are turned into validated [`crate::rule::Rule`]s by
//! [`crate::normalize`].

mod document;
mod metadata;
mod raw;

pub use document::*;
pub use metadata::*;
pub use raw::*;
