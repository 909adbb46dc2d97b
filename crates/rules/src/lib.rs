//! Declarative inner-default rules for nested content trees.
//!
//! This crate provides:
//! - YAML rule-set documents with serde deserialization
//! - Normalization of loosely-typed rule entries into validated [`rule::Rule`]s
//! - Filesystem loader building an ordered [`rule::RuleStore`]
//! - Matching and class/attribute application against a node's ancestors
//! - A reconciler that applies rules to newly inserted nodes of a live tree
//! - Scripted mutation replay for driving a tree from files

pub mod loader;
pub mod matcher;
pub mod normalize;
pub mod reconciler;
pub mod replay;
pub mod rule;
pub mod schema;
