//! Filesystem rule loader.
//!
//! Scans the rules directory for YAML (or JSON) rule-set documents in sorted
//! path order, so that rule order across files is deterministic, and builds
//! the immutable [`crate::rule::RuleStore`] handed to the reconciler.

mod core;
mod error;


pub use self::core::RuleLoader;
pub use self::error::{LoadResult, LoadStatus, Result, RuleError};
