//! Core [`RuleLoader`] struct: filesystem-backed rule-set loading.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::normalize::{normalize_document, ValidationResult};
use crate::rule::RuleStore;
use crate::schema::RuleSetDocument;

use super::error::{LoadResult, LoadStatus, Result, RuleError};

const RULE_EXTENSIONS: &[&str] = &["yml", "yaml", "json"];

/// Filesystem-backed rule-set loader.
///
/// Documents are kept keyed by path; a `BTreeMap` keeps them in the order
/// their rules are concatenated into the store.
pub struct RuleLoader {
    /// Root directory containing rule-set files.
    rules_dir: PathBuf,
    /// Loaded, enabled documents keyed by file path.
    documents: BTreeMap<PathBuf, RuleSetDocument>,
}

impl RuleLoader {
    pub fn new(rules_dir: PathBuf) -> Self {
        Self {
            rules_dir,
            documents: BTreeMap::new(),
        }
    }

    /// Recursively scan the rules directory and (re)load every rule file.
    ///
    /// Dotfiles and files with other extensions are skipped. Parse errors,
    /// disabled sets and duplicate ids are reported per file and do not
    /// abort the scan.
    pub fn load_all(&mut self) -> Result<Vec<LoadResult>> {
        self.documents.clear();

        let mut results = Vec::new();
        let mut files = Vec::new();
        Self::scan_dir_recursive(&self.rules_dir, &mut files, &mut results)?;
        files.sort();

        for path in files {
            let status = match self.load_file(&path) {
                Ok(doc) => self.accept(&path, doc),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load rule file");
                    LoadStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };
            results.push(LoadResult { path, status });
        }

        Ok(results)
    }

    /// Collect candidate rule files below `dir`.
    fn scan_dir_recursive(
        dir: &Path,
        files: &mut Vec<PathBuf>,
        results: &mut Vec<LoadResult>,
    ) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "failed to read directory");
                return Ok(());
            }
        };

        for entry in entries {
            let path = entry?.path();

            // Skip dotfiles/dotdirs
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    if path.is_file() {
                        results.push(LoadResult {
                            path,
                            status: LoadStatus::Skipped {
                                reason: "dotfile".to_string(),
                            },
                        });
                    }
                    continue;
                }
            }

            if path.is_dir() {
                Self::scan_dir_recursive(&path, files, results)?;
                continue;
            }

            let is_rule_file = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| RULE_EXTENSIONS.contains(&e))
                .unwrap_or(false);

            if is_rule_file {
                files.push(path);
            } else {
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Skipped {
                        reason: "not a rule file".to_string(),
                    },
                });
            }
        }

        Ok(())
    }

    /// Record a parsed document unless it is disabled or its id is taken.
    fn accept(&mut self, path: &Path, doc: RuleSetDocument) -> LoadStatus {
        let set_id = doc.id().to_string();

        if !doc.metadata.enabled {
            info!(set_id = %set_id, path = %path.display(), "skipping disabled rule set");
            return LoadStatus::Skipped {
                reason: "disabled".to_string(),
            };
        }

        if let Some((other, _)) = self.documents.iter().find(|(_, d)| d.id() == set_id) {
            let error = format!(
                "duplicate rule set id '{}' (already loaded from {})",
                set_id,
                other.display()
            );
            warn!(path = %path.display(), "{error}");
            return LoadStatus::Failed { error };
        }

        let rules = doc.rules.len();
        info!(set_id = %set_id, rules, path = %path.display(), "loaded rule set");
        self.documents.insert(path.to_path_buf(), doc);
        LoadStatus::Loaded { set_id, rules }
    }

    /// Parse a single rule-set file.
    pub fn load_file(&self, path: &Path) -> Result<RuleSetDocument> {
        let contents = fs::read_to_string(path)?;
        let doc = RuleSetDocument::from_yaml(&contents)?;

        if doc.metadata.id.trim().is_empty() {
            return Err(RuleError::Validation(
                "rule set metadata.id must not be empty".to_string(),
            ));
        }

        Ok(doc)
    }

    /// Normalize every loaded document, in path order, into one store.
    ///
    /// In `strict` mode any dropped rule fails the build; otherwise dropped
    /// rules are only reported in the returned [`ValidationResult`].
    pub fn build_store(&self, strict: bool) -> Result<(RuleStore, ValidationResult)> {
        let mut report = ValidationResult::new();
        let mut rules = Vec::new();

        for doc in self.documents.values() {
            let (normalized, result) = normalize_document(doc);
            rules.extend(normalized);
            report.merge(result);
        }

        if strict && !report.valid {
            let first = report
                .errors
                .first()
                .map(|e| format!("{}: {}", e.path, e.message))
                .unwrap_or_default();
            return Err(RuleError::Validation(format!(
                "{} rule(s) dropped (first: {})",
                report.errors.len(),
                first
            )));
        }

        info!(
            rules = rules.len(),
            dropped = report.errors.len(),
            warnings = report.warnings.len(),
            "built rule store"
        );
        Ok((RuleStore::new(rules), report))
    }

    /// Get the rules directory path.
    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Loaded documents in path order.
    pub fn documents(&self) -> impl Iterator<Item = (&Path, &RuleSetDocument)> {
        self.documents.iter().map(|(p, d)| (p.as_path(), d))
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}
