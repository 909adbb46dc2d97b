//! inner-reconcile: replay a mutation script against a tree with the
//! rule reconciler attached, then print the resulting tree.
//!
//! Typical use is checking what a rule set does to content before
//! shipping it:
//!
//! ```text
//! inner-reconcile --rules data/rules/examples \
//!     --tree data/trees/page.json --script data/scripts/add-blocks.yml
//! ```

use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use inner_defaults_core::config::{load_dotenv, Config};
use inner_defaults_core::{read_snapshot_file, MemoryTree};
use inner_defaults_rules::loader::{LoadStatus, RuleLoader};
use inner_defaults_rules::reconciler::Reconciler;
use inner_defaults_rules::replay::{read_script_file, replay};

// ── CLI ─────────────────────────────────────────────────────────────

/// Apply declarative inner-default rules to scripted tree mutations.
#[derive(Parser, Debug)]
#[command(name = "inner-reconcile", version, about)]
struct Cli {
    /// Rules directory (defaults to INNER_RULES_DIR or data/rules).
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Initial tree snapshot (JSON or YAML). Starts empty when absent.
    #[arg(long, env = "INNER_TREE")]
    tree: Option<PathBuf>,

    /// Mutation script (YAML or JSON) replayed after attaching.
    #[arg(long, env = "INNER_SCRIPT")]
    script: Option<PathBuf>,

    /// Fail when any rule is dropped during loading.
    #[arg(long)]
    strict: bool,

    /// Write the resulting tree here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    load_dotenv();
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .init();

    let cli = Cli::parse();
    config.log_summary();

    let rules_dir = cli.rules.unwrap_or_else(|| config.rules_dir.clone());
    let strict = cli.strict || config.strict;

    let mut loader = RuleLoader::new(rules_dir.clone());
    for result in loader
        .load_all()
        .with_context(|| format!("loading rules from {}", rules_dir.display()))?
    {
        match &result.status {
            LoadStatus::Loaded { set_id, rules } => {
                info!(path = %result.path.display(), set_id = %set_id, rules, "rule set loaded")
            }
            LoadStatus::Skipped { reason } => {
                info!(path = %result.path.display(), reason = %reason, "rule file skipped")
            }
            LoadStatus::Failed { error } => {
                warn!(path = %result.path.display(), error = %error, "rule file failed")
            }
        }
    }
    let (store, report) = loader.build_store(strict).context("building rule store")?;
    info!(
        rules = store.len(),
        warnings = report.warnings.len(),
        "rule store ready"
    );

    let tree = match &cli.tree {
        Some(path) => {
            let roots = read_snapshot_file(path)
                .with_context(|| format!("reading tree {}", path.display()))?;
            MemoryTree::from_snapshot(roots).context("building tree")?
        }
        None => MemoryTree::new(),
    };
    let tree = Rc::new(tree);

    let attachment = Reconciler::new(store).attach(&tree);

    if let Some(path) = &cli.script {
        let ops = read_script_file(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        replay(&tree, &ops)?;
    }

    let stats = attachment.detach();
    info!(
        passes = stats.passes,
        processed = stats.processed,
        updated = stats.updated,
        missing = stats.missing,
        failed = stats.failed,
        evicted = stats.evicted,
        "reconcile finished"
    );

    let rendered = serde_json::to_string_pretty(&tree.snapshot())?;
    match &cli.output {
        Some(path) => {
            fs::write(path, rendered + "\n")
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "tree written");
        }
        None => println!("{rendered}"),
    }

    Ok(())
}
