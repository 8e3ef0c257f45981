//! kairos-eval: offline validation and decisions over a rules directory.
//!
//! - `kairos-eval validate` loads every document and reports failures
//! - `kairos-eval decide --composition <id> --subject <file.json>` prints a decision

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kairos_rules::loader::{LoadStatus, RuleLoader};
use kairos_rules::store::CompositionStore;
use kairos_rules::{AtomRegistry, CompositionCatalog, EligibilityService, ServiceOptions};

// ── CLI ─────────────────────────────────────────────────────────────

/// Kairos eligibility rules: validate documents and evaluate subjects.
#[derive(Parser, Debug)]
#[command(name = "kairos-eval", version, about)]
struct Cli {
    /// Path to the rules directory.
    #[arg(long, global = true, env = "RULES_DIR", default_value = "data/rules")]
    rules_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate every document, exiting non-zero on failures.
    Validate,

    /// Evaluate a subject record against a composition.
    Decide {
        /// Composition id to evaluate.
        #[arg(long)]
        composition: String,

        /// JSON file holding the subject record.
        #[arg(long)]
        subject: PathBuf,

        /// Store lookup timeout in milliseconds.
        #[arg(long, env = "STORE_TIMEOUT_MS", default_value_t = 2000)]
        store_timeout_ms: u64,
    },
}

// ── Main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let registry = Arc::new(AtomRegistry::new());
    let catalog = Arc::new(CompositionCatalog::new());
    let loader = RuleLoader::new(cli.rules_dir.clone(), registry.clone(), catalog.clone());
    let results = loader
        .load_all()
        .with_context(|| format!("failed to scan {}", cli.rules_dir.display()))?;

    match cli.command {
        Command::Validate => {
            let mut failed = 0;
            for result in &results {
                match &result.status {
                    LoadStatus::Loaded { kind, id } => println!("ok      {} {} ({})", kind, id, result.path.display()),
                    LoadStatus::Skipped { reason } => println!("skipped {} ({})", result.path.display(), reason),
                    LoadStatus::Failed { error } => {
                        failed += 1;
                        println!("FAILED  {}: {}", result.path.display(), error);
                    }
                }
            }
            info!(atoms = registry.len(), compositions = catalog.len(), failed, "validation finished");
            if failed > 0 {
                bail!("{} document(s) failed validation", failed);
            }
        }
        Command::Decide { composition, subject, store_timeout_ms } => {
            let failed = results.iter().filter(|r| r.is_failed()).count();
            if failed > 0 {
                warn!(failed, "some documents failed to load; continuing with the rest");
            }

            let raw = std::fs::read_to_string(&subject)
                .with_context(|| format!("failed to read subject {}", subject.display()))?;
            let subject: serde_json::Value =
                serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", subject.display()))?;

            let store: Arc<dyn CompositionStore> = catalog;
            let options = ServiceOptions {
                store_timeout: Duration::from_millis(store_timeout_ms),
                ..ServiceOptions::default()
            };
            let service = EligibilityService::new(registry, store, options);
            let decision = service
                .decide_for(&subject, &composition)
                .await
                .with_context(|| format!("decision for composition '{}' failed", composition))?;

            println!("{}", serde_json::to_string_pretty(&decision)?);
        }
    }

    Ok(())
}
