//! Command definitions and dispatch for the `verso` binary.
//!
//! Every command opens the SQLite store at `--db`, runs one engine operation
//! and returns its result as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use verso_engine::{EngineConfig, VersioningEngine};
use verso_model::{ApprovalState, Payload};
use verso_storage::SqliteVersionStore;
use verso_types::{ContentId, VersionId};

#[derive(Parser, Debug)]
#[command(name = "verso")]
#[command(about = "Content versioning with conflict resolution")]
pub struct Cli {
    /// Path to the SQLite database
    #[arg(long, global = true, default_value = "verso.db")]
    pub db: PathBuf,

    /// Path to a JSON engine configuration
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Register a content item
    Init {
        content_id: String,
        content_type: String,
    },

    /// Commit a JSON payload as a new version
    Commit {
        content_id: String,
        /// File holding a JSON object
        payload: PathBuf,
        #[arg(long)]
        author: String,
        /// Version the edit started from (defaults to the current head)
        #[arg(long)]
        base: Option<VersionId>,
        /// Only snapshot if the change is large enough
        #[arg(long, conflicts_with = "base")]
        autosave: bool,
    },

    /// List versions, newest first
    History {
        content_id: String,
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Print one version
    Show { version_id: VersionId },

    /// Move a content item to another approval state
    Transition {
        content_id: String,
        state: ApprovalState,
    },

    /// Merge two diverged versions into a new head
    Resolve {
        content_id: String,
        a: VersionId,
        b: VersionId,
        #[arg(long)]
        author: String,
        /// Commit this payload instead of merging automatically
        #[arg(long)]
        payload: Option<PathBuf>,
    },

    /// Make an earlier version's payload the new head
    Restore {
        content_id: String,
        version_id: VersionId,
        #[arg(long)]
        author: String,
    },

    /// Remove old versions, keeping the head
    Prune {
        content_id: String,
        /// Versions to keep (defaults to the configured keep-count)
        #[arg(long)]
        keep: Option<usize>,
    },
}

/// Loads the configuration, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

/// Opens the engine over the database named on the command line.
pub fn open_engine(cli: &Cli) -> Result<VersioningEngine> {
    let config = load_config(cli.config.as_deref())?;
    let store = SqliteVersionStore::open(&cli.db)
        .with_context(|| format!("Failed to open database {}", cli.db.display()))?;
    debug!("Opened {}", cli.db.display());
    Ok(VersioningEngine::new(Arc::new(store), config))
}

fn read_payload(path: &Path) -> Result<Payload> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read payload {}", path.display()))?;
    Payload::from_json_str(&json)
        .with_context(|| format!("Payload {} is not a JSON object", path.display()))
}

/// Runs one command and returns its JSON output.
pub async fn run(cli: &Cli) -> Result<Value> {
    let engine = open_engine(cli)?;
    execute(&engine, &cli.command).await
}

/// Runs `command` against an already opened engine.
pub async fn execute(engine: &VersioningEngine, command: &Command) -> Result<Value> {
    let output = match command {
        Command::Init {
            content_id,
            content_type,
        } => {
            let item = engine
                .register_content(&ContentId::new(content_id.as_str()), content_type)
                .await?;
            serde_json::to_value(item)?
        }
        Command::Commit {
            content_id,
            payload,
            author,
            base,
            autosave,
        } => {
            let id = ContentId::new(content_id.as_str());
            let payload = read_payload(payload)?;
            let outcome = if *autosave {
                engine.autosave(&id, payload, author).await?
            } else if let Some(base) = base {
                engine.commit_edit(&id, Some(base), payload, author).await?
            } else {
                engine.create_version(&id, payload, author).await?
            };
            if let Some(head) = outcome.head_id() {
                info!("{id} head is {}", head.short());
            }
            serde_json::to_value(outcome)?
        }
        Command::History { content_id, limit } => {
            let versions = engine
                .get_history(&ContentId::new(content_id.as_str()), *limit)
                .await?;
            serde_json::to_value(versions)?
        }
        Command::Show { version_id } => {
            let version = engine.get_version(version_id).await?;
            serde_json::to_value(version)?
        }
        Command::Transition { content_id, state } => {
            let item = engine
                .transition_state(&ContentId::new(content_id.as_str()), *state)
                .await?;
            serde_json::to_value(item)?
        }
        Command::Resolve {
            content_id,
            a,
            b,
            author,
            payload,
        } => {
            let id = ContentId::new(content_id.as_str());
            let version = match payload {
                Some(path) => {
                    let payload = read_payload(path)?;
                    engine.commit_manual_merge(&id, a, b, payload, author).await?
                }
                None => engine.resolve_conflict(&id, a, b, author).await?,
            };
            serde_json::to_value(version)?
        }
        Command::Restore {
            content_id,
            version_id,
            author,
        } => {
            let outcome = engine
                .restore_version(&ContentId::new(content_id.as_str()), version_id, author)
                .await?;
            serde_json::to_value(outcome)?
        }
        Command::Prune { content_id, keep } => {
            let removed = engine
                .prune(&ContentId::new(content_id.as_str()), *keep)
                .await?;
            json!({ "removed": removed })
        }
    };
    Ok(output)
}
