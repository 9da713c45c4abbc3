//! Clap command tree for the operator surface (spec §6.5): `branch`,
//! `merge`, `outbox`, `consumer`, `compact`.

use clap::{Parser, Subcommand};

/// Operator CLI over the ontology management core.
///
/// Each invocation runs against a freshly seeded in-process instance —
/// there is no persistent daemon behind it. It exists to demonstrate and
/// exercise the function entry points the core exposes; a real deployment
/// wires these same calls behind whatever long-running service embeds the
/// coordinator.
#[derive(Debug, Parser)]
#[command(name = "oms", about = "Ontology management service operator CLI")]
pub struct Cli {
    /// Emit machine-readable JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: TopCommand,
}

#[derive(Debug, Subcommand)]
pub enum TopCommand {
    /// Branch lifecycle operations.
    Branch {
        #[command(subcommand)]
        action: BranchAction,
    },
    /// Three-way merge planning and application.
    Merge {
        #[command(subcommand)]
        action: MergeAction,
    },
    /// Transactional outbox maintenance.
    Outbox {
        #[command(subcommand)]
        action: OutboxAction,
    },
    /// Idempotent consumer maintenance.
    Consumer {
        #[command(subcommand)]
        action: ConsumerAction,
    },
    /// Version-chain DAG compaction.
    Compact {
        #[command(subcommand)]
        action: CompactAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum BranchAction {
    /// Fork a new branch from `parent`.
    Create {
        name: String,
        #[arg(long, default_value = "main")]
        parent: String,
        #[arg(long, default_value = "operator")]
        actor: String,
    },
    /// Lock a branch exclusively for an in-progress merge.
    Lock { name: String },
    /// Archive a branch. Refuses `main`.
    Archive { name: String },
    /// List every branch and its lifecycle state.
    List,
}

#[derive(Debug, Subcommand)]
pub enum MergeAction {
    /// Compute the head-commit divergence between two branches.
    Plan { left: String, right: String },
    /// Apply a previously computed plan, writing one version per resource.
    Apply {
        left: String,
        right: String,
        target: String,
        #[arg(long, default_value = "operator")]
        actor: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum OutboxAction {
    /// Move a dead-lettered envelope back into the retry queue.
    Requeue { sequence: u64 },
    /// List every envelope currently parked in the dead-letter state.
    DeadLetter,
}

#[derive(Debug, Subcommand)]
pub enum ConsumerAction {
    /// Reset a consumer's checkpoint, clearing `consecutive_failures`.
    Reset { consumer_id: String },
}

#[derive(Debug, Subcommand)]
pub enum CompactAction {
    /// Compact a commit chain read from a JSON file of `CommitMeta[]`.
    ///
    /// Without `--apply` this only reports what compaction would do
    /// (dry-run). With `--apply`, the file at `--chain` is overwritten
    /// with the collapsed chain.
    Run {
        #[arg(long)]
        chain: std::path::PathBuf,
        #[arg(long, default_value_t = oms_merge::DEFAULT_CHAIN_LENGTH_THRESHOLD)]
        max_chain_length: usize,
        #[arg(long)]
        apply: bool,
    },
}
