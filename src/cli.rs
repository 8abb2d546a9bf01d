use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mdtask", about = "Markdown task lists for parallel AI agents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new task file
    Create {
        /// Path to the task file (env: MDTASK_FILE)
        #[arg(env = "MDTASK_FILE")]
        file: PathBuf,
        /// Document title
        #[arg(long)]
        title: String,
    },

    /// Add a task
    Add {
        #[arg(env = "MDTASK_FILE")]
        file: PathBuf,
        /// Task title
        #[arg(long)]
        title: String,
        /// Parent task ID (omit for a top-level task)
        #[arg(long, default_value = "")]
        parent: String,
        /// Insert at this sibling position instead of appending
        #[arg(long)]
        position: Option<String>,
        /// Append to the named phase (top-level tasks only)
        #[arg(long)]
        phase: Option<String>,
    },

    /// Add a phase header after the current last task
    AddPhase {
        #[arg(env = "MDTASK_FILE")]
        file: PathBuf,
        /// Phase name
        name: String,
    },

    /// Add or extend the YAML front matter block
    AddFrontmatter {
        #[arg(env = "MDTASK_FILE")]
        file: PathBuf,
        /// Reference entries to append
        #[arg(long = "reference")]
        references: Vec<String>,
        /// Metadata entries as key:value
        #[arg(long = "meta")]
        meta: Vec<String>,
    },

    /// Update fields on a task
    Update {
        #[arg(env = "MDTASK_FILE")]
        file: PathBuf,
        /// Task ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// Replace the detail lines
        #[arg(long, num_args = 0..)]
        details: Option<Vec<String>>,
        /// Replace the reference list
        #[arg(long, num_args = 0..)]
        references: Option<Vec<String>>,
        /// Replace the requirement IDs
        #[arg(long, num_args = 0..)]
        requirements: Option<Vec<String>>,
        /// Assign the task to a work stream
        #[arg(long)]
        stream: Option<u32>,
        /// Set the owner
        #[arg(long, conflicts_with = "release")]
        owner: Option<String>,
        /// Clear the owner
        #[arg(long)]
        release: bool,
        /// Replace the blocking task IDs (pass with no value to clear)
        #[arg(long = "blocked-by", num_args = 0.., value_delimiter = ',')]
        blocked_by: Option<Vec<String>>,
    },

    /// Mark a task completed
    Complete {
        #[arg(env = "MDTASK_FILE")]
        file: PathBuf,
        /// Task ID
        id: String,
    },

    /// Mark a task pending again
    Uncomplete {
        #[arg(env = "MDTASK_FILE")]
        file: PathBuf,
        /// Task ID
        id: String,
    },

    /// Remove a task and its subtasks
    Remove {
        #[arg(env = "MDTASK_FILE")]
        file: PathBuf,
        /// Task ID
        id: String,
    },

    /// Show the task tree
    List {
        #[arg(env = "MDTASK_FILE")]
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply a JSON batch of operations atomically
    Batch {
        #[arg(env = "MDTASK_FILE")]
        file: PathBuf,
        /// Read the request from this file instead of stdin
        #[arg(long)]
        input: Option<PathBuf>,
        /// Validate and preview without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Report per-stream readiness
    Streams {
        #[arg(env = "MDTASK_FILE")]
        file: PathBuf,
        /// Only print streams with ready tasks
        #[arg(long)]
        available: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or claim the next unit of work
    Next {
        #[arg(env = "MDTASK_FILE")]
        file: PathBuf,
        /// Restrict to one work stream
        #[arg(long)]
        stream: Option<u32>,
        /// Claim the task for this agent
        #[arg(long)]
        claim: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rewrite the file with sequential IDs (writes a .bak first)
    Renumber {
        #[arg(env = "MDTASK_FILE")]
        file: PathBuf,
    },
}
