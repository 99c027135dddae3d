//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

/// Multi-tenant category hierarchy maintenance
#[derive(Parser, Debug)]
#[command(name = "cattree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Tenant to operate on
    #[arg(short, long, global = true, env = "CATTREE_TENANT", default_value_t = 1)]
    pub tenant: u64,

    /// Snapshot file (overrides `data_file` setting)
    #[arg(short = 'f', long, global = true, value_hint = ValueHint::FilePath)]
    pub data_file: Option<PathBuf>,

    /// Additional config file
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a category
    Create {
        /// Leaf name
        name: String,
        /// Parent category id (root when omitted)
        #[arg(short, long)]
        parent: Option<u64>,
    },

    /// Create a full path, materializing missing ancestors
    Mkpath {
        /// Full path, e.g. News/Sports/Football
        path: String,
    },

    /// Rename a category and cascade to descendants
    Rename {
        id: u64,
        name: String,
    },

    /// Move a category under a new parent (0 for root level)
    Move {
        id: u64,
        parent: u64,
    },

    /// Delete a category and its subtree
    Delete {
        id: u64,
        /// Remove rows instead of marking them deleted
        #[arg(long)]
        hard: bool,
    },

    /// Show one category
    Show {
        id: u64,
    },

    /// Render the tenant's tree
    Tree {
        /// Also check tree invariants
        #[arg(long)]
        verify: bool,
    },

    /// Recount entries of a category's subtree
    Recount {
        id: u64,
    },

    /// Assign or inspect entry categories
    Entry {
        #[command(subcommand)]
        command: EntryCommands,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum EntryCommands {
    /// Replace an entry's categories
    Assign {
        /// Entry identifier
        entry: String,
        /// Category full names
        names: Vec<String>,
        /// Create unknown categories
        #[arg(long)]
        create_missing: bool,
    },
    /// List an entry's categories
    Show {
        /// Entry identifier
        entry: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Print a commented config template
    Template,
}
