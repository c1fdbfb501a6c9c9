use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "marginalia",
    about = "Entries and their annotations over a local document store",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags shared by every command; each falls back to an environment variable.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// SQLite database file
    #[arg(long, global = true, env = "MARGINALIA_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true, env = "MARGINALIA_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Absolute directory for rolling log files; stderr when unset
    #[arg(long, global = true, env = "MARGINALIA_LOG_DIR")]
    pub log_dir: Option<String>,

    /// Milliseconds a statement waits on a locked database
    #[arg(long, global = true, env = "MARGINALIA_BUSY_TIMEOUT_MS")]
    pub busy_timeout_ms: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the core links
    Ping,
    /// Print the core version
    Version,
    /// Manage entries
    #[command(subcommand)]
    Entry(EntryCommand),
    /// Manage annotations of an entry
    #[command(subcommand)]
    Annotation(AnnotationCommand),
}

#[derive(Subcommand, Debug)]
pub enum EntryCommand {
    /// Create an entry
    Create {
        /// Use this identifier instead of generating one
        #[arg(long = "id")]
        assign_id: Option<String>,
        #[command(flatten)]
        body: EntryBody,
    },
    /// Show one entry
    Get { id: String },
    /// List every entry
    List,
    /// Replace title and content of an entry
    Update {
        id: String,
        #[command(flatten)]
        body: EntryBody,
    },
    /// Delete an entry and all of its annotations
    Delete { id: String },
}

#[derive(Args, Debug, Clone, Default)]
pub struct EntryBody {
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub content: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum AnnotationCommand {
    /// Annotate an entry
    Create {
        entry_id: String,
        /// Use this identifier instead of generating one
        #[arg(long = "id")]
        assign_id: Option<String>,
        #[command(flatten)]
        body: AnnotationBody,
    },
    /// Show one annotation of an entry
    Get { entry_id: String, id: String },
    /// List annotations of an entry, or all annotations with --all
    List {
        #[arg(required_unless_present = "all")]
        entry_id: Option<String>,
        #[arg(long, conflicts_with = "entry_id")]
        all: bool,
    },
    /// Replace author and content of an annotation
    Update {
        entry_id: String,
        id: String,
        #[command(flatten)]
        body: AnnotationBody,
    },
    /// Delete one annotation of an entry
    Delete { entry_id: String, id: String },
    /// Delete every annotation of an entry, keeping the entry
    Purge { entry_id: String },
}

#[derive(Args, Debug, Clone, Default)]
pub struct AnnotationBody {
    /// Parent carried in the body; must match the entry argument
    #[arg(long)]
    pub parent_id: Option<String>,

    #[arg(long)]
    pub author: Option<String>,

    #[arg(long)]
    pub content: Option<String>,
}
