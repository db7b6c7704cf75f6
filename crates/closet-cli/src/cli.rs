use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "closet")]
#[command(about = "Inspect and sync the Closet offline store from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local state database
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show local counts, pending changes and last sync
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Push pending changes, then pull from the server
    Sync,
    /// Push pending changes only
    Push,
    /// Pull server changes without pushing
    Pull {
        /// Fetch the whole snapshot instead of changes since the last sync
        #[arg(long)]
        full: bool,
    },
    /// Manage saved products
    Bookmark {
        #[command(subcommand)]
        command: BookmarkCommands,
    },
    /// Inspect or record browsing history
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Manage collections
    Collection {
        #[command(subcommand)]
        command: CollectionCommands,
    },
    /// Show or change analytics consent
    Consent {
        /// New consent choice (shows current status when omitted)
        #[arg(value_enum)]
        choice: Option<ConsentArg>,
    },
    /// Manage buffered analytics
    Analytics {
        #[command(subcommand)]
        command: AnalyticsCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum BookmarkCommands {
    /// Save a product page
    Add {
        /// Product URL
        url: String,
        /// Display title (defaults to the URL)
        #[arg(long)]
        title: Option<String>,
        /// Current price
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        brand: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Shop or site name
        #[arg(long)]
        source: Option<String>,
    },
    /// Remove a saved product
    #[command(alias = "rm")]
    Remove {
        /// Product URL
        url: String,
    },
    /// Record a newly observed price
    Price {
        /// Product URL
        url: String,
        price: f64,
    },
    /// List saved products
    List {
        /// Number of bookmarks to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List recent visits
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a page visit (requires analytics consent)
    Visit {
        url: String,
        #[arg(long)]
        title: Option<String>,
    },
    /// Clear history locally and on the server
    Clear,
}

#[derive(Subcommand)]
pub enum CollectionCommands {
    /// Create a collection
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Display color, e.g. `#ffcc00`
        #[arg(long)]
        color: Option<String>,
    },
    /// List collections
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a saved product to a collection
    Add {
        /// Collection ID
        id: String,
        /// URL of a saved product
        url: String,
    },
    /// Delete a collection
    Delete {
        /// Collection ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum AnalyticsCommands {
    /// Drop history, cart timelines and buffered events
    Clear,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ConsentArg {
    Accept,
    Decline,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
