use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "marginalia")]
#[command(about = "Find highlights in markdown notes and keep comments on them", long_about = None)]
#[command(version)]
pub(crate) struct Cli {
    /// Database file. Defaults to the per-user data directory.
    #[arg(long, global = true)]
    pub(crate) db: Option<PathBuf>,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract highlights from every non-excluded document under a directory.
    Scan { root: PathBuf },

    /// Show stored highlights and file comments of one document.
    Highlights { doc: String },

    /// Comment on the highlight covering a character position.
    Comment {
        root: PathBuf,
        doc: String,
        /// Character offset inside the highlight.
        #[arg(long)]
        at: usize,
        text: String,
    },

    /// Add a comment to a whole document.
    Note { doc: String, text: String },

    /// Show the comments of one paragraph.
    Paragraph { doc: String, paragraph_id: String },

    /// Delete a stored highlight and its comments.
    Remove { doc: String, highlight_id: String },

    /// Forget annotations of documents no longer present under a directory.
    Cleanup { root: PathBuf },

    /// Show or change settings.
    Settings {
        /// Exclude rules, one per line (`\n` separates rules on the command line).
        #[arg(long)]
        exclude: Option<String>,
        #[arg(long)]
        cache_capacity: Option<usize>,
        /// Document extension to scan (repeatable).
        #[arg(long = "ext")]
        extensions: Vec<String>,
    },
}
