mod cli;
pub mod commands;
pub mod config;
pub mod data;
pub mod error;
pub mod models;
pub(crate) mod scope_path;
pub mod services;
pub mod state;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use commands::{annotation_commands, scan_commands, settings_commands};
use state::AppState;

pub use error::AppError;
pub use models::highlight::{CommentItem, HighlightComment, HighlightKind, HighlightOccurrence};
pub use models::file_comment::FileComment;
pub use services::annotation_service::AnnotationStore;
pub use services::exclusion_service::should_process_document;
pub use services::extraction_service::{extract_highlights, has_highlights};

fn init_logging() {
    let filter =
        EnvFilter::try_from_env("MARGINALIA_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn run() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let db_path = match cli.db {
        Some(path) => path,
        None => config::default_database_path().context("could not resolve a data directory")?,
    };
    let mut state = AppState::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;

    match cli.command {
        Command::Scan { root } => print_json(&scan_commands::scan(&state, &root)?),
        Command::Highlights { doc } => {
            print_json(&annotation_commands::list_annotations(&state, &doc))
        }
        Command::Comment { root, doc, at, text } => print_json(
            &annotation_commands::comment_on_highlight(&mut state, &root, &doc, at, &text)?,
        ),
        Command::Note { doc, text } => {
            print_json(&annotation_commands::add_note(&mut state, &doc, &text)?)
        }
        Command::Paragraph { doc, paragraph_id } => print_json(
            &annotation_commands::paragraph_comments(&mut state, &doc, &paragraph_id),
        ),
        Command::Remove { doc, highlight_id } => {
            annotation_commands::remove_highlight(&mut state, &doc, &highlight_id)?;
            Ok(())
        }
        Command::Cleanup { root } => {
            let removed = scan_commands::cleanup(&mut state, &root)?;
            println!("removed annotations for {removed} document(s)");
            Ok(())
        }
        Command::Settings {
            exclude,
            cache_capacity,
            extensions,
        } => {
            let extensions = (!extensions.is_empty()).then_some(extensions);
            if exclude.is_none() && cache_capacity.is_none() && extensions.is_none() {
                return print_json(&settings_commands::get_settings(&state));
            }
            print_json(&settings_commands::update_settings(
                &mut state,
                exclude,
                cache_capacity,
                extensions,
            )?)
        }
    }
}
