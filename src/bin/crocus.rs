//! Crocus command-line interface.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crocus::{Config, CrocusError, Engine, ProgressObserver};

/// Exit status when the index directory holds no committed index.
const EXIT_INDEX_MISSING: u8 = 2;

/// Crocus - spreadsheet content search
#[derive(Parser)]
#[command(name = "crocus", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract workbooks under a content root and build the search index.
    Process {
        /// Directory tree containing the spreadsheet files.
        #[arg(long)]
        content_root: PathBuf,
        /// Directory to store the search index.
        #[arg(long, default_value = "./crocus_index")]
        index_dir: PathBuf,
    },
    /// Search indexed content.
    Search {
        /// Query string.
        query: String,
        /// Directory holding the search index.
        #[arg(long, default_value = "./crocus_index")]
        index_dir: PathBuf,
        /// Field to search.
        #[arg(long, default_value = "content")]
        field: String,
        /// Maximum number of results.
        #[arg(long)]
        limit: Option<i64>,
    },
}

/// Prints extraction progress to stderr.
struct StderrProgress;

impl ProgressObserver for StderrProgress {
    fn on_progress(&self, processed: usize, total: usize) {
        eprintln!("processed {processed}/{total} files");
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            match e.downcast_ref::<CrocusError>() {
                Some(CrocusError::IndexMissing { .. }) => ExitCode::from(EXIT_INDEX_MISSING),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Process {
            content_root,
            index_dir,
        } => {
            let engine = Engine::new(Config::new(content_root, index_dir));
            let outcome = engine
                .process_directory(&StderrProgress)
                .context("extraction failed")?;

            for skipped in &outcome.skipped {
                eprintln!("skipped {}: {}", skipped.relative_path, skipped.error);
            }

            let commit = engine
                .index_content(&outcome.workbooks)
                .context("indexing failed")?;
            println!(
                "indexed {} documents from {} workbooks (generation {}, {} skipped)",
                commit.doc_count,
                outcome.workbooks.len(),
                commit.generation,
                outcome.skipped.len()
            );
            Ok(())
        }
        Command::Search {
            query,
            index_dir,
            field,
            limit,
        } => {
            let engine = Engine::new(Config::new(PathBuf::new(), index_dir));
            let results = engine.search(&field, &query, limit)?;

            if results.is_empty() {
                println!("no results");
                return Ok(());
            }
            for (rank, result) in results.iter().enumerate() {
                println!(
                    "{:>3}. {} [{}] score {:.3}",
                    rank + 1,
                    result.relative_path,
                    result.sheet_name,
                    result.score
                );
                if !result.highlight.is_empty() {
                    println!("     {}", result.highlight);
                }
            }
            Ok(())
        }
    }
}
