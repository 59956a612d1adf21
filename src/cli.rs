use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use clap_complete::Shell;

use crate::{
    chunking::DEFAULT_CHUNK_SIZE,
    error::{Error, Result},
    search::{Mode, OutputFormat},
};

/// Number of results returned when `--top` is not given.
pub const DEFAULT_TOP_K: usize = 5;

/// Printed on stderr when the query is missing.
pub const USAGE: &str = "\
Usage: docsearch <query> [--top N] [--fast] [--llm | --json] [--index] [--verbose]

Examples:
  docsearch \"how to use prefetchQuery\"
  docsearch \"mutations\" --top 3
  docsearch \"authentication\" --llm
  docsearch --index";

#[derive(Debug, Parser)]
#[command(
    name = "docsearch",
    version,
    about = "Search the project's .docs directory by meaning or by fuzzy match"
)]
pub struct Cli {
    /// Free-text query
    pub query: Option<String>,

    /// Number of results to return
    #[arg(short = 'n', long = "top", default_value_t = DEFAULT_TOP_K)]
    pub top: usize,

    /// Use fuzzy string matching instead of embeddings (no model needed)
    #[arg(long)]
    pub fast: bool,

    /// Print results as one markdown document for pasting into a prompt
    #[arg(long, conflicts_with = "json")]
    pub llm: bool,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Build or refresh the embedding cache and exit
    #[arg(long)]
    pub index: bool,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Maximum passage size in characters
    #[arg(short = 'c', long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Search this directory instead of locating .docs
    #[arg(long)]
    pub docs_dir: Option<PathBuf>,

    /// Override the embedding model ID or local model path
    #[arg(long)]
    pub model: Option<String>,

    /// Print shell completions and exit
    #[arg(long, value_enum, hide = true)]
    pub completions: Option<Shell>,
}

/// A validated request, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Empty only when `index_only` is set.
    pub query: String,
    pub top_k: usize,
    pub mode: Mode,
    pub output: OutputFormat,
    pub index_only: bool,
    pub verbose: bool,
    pub chunk_size: usize,
}

impl Cli {
    /// Check the arguments that clap cannot, without touching the
    /// filesystem.
    pub fn invocation(&self) -> Result<Invocation> {
        if self.chunk_size == 0 {
            return Err(Error::Usage(
                "--chunk-size must be greater than zero".to_string(),
            ));
        }

        let query = self.query.as_deref().map(str::trim).unwrap_or_default();
        if query.is_empty() && !self.index {
            return Err(Error::Usage(USAGE.to_string()));
        }

        let output = if self.json {
            OutputFormat::Json
        } else if self.llm {
            OutputFormat::Llm
        } else {
            OutputFormat::Human
        };

        Ok(Invocation {
            query: query.to_string(),
            top_k: self.top,
            mode: if self.fast { Mode::Fast } else { Mode::Semantic },
            output,
            index_only: self.index,
            verbose: self.verbose > 0,
            chunk_size: self.chunk_size,
        })
    }
}

/// Generate shell completions and print to stdout.
pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "docsearch", &mut std::io::stdout());
}
