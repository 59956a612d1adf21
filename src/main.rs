use std::process::ExitCode;

use clap::Parser;
use docsearch::{
    CacheStore, DocsDir, ModelManager,
    cli::{self, Cli, Invocation},
    corpus,
    error::{self, Error},
    search::{self, SearchParams},
    semantic::SemanticMatcher,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8) {
    let filter = if let Ok(env) = std::env::var("DOCSEARCH_LOG") {
        EnvFilter::new(env)
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Some(shell) = cli.completions {
        cli::print_completions(shell);
        return ExitCode::SUCCESS;
    }

    let invocation = match cli.invocation() {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(cli.verbose);

    match run(&cli, &invocation) {
        Ok(code) => code,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn report(e: &Error) {
    eprintln!("Error: {e}");
    if let Some(hint) = e.hint() {
        eprintln!("hint: {hint}");
    }
}

fn run(cli: &Cli, invocation: &Invocation) -> error::Result<ExitCode> {
    let docs_dir = DocsDir::resolve(cli.docs_dir.as_deref())?;
    let corpus = corpus::load_corpus(docs_dir.root(), invocation.chunk_size)?;

    let model = match &cli.model {
        Some(id) => ModelManager::with_model_id(id.clone()),
        None => ModelManager::new(),
    };
    let mut semantic =
        SemanticMatcher::new(model, CacheStore::for_docs_dir(&docs_dir))
            .with_progress(invocation.verbose);

    if invocation.index_only {
        let outcome = semantic.ensure_index(&corpus.passages)?;
        debug!(
            reused = outcome.reused,
            embedded = outcome.embedded,
            saved = outcome.saved,
            "index ready"
        );
        let cache = semantic.cache();
        println!(
            "Indexed {} chunks from {} files",
            corpus.passages.len(),
            corpus.file_count
        );
        println!(
            "Cache: {} ({} embeddings, {} bytes)",
            cache.path().display(),
            outcome.embeddings.len(),
            cache.size_on_disk().unwrap_or(0)
        );
        return Ok(ExitCode::SUCCESS);
    }

    if corpus.is_empty() {
        eprintln!("No documents found in {}", docs_dir.root().display());
        return Ok(ExitCode::FAILURE);
    }

    let params = SearchParams {
        query: invocation.query.clone(),
        top_k: invocation.top_k,
        mode: invocation.mode,
    };
    let results =
        search::execute_search(&params, &corpus.passages, &mut semantic)?;

    if results.is_empty() {
        eprintln!("No results found.");
        return Ok(ExitCode::FAILURE);
    }

    print!(
        "{}",
        search::render(&results, &params.query, params.mode, invocation.output)?
    );
    Ok(ExitCode::SUCCESS)
}
