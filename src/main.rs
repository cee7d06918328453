//! CLI interface for semantic search

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use semantic_search::embedder::{self, Embedder};
use semantic_search::persistence::IndexLoader;
use semantic_search::server::{self, AppState};
use semantic_search::{Config, Hit, IndexBuilder, QueryEngine, VectorStore};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "semsearch")]
#[command(about = "Search a text corpus by meaning using embeddings", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Artifact directory (overrides configuration)
    #[arg(long, global = true)]
    artifacts: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed a corpus directory and publish the index artifacts
    Build {
        /// Directory of text files (overrides configuration)
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
    /// Run a single query
    Search {
        /// Free-text query
        query: String,
        /// Number of results to return
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Interactive query prompt
    Repl {
        /// Number of results to return
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Summarize the published artifacts
    Info,
    /// Start the HTTP query API
    Serve {
        /// Address to bind to
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: String,
    },
}

fn init_logging(cli: &Cli) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

fn print_hits(hits: &[Hit]) {
    if hits.is_empty() {
        println!("No results found (index is empty)");
        return;
    }
    for hit in hits {
        println!(
            "{}. {} (score: {:.3})",
            hit.result.rank, hit.result.metadata.source, hit.result.score
        );
        println!("   {}", hit.preview);
    }
}

fn load(loader: &IndexLoader, embedder: &dyn Embedder) -> Result<VectorStore> {
    let (store, manifest) = loader
        .load_store()
        .with_context(|| format!("failed to load index from {}", loader.dir().display()))?;
    if let Some(manifest) = manifest {
        if manifest.model_id != embedder.model_id() {
            log::warn!(
                "Index was built with {} but queries use {}; scores may be meaningless",
                manifest.model_id,
                embedder.model_id()
            );
        }
    }
    Ok(store)
}

fn repl(engine: &QueryEngine<'_>, k: usize) -> Result<()> {
    println!("Semantic search ready. Type a query and press Enter ('exit' to quit).");
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("Query: ");
        io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let query = line.trim();
        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
            break;
        }
        if query.is_empty() {
            continue;
        }
        match engine.answer(query, k) {
            Ok(hits) => print_hits(&hits),
            Err(e) => eprintln!("Error: {}", e),
        }
        println!();
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.artifacts {
        config.index.artifact_dir = dir;
    }
    let embedder: Arc<dyn Embedder> = Arc::from(embedder::from_config(&config.embedder)?);
    let loader = IndexLoader::new(&config.index.artifact_dir);

    match cli.command {
        Commands::Build { corpus } => {
            let corpus = corpus.unwrap_or_else(|| config.corpus.dir.clone());
            let report = IndexBuilder::new(embedder.as_ref(), &config.index.artifact_dir)
                .with_extensions(&config.corpus.extensions)
                .build(&corpus)
                .with_context(|| format!("failed to build index from {}", corpus.display()))?;
            println!(
                "Indexed {} documents ({} skipped, dimension {}, model {})",
                report.document_count, report.skipped_count, report.dimension, report.model_id
            );
            println!("Artifacts written to {}", report.output.display());
        }
        Commands::Search { query, k } => {
            let store = load(&loader, embedder.as_ref())?;
            let engine = QueryEngine::new(&store, embedder.as_ref())
                .with_preview_chars(config.query.preview_chars);
            let hits = engine.answer(&query, k.unwrap_or(config.query.top_k))?;
            print_hits(&hits);
        }
        Commands::Repl { k } => {
            let store = load(&loader, embedder.as_ref())?;
            let engine = QueryEngine::new(&store, embedder.as_ref())
                .with_preview_chars(config.query.preview_chars);
            repl(&engine, k.unwrap_or(config.query.top_k))?;
        }
        Commands::Info => {
            let store = load(&loader, embedder.as_ref())?;
            println!("Artifacts: {}", loader.dir().display());
            println!("Documents: {}", store.len());
            println!("Dimension: {}", store.dimension());
            if let Some(manifest) = loader.read_manifest()? {
                println!("Model:     {}", manifest.model_id);
                println!("Skipped:   {}", manifest.skipped.len());
            }
        }
        Commands::Serve { addr } => {
            let store = Arc::new(load(&loader, embedder.as_ref())?);
            let state = Arc::new(
                AppState::new(store, Arc::clone(&embedder))
                    .with_query_defaults(config.query.top_k, config.query.preview_chars),
            );
            // Blocking embedder clients must be created and dropped outside the runtime.
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::start(&addr, state))?;
        }
    }
    Ok(())
}
