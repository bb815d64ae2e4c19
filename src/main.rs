//! authlink CLI: reconcile a researcher registry with a bibliographic provider.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use authlink::cache::DistanceCache;
use authlink::config::JobConfig;
use authlink::graph::store::rdf_format;
use authlink::graph::{SparqlStore, iri};
use authlink::orchestrator::Reconciler;
use authlink::paths::AuthlinkPaths;
use authlink::provider::http::HttpDereferencer;
use authlink::vocab;

#[derive(Parser)]
#[command(name = "authlink", version, about = "Author reconciliation against bibliographic providers")]
struct Cli {
    /// Root directory for the graph store and cache (defaults to XDG dirs).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Job configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reconciliation batch.
    Run {
        /// Reprocess authors and queries already handled by earlier runs.
        #[arg(long)]
        process_all: bool,

        /// Disable the keyword relatedness filter for publications.
        #[arg(long)]
        no_semantic: bool,

        /// Override the number of workers.
        #[arg(long)]
        workers: Option<usize>,

        /// Print the terminal status as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Load an RDF file into a named graph.
    Load {
        /// RDF file to load.
        #[arg(long)]
        file: PathBuf,

        /// Target named graph IRI (defaults to the authors graph).
        #[arg(long)]
        graph: Option<String>,

        /// RDF format name or media type (defaults to the file extension).
        #[arg(long)]
        format: Option<String>,
    },

    /// Show marker counts for the configured provider graph.
    Status,

    /// Inspect or maintain the cache files.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Write the effective configuration to the config path.
    InitConfig,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show entry counts.
    Stats,
    /// Flush and compact both cache files now.
    Compact,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let paths = match &cli.data_dir {
        Some(root) => AuthlinkPaths::rooted(root),
        None => AuthlinkPaths::resolve()?,
    };
    paths.ensure_dirs()?;

    let config_path = cli.config.clone().unwrap_or_else(|| paths.config_file());
    let mut config = if config_path.exists() {
        JobConfig::load(&config_path)?
    } else {
        if cli.config.is_some() {
            miette::bail!("config file not found: {}", config_path.display());
        }
        JobConfig::default()
    };
    config.cache.memo_file.get_or_insert_with(|| paths.memo_file());
    config.cache.distance_file.get_or_insert_with(|| paths.distance_file());

    match cli.command {
        Commands::Run {
            process_all,
            no_semantic,
            workers,
            json,
        } => {
            config.process_all_authors |= process_all;
            if no_semantic {
                config.semantic_analyzer = false;
            }
            if let Some(workers) = workers {
                config.workers = workers;
            }
            config.validate()?;

            let stop = Arc::new(AtomicBool::new(false));
            register_stop_signals(&stop)?;

            let store = SparqlStore::open(&paths.graph_dir())?;
            let report = DistanceCache::scoped(&config.cache, |cache| {
                let http = HttpDereferencer::new(&config.provider);
                Reconciler::new(config.clone(), store, Arc::clone(cache), Box::new(http))
                    .map(|r| r.with_stop_flag(Arc::clone(&stop)))
                    .and_then(|r| r.run())
            })?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
            } else {
                println!("{report}");
            }
        }

        Commands::Load { file, graph, format } => {
            let graph = iri(graph.as_deref().unwrap_or(&config.graphs.authors))?;
            let format = resolve_format(&file, format.as_deref())?;
            let reader = std::fs::File::open(&file).into_diagnostic()?;
            let store = SparqlStore::open(&paths.graph_dir())?;
            let before = store.len()?;
            store.load(format, std::io::BufReader::new(reader), Some(&graph), None)?;
            let after = store.len()?;
            println!(
                "Loaded {} quads from {} into {graph}",
                after.saturating_sub(before),
                file.display()
            );
        }

        Commands::Status => {
            let store = SparqlStore::open(&paths.graph_dir())?;
            let provider_graph = iri(&config.provider_graph())?;
            let processed = store.count(&provider_graph, &iri(vocab::PROCESSED_BY)?)?;
            let attempts = store.count(&provider_graph, &iri(vocab::OWL_ONE_OF)?)?;
            let links = store.count(&provider_graph, &iri(vocab::OWL_SAME_AS)?)?;
            println!("Provider: {} ({provider_graph})", config.provider.name);
            println!("  processed authors: {processed}");
            println!("  linked authors:    {links}");
            println!("  attempted queries: {attempts}");
            println!("  total quads:       {}", store.len()?);
        }

        Commands::Cache { action } => {
            let mut cache = DistanceCache::open(&config.cache)?;
            match action {
                CacheAction::Stats => {
                    let stats = cache.stats()?;
                    println!("Memo:      {} entries", stats.memo_persisted);
                    println!("Distances: {} entries", stats.distance_persisted);
                }
                CacheAction::Compact => {
                    cache.flush()?;
                    let compacted = cache.compact()?;
                    if compacted {
                        println!("Cache compacted.");
                    } else {
                        println!("Cache already compact.");
                    }
                }
            }
        }

        Commands::InitConfig => {
            config.save(&config_path)?;
            println!("Wrote {}", config_path.display());
        }
    }

    Ok(())
}

/// First SIGINT/SIGTERM stops the batch after the in-flight authors; a second
/// one exits immediately.
fn register_stop_signals(stop: &Arc<AtomicBool>) -> Result<()> {
    for &signal in signal_hook::consts::TERM_SIGNALS {
        signal_hook::flag::register_conditional_shutdown(signal, 1, Arc::clone(stop))
            .into_diagnostic()?;
        signal_hook::flag::register(signal, Arc::clone(stop)).into_diagnostic()?;
    }
    Ok(())
}

fn resolve_format(file: &Path, format: Option<&str>) -> Result<oxigraph::io::RdfFormat> {
    let guess = match format {
        Some(name) => rdf_format(name),
        None => file
            .extension()
            .and_then(|e| e.to_str())
            .and_then(rdf_format),
    };
    guess.ok_or_else(|| miette::miette!("cannot determine RDF format of {}; pass --format", file.display()))
}
