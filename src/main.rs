use quarry::chunker::Chunker;
use quarry::cli::{Cli, Commands, ConfigAction};
use quarry::config::Config;
use quarry::corpus::DirectorySource;
use quarry::embedding::{EmbeddingProvider, FastEmbedProvider};
use quarry::error::{QuarryError, Result};
use quarry::index::{HnswIndex, Indexer, SimilarityIndex};
use quarry::retrieval::HybridRetriever;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Index { docs, json } => {
            cmd_index(cli.config, docs, json).await?;
        }
        Commands::Query {
            query,
            k,
            json,
            context,
        } => {
            cmd_query(cli.config, &query, k, json, context).await?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_filter = if verbose { "quarry=debug" } else { "quarry=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };
    Config::load(&path)
}

/// Expand a leading `~` to the home directory
fn expand_path(path: &Path) -> Result<PathBuf> {
    let Ok(stripped) = path.strip_prefix("~") else {
        return Ok(path.to_path_buf());
    };
    let home = dirs::home_dir()
        .ok_or_else(|| QuarryError::Config("Cannot determine home directory".to_string()))?;
    Ok(home.join(stripped))
}

async fn cmd_index(
    config_path: Option<PathBuf>,
    docs: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;

    let docs_dir = expand_path(&docs.unwrap_or_else(|| config.corpus.docs_dir.clone()))?;
    let source = DirectorySource::new(docs_dir);

    let provider = Arc::new(FastEmbedProvider::new(&config.embedding.model)?);
    if provider.dimension() != config.indexing.vector_dim {
        return Err(QuarryError::Config(format!(
            "Embedding dimension {} does not match indexing.vector_dim {}",
            provider.dimension(),
            config.indexing.vector_dim
        )));
    }

    let index = Arc::new(HnswIndex::new(
        config.indexing.vector_dim,
        config.indexing.hnsw_ef_construction,
        config.indexing.hnsw_m,
        config.indexing.hnsw_ef_search,
    ));

    let chunker = Chunker::new(config.chunking.max_length, config.chunking.overlap);
    let indexer = Indexer::new(
        chunker,
        provider,
        Arc::clone(&index) as Arc<dyn SimilarityIndex>,
        config.embedding.batch_size,
        Duration::from_secs(config.embedding.timeout_secs),
    );

    let report = indexer.build_from_source(&source).await?;

    let snapshot_path = expand_path(&config.snapshot_path())?;
    index.save(&snapshot_path)?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&report).map_err(|e| QuarryError::Json {
                source: e,
                context: "Failed to render index report".to_string(),
            })?;
        println!("{rendered}");
    } else {
        println!("✓ Index rebuilt");
        println!("  Documents indexed: {}", report.documents_indexed);
        println!("  Chunks indexed:    {}", report.chunks_indexed);
        if !report.is_clean() {
            println!("  Failed documents:");
            for failure in &report.failures {
                println!("    {}: {}", failure.source_id, failure.reason);
            }
        }
        println!("  Duration:          {}ms", report.duration_ms);
        println!("  Snapshot:          {}", snapshot_path.display());
    }

    Ok(())
}

async fn cmd_query(
    config_path: Option<PathBuf>,
    query: &str,
    k: Option<usize>,
    json: bool,
    context: bool,
) -> Result<()> {
    let config = load_config(config_path)?;

    let snapshot_path = expand_path(&config.snapshot_path())?;
    let index = HnswIndex::load(
        &snapshot_path,
        config.indexing.vector_dim,
        config.indexing.hnsw_ef_construction,
        config.indexing.hnsw_m,
        config.indexing.hnsw_ef_search,
    )?;

    let provider = Arc::new(FastEmbedProvider::new(&config.embedding.model)?);
    let retriever = HybridRetriever::new(provider, Arc::new(index), config.retrieval.clone());

    let k = k.unwrap_or(config.retrieval.top_k);
    let result = retriever.retrieve(query, k).await?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&result).map_err(|e| QuarryError::Json {
                source: e,
                context: "Failed to render retrieval result".to_string(),
            })?;
        println!("{rendered}");
    } else if context {
        println!("{}", result.format_context());
    } else if result.is_empty() {
        println!("No results.");
    } else {
        for (i, entry) in result.entries.iter().enumerate() {
            println!(
                "[{}] Source: {} (score: {:.4})",
                i + 1,
                entry.source_id,
                entry.score
            );
            let preview: String = entry.text.chars().take(200).collect();
            println!("    {preview}...\n");
        }
    }

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let rendered = toml::to_string_pretty(&config)?;
            println!("{rendered}");
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            Config::load(&path)?;
            println!("✓ Configuration is valid: {}", path.display());
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };
            if path.exists() && !force {
                return Err(QuarryError::Config(format!(
                    "Configuration already exists at {} (use --force to overwrite)",
                    path.display()
                )));
            }
            let config = Config::default();
            config.save(&path)?;
            println!("✓ Wrote default configuration to {}", path.display());
        }
    }

    Ok(())
}
