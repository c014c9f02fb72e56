//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "quarry",
    version,
    about = "Hybrid document retrieval for grounded question answering",
    long_about = "Quarry indexes a corpus of plain-text documents into overlapping chunks with \
                  local embeddings, then answers queries by fusing semantic similarity with \
                  keyword evidence so a downstream generator can cite its sources."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/quarry/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rebuild the searchable index from the document corpus
    Index {
        /// Corpus directory (defaults to the configured corpus.docs_dir)
        #[arg(short, long)]
        docs: Option<PathBuf>,

        /// Print the index report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Retrieve the most relevant chunks for a query
    Query {
        /// Query text
        query: String,

        /// Number of results to return (defaults to retrieval.top_k)
        #[arg(short, long)]
        k: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Print the assembled context block instead of the ranked list
        #[arg(long)]
        context: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
