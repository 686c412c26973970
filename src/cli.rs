use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// CLI over the resolution engine, for debugging and scripted use
#[derive(Parser)]
#[command(name = "medley")]
#[command(about = "Resolve social and media-sharing links into downloadable media", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a URL into its media items
    Resolve {
        /// URL to resolve
        url: String,
        /// Largest acceptable rendition, in bytes
        #[arg(long)]
        max_size: Option<f64>,
        /// Skip cache reads for this request
        #[arg(long)]
        no_cache: bool,
        /// Abort resolution after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Show configured extractors and whether they are usable
    Extractors,
    /// Print the combined extractor configuration schema
    Schema,
    /// Remove cached records, all of them or by key prefix
    ClearCache {
        /// Only remove records whose key starts with this prefix
        #[arg(short, long)]
        prefix: Option<String>,
    },
}
