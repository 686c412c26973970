mod cli;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use medley::config::Config;
use medley::context::RequestContext;
use medley::db::Database;
use medley::registry::ExtractorRegistry;
use medley::Medley;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Resolve { url, max_size, no_cache, timeout_secs } => {
            let engine = Medley::connect(&config, true).await?;
            let mut ctx = RequestContext::default()
                .with_service("cli")
                .with_cache(!no_cache);
            if let Some(max_size) = max_size {
                ctx = ctx.with_max_size(max_size);
            }
            if let Some(secs) = timeout_secs {
                ctx = ctx.with_timeout(Duration::from_secs(secs));
            }
            let result = engine.resolve(&url, &ctx).await?;
            if result.is_empty() {
                eprintln!("no media found");
            } else {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }
        Commands::Extractors => {
            let engine = Medley::without_cache(&config)?;
            let supported = engine.supported();
            if supported.is_empty() {
                eprintln!("no extractors configured");
            }
            for (kind, enabled) in supported {
                println!("{kind}: {}", if enabled { "enabled" } else { "disabled" });
            }
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&ExtractorRegistry::schema())?);
        }
        Commands::ClearCache { prefix } => {
            let db = Database::connect(config.database_url.as_deref()).await?;
            db.run_migrations().await?;
            let removed = db.clear_cache_prefix(prefix.as_deref()).await?;
            println!("removed {removed} cached record(s)");
        }
    }
    Ok(())
}
