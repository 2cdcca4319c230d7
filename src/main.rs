use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use usage_meta::api::{build_router, cors_layer, state::AppState};
use usage_meta::config::AppConfig;
use usage_meta::fetch::SmogonSource;
use usage_meta::reference::{Pokedex, RestrictedNames};
use usage_meta::service::StatsService;

#[derive(Parser)]
#[command(name = "usage-meta")]
#[command(about = "Competitive usage statistics with derived rankings and stat spreads")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Bind address (defaults to the config file)
        #[arg(long)]
        host: Option<String>,

        /// Port number (defaults to the config file)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the usage overview for a format
    Overview {
        /// Period (YYYY-MM)
        #[arg(long)]
        period: String,

        /// Format identifier (e.g. gen9vgc2024regg-bo3-1760.json)
        #[arg(long)]
        format: String,
    },

    /// Print the breakdown for one entity
    Detail {
        #[arg(long)]
        period: String,

        #[arg(long)]
        format: String,

        /// Entity name as it appears in the usage document
        #[arg(long)]
        name: String,
    },

    /// List available periods
    Periods,

    /// List formats for a period
    Formats {
        #[arg(long)]
        period: String,
    },
}

fn build_service(config: &AppConfig) -> Result<StatsService> {
    let source = SmogonSource::new(config.source.fetcher_config()?)
        .context("Failed to build HTTP client")?;
    let pokedex = Pokedex::load_or_empty(&config.reference.pokedex_path);
    let restricted = RestrictedNames::load_or_empty(&config.reference.restricted_path);
    let (cache, listings) = config.cache.build()?;

    Ok(StatsService::new(Arc::new(source), Arc::new(pokedex), Arc::new(restricted))
        .with_cache(cache, listings)
        .with_fetch_timeout(config.source.timeout()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;

    // Initialize tracing
    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(cli.json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!cli.json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    tracing::info!("Starting usage-meta v{}", env!("CARGO_PKG_VERSION"));

    let service = build_service(&config)?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let app = build_router(AppState::new(service))
                .layer(cors_layer(&config.server.cors_origin));
            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
        Commands::Overview { period, format } => {
            let overview = service.get_overview(&period, &format).await?;
            print_json(overview.as_ref())?;
        }
        Commands::Detail {
            period,
            format,
            name,
        } => {
            let detail = service.get_detail(&period, &format, &name).await?;
            print_json(detail.as_ref())?;
        }
        Commands::Periods => {
            print_json(&service.periods().await?)?;
        }
        Commands::Formats { period } => {
            print_json(&service.formats(&period).await?)?;
        }
    }

    Ok(())
}
