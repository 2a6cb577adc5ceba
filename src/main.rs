/// file: src/main.rs
/// description: CLI entrypoint, logging setup, and server startup.
mod api;
mod config;
mod extract;
mod models;
mod normalize;
mod scan;
mod scraper;

use anyhow::Result;
use axum::http::{HeaderValue, Method, header};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// vidscout: video search results as structured JSON.
#[derive(Debug, Parser)]
#[command(name = "vidscout", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP API server.
    Serve,
    /// Run one search and print the response envelope as JSON.
    Search {
        /// Free-text query.
        query: String,
        /// Number of results (clamped to 3..=10, default 6).
        #[arg(long)]
        max: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG wins; LOG_FORMAT=json switches to machine-readable output.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vidscout=debug"));

    let json_format = std::env::var("LOG_FORMAT").as_deref() == Ok("json");
    if json_format {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    let cfg = config::Config::from_env()?;
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => run_server(cfg).await,
        Command::Search { query, max } => run_search_once(cfg, query, max).await,
    }
}

// ---------------------------------------------------------------------------
// Sub-command handlers
// ---------------------------------------------------------------------------

async fn run_server(cfg: config::Config) -> Result<()> {
    let addr = cfg.server.addr()?;
    let state = api::AppState {
        scraper: Arc::new(scraper::Scraper::new(&cfg.search)?),
    };

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if !cfg.server.cors_allow_origins.is_empty() {
        let mut origins = Vec::with_capacity(cfg.server.cors_allow_origins.len());
        for origin in &cfg.server.cors_allow_origins {
            origins.push(HeaderValue::from_str(origin).map_err(|e| {
                anyhow::anyhow!("Invalid CORS_ALLOW_ORIGINS entry `{origin}`: {e}")
            })?);
        }
        cors = cors.allow_origin(origins);
    }

    let app = api::router(state)
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_search_once(cfg: config::Config, query: String, max: Option<f64>) -> Result<()> {
    let scraper = scraper::Scraper::new(&cfg.search)?;
    let req = models::SearchRequest {
        query: Some(query),
        max,
    };

    let response = api::run_search(&scraper, req).await.map_err(|e| {
        anyhow::anyhow!("Search failed: {e}\nCause chain: {}", error_chain(&e))
    })?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Walks the `std::error::Error::source()` chain and returns each cause
/// joined with " -> " so the full context is visible in a single line.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut parts = Vec::new();
    let mut src = e.source();
    while let Some(cause) = src {
        parts.push(cause.to_string());
        src = cause.source();
    }
    if parts.is_empty() {
        String::from("(no further cause)")
    } else {
        parts.join(" -> ")
    }
}
