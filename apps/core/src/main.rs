// Payplan backend entry point.
// Glue service: free-text payment instruction -> generative API -> validated JSON schedule.

mod auth;
mod config;
mod error;
mod gateway;
mod models;
mod schedule;
mod server;

#[cfg(test)]
mod tests;

use config::Settings;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Arc::new(Settings::from_env());
    let addr = format!("{}:{}", settings.host, settings.port);
    let router = server::build_router(settings);

    info!("AI Payment Schedule Parser listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
