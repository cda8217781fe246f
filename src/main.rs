/*
 * Responsibility
 * - tracing subscriber + tokio runtime startup
 * - app::run() only (no logic here)
 */
use anyhow::Result;
use tracing_subscriber::EnvFilter;

use bearer_gate::app;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    app::run().await
}
