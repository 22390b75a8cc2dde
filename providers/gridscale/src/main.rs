//! gridscale provider plugin
//!
//! Reads one JSON request from stdin, runs it against the gridscale API and
//! writes the JSON response to stdout. Logs go to stderr.

use anyhow::Context;
use gridscale_client::{GridscaleClient, GridscaleClientTrait};
use gridscale_provider::{Provider, ProviderConfig, Request};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // Load configuration from environment variables
    let config = ProviderConfig::from_env()?;
    info!("Configuration:");
    info!("  gridscale URL: {}", config.api_url);
    info!("  Operation timeout: {:?}", config.timeouts.operation);
    info!("  Poll delay: {:?}", config.timeouts.poll_delay);

    let client = GridscaleClient::new(config.api_url.clone(), config.user_uuid.clone(), config.token.clone())
        .context("Failed to build gridscale client")?;
    client
        .validate_credentials()
        .await
        .context("gridscale credentials were rejected")?;

    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Failed to read request from stdin")?;
    let request: Request = serde_json::from_str(&input).context("Malformed request")?;
    info!("Handling {:?} of {}", request.operation, request.resource_type);

    let provider = Provider::new(Arc::new(client), config.timeouts);
    let response = provider.handle(request).await;

    let mut output = serde_json::to_vec(&response).context("Failed to encode response")?;
    output.push(b'\n');
    let mut stdout = tokio::io::stdout();
    stdout.write_all(&output).await.context("Failed to write response")?;
    stdout.flush().await?;

    if response.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}
