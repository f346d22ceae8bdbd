//! pihole-customdns daemon entry point.

use anyhow::Context;
use log::{info, warn};
use tokio::signal;

mod config;
mod error;
mod labels;
mod provider;
mod reconciler;
mod runtime;
mod types;

use config::Config;
use provider::{DnsProvider, PiholeClient};
use reconciler::Reconciler;
use runtime::DockerRuntime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging, defaulting to info
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Load configuration
    let cfg = Config::load()?;
    info!("Starting pihole-customdns with config: {:?}", cfg);

    let runtime = DockerRuntime::connect().context("Error connecting to Docker")?;

    let mut providers = Vec::with_capacity(cfg.endpoints.len());
    for endpoint in &cfg.endpoints {
        let client = PiholeClient::new(endpoint.clone(), cfg.request_timeout)
            .with_context(|| format!("Error creating HTTP client for Pi-hole {}", endpoint))?;
        client
            .probe()
            .await
            .with_context(|| format!("Error connecting to Pi-hole {}. Check API token.", endpoint))?;
        info!("Connected to Pi-hole {} successfully", endpoint);
        providers.push(client);
    }
    info!("Managing records: {}", cfg.target);

    let reconciler = Reconciler::new(runtime, providers, cfg.target);

    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down..."),
            Err(err) => {
                warn!("Unable to listen for shutdown signal: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        result = reconciler.run() => result?,
        () = shutdown => {}
    }

    info!("Shutdown complete.");
    Ok(())
}
