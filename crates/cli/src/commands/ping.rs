//! Ping command handler.

use clap::Args;
use osindex::OpenSearchBackend;
use osindex_core::config::AppConfig;

/// Check that the backend is reachable
#[derive(Args, Debug)]
pub struct PingCommand {}

impl PingCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Pinging backend at {}", config.endpoint);

        let backend = OpenSearchBackend::new(config)?;
        backend.verify().await?;

        println!("✓ Backend reachable at {}", config.endpoint);
        Ok(())
    }
}
