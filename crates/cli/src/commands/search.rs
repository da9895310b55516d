//! Search command handler.

use clap::Args;
use osindex::{IndexService, IndexTarget, DEFAULT_NUM_RESULTS};
use osindex_core::config::AppConfig;

/// Free-text k-NN search over one or more indices
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text
    pub query: String,

    /// Comma-separated index names
    #[arg(short, long)]
    pub index: String,

    /// Number of results
    #[arg(short = 'k', long, default_value_t = DEFAULT_NUM_RESULTS)]
    pub num_results: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing search command over '{}'", self.index);
        tracing::debug!("Search options: {:?}", self);

        let target = IndexTarget::from(self.index.as_str());
        let service = IndexService::connect(config).await?;
        let hits = service
            .search(&self.query, &target, self.num_results)
            .await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&hits)?);
            return Ok(());
        }

        if hits.is_empty() {
            println!("No results in {}", target);
            return Ok(());
        }

        for (rank, hit) in hits.iter().enumerate() {
            let score = hit.score.map(|s| format!("{:.4}", s)).unwrap_or_else(|| "-".to_string());
            println!(
                "{}. [{}] {} ({})",
                rank + 1,
                score,
                hit.file_name().unwrap_or("<unknown>"),
                hit.index
            );
            if let Some(text) = hit.text() {
                let preview: String = text.chars().take(160).collect();
                println!("   {}", preview);
            }
        }

        Ok(())
    }
}
