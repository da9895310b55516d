//! Delete command handler.

use clap::Args;
use osindex::IndexService;
use osindex_core::{config::AppConfig, DeleteTarget};

/// Delete every chunk of a source file
#[derive(Args, Debug)]
pub struct DeleteCommand {
    /// Index the deletion is issued against
    pub index: String,

    /// Exact file name stored with each chunk
    pub file_name: String,

    /// Delete matches from the named index only, wherever they were found
    #[arg(long)]
    pub caller_index_only: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl DeleteCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!(
            "Executing delete command for '{}' via index '{}'",
            self.file_name,
            self.index
        );

        let target = if self.caller_index_only {
            DeleteTarget::CallerIndex
        } else {
            config.deletion.target
        };

        let service = IndexService::connect_backend(config).await?;
        let report = service
            .deletion()
            .delete_by_file_name_with(&self.index, &self.file_name, target)
            .await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!(
                "✓ Deleted {}/{} chunk(s) of '{}' across {} index(es)",
                report.deleted,
                report.matched,
                report.file_name,
                report.searched_indices.len()
            );
            for failure in &report.failed {
                println!("  ✗ {}/{}: {}", failure.index, failure.id, failure.error);
            }
        }

        if !report.failed.is_empty() {
            anyhow::bail!(
                "{} of {} deletion(s) failed",
                report.failed.len(),
                report.matched
            );
        }
        if report.is_truncated() {
            anyhow::bail!(
                "Only {} of {} matches were located; run the deletion again",
                report.matched,
                report.total_matches.unwrap_or_default()
            );
        }

        Ok(())
    }
}
