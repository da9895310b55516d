//! Insert command handler.

use anyhow::Context;
use clap::Args;
use osindex::{BulkPayload, IndexService};
use osindex_core::config::AppConfig;
use std::path::{Path, PathBuf};

/// Bulk-insert documents from an NDJSON file
#[derive(Args, Debug)]
pub struct InsertCommand {
    /// NDJSON bulk payload (action line followed by document line)
    #[arg(short, long)]
    pub file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Read and parse a bulk payload file.
pub fn read_payload(path: &Path) -> anyhow::Result<BulkPayload> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read payload file {}", path.display()))?;
    BulkPayload::from_ndjson(&content)
        .with_context(|| format!("Invalid bulk payload in {}", path.display()))
}

impl InsertCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing insert command from {}", self.file.display());

        let payload = read_payload(&self.file)?;
        let service = IndexService::connect_backend(config).await?;
        let response = service.insert(&payload).await?;

        if self.json {
            let output = serde_json::json!({
                "operations": payload.len(),
                "took": response.took,
                "ids": response.ids(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("✓ Inserted {} document(s)", response.items.len());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_payload() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"index":{{"_index":"docs"}}}}"#).unwrap();
        writeln!(
            file,
            r#"{{"langchain_vector":[0.1,0.2],"langchain_text":"t","langchain_source":"s","langchain_file_name":"a.pdf"}}"#
        )
        .unwrap();

        let payload = read_payload(file.path()).unwrap();
        assert_eq!(payload.len(), 1);
        assert_eq!(payload.operations[0].index, "docs");
    }

    #[test]
    fn test_read_payload_missing_file() {
        let err = read_payload(Path::new("/nonexistent/payload.ndjson")).unwrap_err();
        assert!(err.to_string().contains("Failed to read payload file"));
    }

    #[test]
    fn test_read_payload_rejects_dangling_action() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"index":{{"_index":"docs"}}}}"#).unwrap();

        let err = read_payload(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid bulk payload"));
    }
}
