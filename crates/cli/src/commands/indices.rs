//! Indices command handler.
//!
//! Handles index lifecycle: listing, creation, and removal.

use clap::{Args, Subcommand};
use osindex::IndexService;
use osindex_core::config::AppConfig;

/// Index lifecycle management
#[derive(Args, Debug)]
pub struct IndicesCommand {
    #[command(subcommand)]
    pub action: IndicesAction,
}

#[derive(Subcommand, Debug)]
pub enum IndicesAction {
    /// List all indices on the backend
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create an index with the vector schema
    Create {
        /// Index name
        name: String,
    },
    /// Create an index unless it already exists
    Ensure {
        /// Index name
        name: String,
    },
    /// Drop an index and every document in it
    Drop {
        /// Index name
        name: String,
    },
    /// Report whether an index exists (fails when it does not)
    Exists {
        /// Index name
        name: String,
    },
}

impl IndicesCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::debug!("Indices options: {:?}", self.action);
        let service = IndexService::connect_backend(config).await?;

        match &self.action {
            IndicesAction::List { json } => {
                let indices = service.list_indices().await?;
                if *json {
                    println!("{}", serde_json::to_string_pretty(&indices)?);
                } else if indices.is_empty() {
                    println!("No indices found");
                } else {
                    for index in indices {
                        println!(
                            "{:<32} {:>10} docs  {:>8}  {}",
                            index.name,
                            index.docs_count.as_deref().unwrap_or("-"),
                            index.store_size.as_deref().unwrap_or("-"),
                            index.health.as_deref().unwrap_or("-"),
                        );
                    }
                }
            }
            IndicesAction::Create { name } => {
                service.create_index(name).await?;
                println!("✓ Created index '{}' (dimension {})", name, config.dimension);
            }
            IndicesAction::Ensure { name } => {
                if service.ensure_index(name).await? {
                    println!("✓ Created index '{}' (dimension {})", name, config.dimension);
                } else {
                    println!("Index '{}' already exists", name);
                }
            }
            IndicesAction::Drop { name } => {
                service.drop(name).await?;
                println!("✓ Dropped index '{}'", name);
            }
            IndicesAction::Exists { name } => {
                let exists = service.manager().try_index_exists(name).await?;
                println!("{}", exists);
                require_exists(name, exists)?;
            }
        }

        Ok(())
    }
}

/// An absent index fails the command so the process exits non-zero.
fn require_exists(name: &str, exists: bool) -> anyhow::Result<()> {
    if !exists {
        anyhow::bail!("Index '{}' does not exist", name);
    }
    Ok(())
}
