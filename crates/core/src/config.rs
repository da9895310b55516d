//! Configuration management for osindex.
//!
//! Configuration is layered, lowest precedence first:
//! - Built-in defaults
//! - Config file (`OSINDEX_CONFIG` or `./osindex.yaml`)
//! - Environment variables
//! - Command-line flags

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Default search backend node.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:9200";

/// Default vector dimension (OpenAI `text-embedding-3-small`/`ada-002`).
pub const DEFAULT_DIMENSION: usize = 1536;

/// Upper bound on matches fetched by a single metadata deletion search.
pub const DEFAULT_DELETE_SEARCH_CAP: usize = 9999;

/// Default number of in-flight delete-by-id requests.
pub const DEFAULT_DELETE_CONCURRENCY: usize = 8;

const DEFAULT_CONFIG_FILE: &str = "osindex.yaml";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Search backend node URL
    pub endpoint: String,

    /// HTTP basic auth user for the backend
    pub username: Option<String>,

    /// HTTP basic auth password for the backend
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Per-request timeout against the backend and embedding API
    pub request_timeout_secs: u64,

    /// Vector field dimension used for new indices and ingestion checks
    pub dimension: usize,

    /// Embedding provider settings
    pub embedding: EmbeddingSettings,

    /// Metadata deletion settings
    pub deletion: DeletionSettings,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// Provider name: "openai" or "mock"
    pub provider: String,

    /// Model identifier passed to the provider
    pub model: String,

    /// Base URL of an OpenAI-compatible embeddings API
    pub endpoint: String,

    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

impl EmbeddingSettings {
    /// Resolve the API key from the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

/// Which index a matched document is deleted from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DeleteTarget {
    /// Delete each match from the index it was found in.
    #[default]
    OwningIndex,
    /// Delete every match from the index named by the caller, wherever it
    /// was found. Matches living in other indices are left in place.
    CallerIndex,
}

impl std::str::FromStr for DeleteTarget {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owning-index" => Ok(DeleteTarget::OwningIndex),
            "caller-index" => Ok(DeleteTarget::CallerIndex),
            other => Err(AppError::Config(format!(
                "Unknown delete target '{}'. Supported: owning-index, caller-index",
                other
            ))),
        }
    }
}

/// Metadata deletion configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeletionSettings {
    /// Maximum matches fetched by the locate search
    pub search_cap: usize,

    /// Maximum in-flight delete-by-id requests
    pub concurrency: usize,

    /// Where matched documents are deleted from
    pub target: DeleteTarget,
}

impl Default for DeletionSettings {
    fn default() -> Self {
        Self {
            search_cap: DEFAULT_DELETE_SEARCH_CAP,
            concurrency: DEFAULT_DELETE_CONCURRENCY,
            target: DeleteTarget::default(),
        }
    }
}

/// Config file structure. Every section and key is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    backend: Option<BackendSection>,
    index: Option<IndexSection>,
    embedding: Option<EmbeddingSection>,
    deletion: Option<DeletionSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackendSection {
    endpoint: Option<String>,
    username: Option<String>,
    password_env: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct IndexSection {
    dimension: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmbeddingSection {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    api_key_env: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeletionSection {
    search_cap: Option<usize>,
    concurrency: Option<usize>,
    target: Option<DeleteTarget>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            username: None,
            password: None,
            request_timeout_secs: 30,
            dimension: DEFAULT_DIMENSION,
            embedding: EmbeddingSettings::default(),
            deletion: DeletionSettings::default(),
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file and environment variables.
    ///
    /// Environment variables:
    /// - `OSINDEX_CONFIG`: Path to config file
    /// - `OSINDEX_ENDPOINT`: Backend node URL
    /// - `OSINDEX_USERNAME` / `OSINDEX_PASSWORD`: Backend basic auth
    /// - `OSINDEX_DIMENSION`: Vector dimension
    /// - `OSINDEX_EMBEDDING_PROVIDER` / `OSINDEX_EMBEDDING_MODEL`
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_with(None)
    }

    /// Like [`AppConfig::load`], reading `config_file` instead of
    /// `OSINDEX_CONFIG` when given.
    pub fn load_with(config_file: Option<&Path>) -> AppResult<Self> {
        let env_file = std::env::var("OSINDEX_CONFIG").ok().map(PathBuf::from);
        let mut config = Self::load_from(config_file.or(env_file.as_deref()))?;

        if let Ok(endpoint) = std::env::var("OSINDEX_ENDPOINT") {
            config.endpoint = endpoint;
        }

        if let Ok(username) = std::env::var("OSINDEX_USERNAME") {
            config.username = Some(username);
        }

        if let Ok(password) = std::env::var("OSINDEX_PASSWORD") {
            config.password = Some(password);
        }

        if let Ok(dimension) = std::env::var("OSINDEX_DIMENSION") {
            config.dimension = dimension.parse().map_err(|_| {
                AppError::Config(format!("OSINDEX_DIMENSION is not a number: {}", dimension))
            })?;
        }

        if let Ok(provider) = std::env::var("OSINDEX_EMBEDDING_PROVIDER") {
            config.embedding.provider = provider;
        }

        if let Ok(model) = std::env::var("OSINDEX_EMBEDDING_MODEL") {
            config.embedding.model = model;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Build a config from defaults plus an optional config file.
    ///
    /// An explicit path must exist; without one, `./osindex.yaml` is read
    /// only when present.
    pub fn load_from(path: Option<&Path>) -> AppResult<Self> {
        let mut config = Self::default();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Config file does not exist: {:?}",
                        path
                    )));
                }
                config.merge_yaml(path)?;
                config.config_file = Some(path.to_path_buf());
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    config.merge_yaml(&default_path)?;
                    config.config_file = Some(default_path);
                }
            }
        }

        Ok(config)
    }

    /// Merge a YAML config file into this config.
    fn merge_yaml(&mut self, path: &Path) -> AppResult<()> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        if let Some(backend) = file.backend {
            if let Some(endpoint) = backend.endpoint {
                self.endpoint = endpoint;
            }
            if let Some(username) = backend.username {
                self.username = Some(username);
            }
            if let Some(env) = backend.password_env {
                self.password = std::env::var(&env).ok();
            }
            if let Some(timeout) = backend.timeout_secs {
                self.request_timeout_secs = timeout;
            }
        }

        if let Some(dimension) = file.index.and_then(|i| i.dimension) {
            self.dimension = dimension;
        }

        if let Some(embedding) = file.embedding {
            if let Some(provider) = embedding.provider {
                self.embedding.provider = provider;
            }
            if let Some(model) = embedding.model {
                self.embedding.model = model;
            }
            if let Some(endpoint) = embedding.endpoint {
                self.embedding.endpoint = endpoint;
            }
            if let Some(env) = embedding.api_key_env {
                self.embedding.api_key_env = env;
            }
        }

        if let Some(deletion) = file.deletion {
            if let Some(cap) = deletion.search_cap {
                self.deletion.search_cap = cap;
            }
            if let Some(concurrency) = deletion.concurrency {
                self.deletion.concurrency = concurrency;
            }
            if let Some(target) = deletion.target {
                self.deletion.target = target;
            }
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(())
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over the config file and environment.
    pub fn with_overrides(
        mut self,
        endpoint: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(endpoint) = endpoint {
            self.endpoint = endpoint;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Validate configuration values that can be checked locally.
    ///
    /// The embedding API key is checked when the provider is built, so
    /// commands that never embed do not need one.
    pub fn validate(&self) -> AppResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(AppError::Config("Backend endpoint is empty".to_string()));
        }

        if self.dimension == 0 {
            return Err(AppError::Config(
                "Vector dimension must be greater than zero".to_string(),
            ));
        }

        if self.deletion.search_cap == 0 {
            return Err(AppError::Config(
                "Deletion search cap must be greater than zero".to_string(),
            ));
        }

        if self.deletion.concurrency == 0 {
            return Err(AppError::Config(
                "Deletion concurrency must be greater than zero".to_string(),
            ));
        }

        let known_providers = ["openai", "mock"];
        if !known_providers.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                known_providers.join(", ")
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn mock_config() -> AppConfig {
        AppConfig {
            embedding: EmbeddingSettings {
                provider: "mock".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.dimension, 1536);
        assert_eq!(config.deletion.search_cap, 9999);
        assert_eq!(config.deletion.target, DeleteTarget::OwningIndex);
        assert!(!config.verbose);
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(
            Some("http://search:9200".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(config.endpoint, "http://search:9200");
        assert!(config.verbose);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_load_from_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
backend:
  endpoint: https://search.internal:443
  username: admin
  timeoutSecs: 5
index:
  dimension: 768
embedding:
  provider: mock
  model: trigram-v1
deletion:
  searchCap: 500
  concurrency: 2
  target: caller-index
logging:
  level: warn
  color: false
"#
        )
        .unwrap();

        let config = AppConfig::load_from(Some(file.path())).unwrap();
        assert_eq!(config.endpoint, "https://search.internal:443");
        assert_eq!(config.username.as_deref(), Some("admin"));
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.dimension, 768);
        assert_eq!(config.embedding.provider, "mock");
        assert_eq!(config.embedding.model, "trigram-v1");
        assert_eq!(config.deletion.search_cap, 500);
        assert_eq!(config.deletion.concurrency, 2);
        assert_eq!(config.deletion.target, DeleteTarget::CallerIndex);
        assert_eq!(config.log_level.as_deref(), Some("warn"));
        assert!(config.no_color);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "index:\n  dimension: 384").unwrap();

        let config = AppConfig::load_from(Some(file.path())).unwrap();
        assert_eq!(config.dimension, 384);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.deletion, DeletionSettings::default());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result = AppConfig::load_from(Some(Path::new("/nonexistent/osindex.yaml")));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_malformed_yaml_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "index: [unterminated").unwrap();

        let result = AppConfig::load_from(Some(file.path()));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_mock_provider() {
        assert!(mock_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_dimension() {
        let mut config = mock_config();
        config.dimension = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = mock_config();
        config.deletion.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = mock_config();
        config.embedding.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_defaults() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_delete_target_from_str() {
        assert_eq!(
            "caller-index".parse::<DeleteTarget>().unwrap(),
            DeleteTarget::CallerIndex
        );
        assert_eq!(
            "owning-index".parse::<DeleteTarget>().unwrap(),
            DeleteTarget::OwningIndex
        );
        assert!("everywhere".parse::<DeleteTarget>().is_err());
    }
}
