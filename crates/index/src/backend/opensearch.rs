//! OpenSearch REST backend.
//!
//! Talks JSON over HTTP with `reqwest`. Construction does no I/O; call
//! [`OpenSearchBackend::verify`] to probe the cluster before first use.

use super::SearchBackend;
use crate::types::{BulkPayload, BulkResponse, IndexSummary, IndexTarget, SearchResponse};
use async_trait::async_trait;
use osindex_core::{AppConfig, AppError, AppResult};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Index probed by `verify`. Any answer (present or absent) proves that the
/// endpoint is reachable and the credentials are accepted.
const PROBE_INDEX: &str = "test";

const NDJSON: &str = "application/x-ndjson";

/// Search backend speaking the OpenSearch REST API.
#[derive(Clone)]
pub struct OpenSearchBackend {
    client: Client,
    base_url: Url,
    username: Option<String>,
    password: Option<String>,
}

impl fmt::Debug for OpenSearchBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenSearchBackend")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl OpenSearchBackend {
    /// Build the HTTP client from configuration. No request is sent.
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let mut backend = Self::build(&config.endpoint, config.request_timeout_secs)?;
        backend.username = config.username.clone();
        backend.password = config.password.clone();
        Ok(backend)
    }

    /// Backend without credentials against `base_url`.
    pub fn with_base_url(base_url: &str) -> AppResult<Self> {
        Self::build(base_url, 30)
    }

    fn build(endpoint: &str, timeout_secs: u64) -> AppResult<Self> {
        let base_url = Url::parse(endpoint).map_err(|e| {
            AppError::Config(format!("Invalid backend endpoint '{}': {}", endpoint, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "Backend endpoint '{}' cannot carry a path",
                endpoint
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            username: None,
            password: None,
        })
    }

    /// Probe the cluster so connection and auth problems surface early.
    #[instrument(skip(self), fields(endpoint = %self.base_url))]
    pub async fn verify(&self) -> AppResult<()> {
        debug!("Verifying connection to search backend");
        self.ping().await?;
        info!("Connected to search backend at {}", self.base_url);
        Ok(())
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.username {
            Some(user) => builder.basic_auth(user, self.password.as_deref()),
            None => builder,
        }
    }

    /// Send and turn non-2xx answers into backend errors carrying the body.
    async fn send(&self, builder: RequestBuilder) -> AppResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| AppError::transport(format!("Request to search backend failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        Err(AppError::backend(
            status.as_u16(),
            body_or_read_error(response.text().await),
        ))
    }

    async fn read_json(response: Response) -> AppResult<Value> {
        response.json::<Value>().await.map_err(|e| {
            AppError::transport(format!("Failed to read search backend response: {}", e))
        })
    }
}

/// Error body text, or why it could not be read.
fn body_or_read_error(body: reqwest::Result<String>) -> String {
    body.unwrap_or_else(|e| format!("<failed to read error body: {}>", e))
}

#[async_trait]
impl SearchBackend for OpenSearchBackend {
    fn backend_name(&self) -> &str {
        "opensearch"
    }

    async fn ping(&self) -> AppResult<()> {
        self.index_exists(PROBE_INDEX).await.map(|_| ())
    }

    #[instrument(skip(self))]
    async fn index_exists(&self, name: &str) -> AppResult<bool> {
        let url = self.url(&[name]);
        let response = self
            .request(Method::HEAD, url)
            .send()
            .await
            .map_err(|e| AppError::transport(format!("Request to search backend failed: {}", e)))?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(AppError::backend(
                status.as_u16(),
                format!("Unexpected status checking index '{}'", name),
            )),
        }
    }

    #[instrument(skip(self, body))]
    async fn create_index(&self, name: &str, body: &Value) -> AppResult<()> {
        let url = self.url(&[name]);
        self.send(self.request(Method::PUT, url).json(body)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_index(&self, name: &str) -> AppResult<()> {
        let url = self.url(&[name]);
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_indices(&self) -> AppResult<Vec<IndexSummary>> {
        let mut url = self.url(&["_cat", "indices"]);
        url.query_pairs_mut().append_pair("format", "json");
        let response = self.send(self.request(Method::GET, url)).await?;
        let body = Self::read_json(response).await?;
        Ok(serde_json::from_value(body)?)
    }

    #[instrument(skip(self, payload), fields(operations = payload.len()))]
    async fn bulk(&self, payload: &BulkPayload) -> AppResult<BulkResponse> {
        // `_bulk` rejects an empty body
        if payload.is_empty() {
            return Ok(BulkResponse::default());
        }

        let url = self.url(&["_bulk"]);
        let body = payload.to_ndjson()?;
        let response = self
            .send(
                self.request(Method::POST, url)
                    .header(CONTENT_TYPE, NDJSON)
                    .body(body),
            )
            .await?;
        let body = Self::read_json(response).await?;
        Ok(serde_json::from_value(body)?)
    }

    #[instrument(skip(self, body), fields(target = %target))]
    async fn search(&self, target: &IndexTarget, body: &Value) -> AppResult<SearchResponse> {
        let joined = target.joined();
        let url = self.url(&[joined.as_str(), "_search"]);
        let response = self.send(self.request(Method::POST, url).json(body)).await?;
        let body = Self::read_json(response).await?;
        SearchResponse::from_value(&body)
    }

    #[instrument(skip(self))]
    async fn delete_by_id(&self, index: &str, id: &str) -> AppResult<()> {
        let url = self.url(&[index, "_doc", id]);
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(target = %target))]
    async fn refresh(&self, target: &IndexTarget) -> AppResult<()> {
        let joined = target.joined();
        let url = self.url(&[joined.as_str(), "_refresh"]);
        self.send(self.request(Method::POST, url)).await?;
        Ok(())
    }
}
