//! Confluence Cloud REST client.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};
use url::Url;

use docsync_shared::{Credentials, DocSyncError, PageRef, Result, SyncConfig};

use crate::api::{ContentResponse, SearchResponse};
use crate::{PageSource, matches_target, push_unique};

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("docsync/", env!("CARGO_PKG_VERSION"));

/// Maximum number of search hits requested per target title.
const SEARCH_LIMIT: &str = "100";

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 3;

/// Authenticated client scoped to a single space.
#[derive(Debug, Clone)]
pub struct ConfluenceClient {
    client: Client,
    base_url: String,
    space_key: String,
    credentials: Credentials,
}

impl ConfluenceClient {
    /// Build a client for `base_url` / `space_key`.
    pub fn new(
        base_url: &str,
        space_key: &str,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| DocSyncError::config(format!("invalid base_url '{base_url}': {e}")))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()
            .map_err(|e| DocSyncError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            space_key: space_key.to_string(),
            credentials,
        })
    }

    /// Build a client from the runtime sync configuration.
    pub fn from_config(config: &SyncConfig, credentials: Credentials) -> Result<Self> {
        Self::new(
            &config.base_url,
            &config.space_key,
            credentials,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Verify the credentials and that the space exists.
    #[instrument(skip(self), fields(space = %self.space_key))]
    pub async fn check_space(&self) -> Result<()> {
        let url = self.api_url(&format!("space/{}", self.space_key));
        let response = self
            .authed(self.client.get(&url))
            .send()
            .await
            .map_err(|e| DocSyncError::Network(format!("{url}: {e}")))?;

        match response.status() {
            status if status.is_success() => {
                info!(space = %self.space_key, "connected to space");
                Ok(())
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(DocSyncError::config(format!(
                "credentials rejected by {} (HTTP {})",
                self.base_url,
                response.status()
            ))),
            StatusCode::NOT_FOUND => Err(DocSyncError::config(format!(
                "space '{}' not found at {}",
                self.space_key, self.base_url
            ))),
            status => Err(DocSyncError::Network(format!("{url}: HTTP {status}"))),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/wiki/rest/api/{path}", self.base_url)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.credentials.email, Some(&self.credentials.api_token))
    }

    /// Send a request and decode a JSON response body.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, url: &str) -> Result<T> {
        let response = self
            .authed(request)
            .send()
            .await
            .map_err(|e| DocSyncError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DocSyncError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| DocSyncError::parse(format!("{url}: unexpected response: {e}")))
    }

    /// CQL query for pages in this space whose title contains `title`.
    fn title_query(&self, title: &str) -> String {
        format!(
            "space = \"{}\" AND type = page AND title ~ \"{}\"",
            escape_cql(&self.space_key),
            escape_cql(title)
        )
    }
}

impl PageSource for ConfluenceClient {
    #[instrument(skip_all, fields(space = %self.space_key, targets = titles.len()))]
    async fn fetch_pages(&self, titles: &[String]) -> Result<Vec<PageRef>> {
        let url = self.api_url("content/search");
        let mut pages = Vec::new();

        for title in titles.iter().filter(|t| !t.trim().is_empty()) {
            let cql = self.title_query(title.trim());
            let request = self
                .client
                .get(&url)
                .query(&[("cql", cql.as_str()), ("limit", SEARCH_LIMIT)]);

            let found: SearchResponse = self.send_json(request, &url).await?;
            debug!(%title, hits = found.results.len(), "title search complete");

            // CQL `~` is a fuzzy text match; keep only real substring hits
            for hit in found.results {
                if matches_target(&hit.title, std::slice::from_ref(title)) {
                    push_unique(
                        &mut pages,
                        PageRef {
                            id: hit.id,
                            title: hit.title,
                        },
                    );
                }
            }
        }

        info!(found = pages.len(), "page lookup complete");
        Ok(pages)
    }

    #[instrument(skip(self))]
    async fn fetch_body(&self, id: &str) -> Result<String> {
        let url = self.api_url(&format!("content/{id}"));
        let request = self.client.get(&url).query(&[("expand", "body.storage")]);

        let content: ContentResponse = self.send_json(request, &url).await?;
        let title = content.title.clone();

        let body = content
            .storage_value()
            .ok_or_else(|| DocSyncError::parse(format!("page {id} has no storage body")))?;

        debug!(%title, len = body.len(), "fetched page body");
        Ok(body)
    }
}

/// Escape a value for use inside a double-quoted CQL string.
fn escape_cql(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
