//! Response shapes of the Confluence REST API (only the fields we read).

use serde::Deserialize;

/// `GET /wiki/rest/api/content/search`
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub results: Vec<ContentSummary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentSummary {
    pub id: String,
    pub title: String,
}

/// `GET /wiki/rest/api/content/{id}?expand=body.storage`
#[derive(Debug, Deserialize)]
pub(crate) struct ContentResponse {
    pub title: String,
    #[serde(default)]
    pub body: Option<ContentBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentBody {
    #[serde(default)]
    pub storage: Option<StorageValue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StorageValue {
    pub value: String,
}

impl ContentResponse {
    /// The storage-format markup, if the body was expanded.
    pub fn storage_value(self) -> Option<String> {
        self.body.and_then(|b| b.storage).map(|s| s.value)
    }
}
