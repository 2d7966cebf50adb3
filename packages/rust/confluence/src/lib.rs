//! Page retrieval from the documentation service.
//!
//! The sync pipeline only depends on the [`PageSource`] capability: look up
//! pages by title, then fetch each body. [`ConfluenceClient`] implements it
//! against the Confluence Cloud REST API; [`MemorySource`] is an in-memory
//! implementation for tests and offline runs.

mod api;
mod client;
mod memory;

use std::future::Future;

use docsync_shared::{PageRef, Result};

pub use client::ConfluenceClient;
pub use memory::MemorySource;

/// Capability interface for fetching documentation pages.
pub trait PageSource {
    /// Find pages whose titles match any of `titles`, in match order, without duplicates.
    fn fetch_pages(&self, titles: &[String]) -> impl Future<Output = Result<Vec<PageRef>>> + Send;

    /// Fetch the raw storage-format markup of a page.
    fn fetch_body(&self, id: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Case-insensitive substring match of a page title against any target title.
pub fn matches_target(page_title: &str, targets: &[String]) -> bool {
    let page = page_title.to_lowercase();
    targets
        .iter()
        .map(|t| t.trim().to_lowercase())
        .any(|t| !t.is_empty() && page.contains(&t))
}

/// Append `page` unless a page with the same id is already present.
pub(crate) fn push_unique(pages: &mut Vec<PageRef>, page: PageRef) {
    if !pages.iter().any(|p| p.id == page.id) {
        pages.push(page);
    }
}
