//! In-memory [`PageSource`] used by tests and offline runs.

use docsync_shared::{DocSyncError, PageRef, Result};

use crate::{PageSource, matches_target, push_unique};

/// A fixed set of pages served from memory.
///
/// A page registered without a body behaves like a page whose content
/// could not be retrieved.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pages: Vec<(PageRef, Option<String>)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page with its storage-format body.
    pub fn with_page(mut self, id: &str, title: &str, body: &str) -> Self {
        self.pages.push((page_ref(id, title), Some(body.to_string())));
        self
    }

    /// Register a page whose body fetch fails.
    pub fn with_broken_page(mut self, id: &str, title: &str) -> Self {
        self.pages.push((page_ref(id, title), None));
        self
    }
}

fn page_ref(id: &str, title: &str) -> PageRef {
    PageRef {
        id: id.to_string(),
        title: title.to_string(),
    }
}

impl PageSource for MemorySource {
    async fn fetch_pages(&self, titles: &[String]) -> Result<Vec<PageRef>> {
        let mut found = Vec::new();
        for target in titles {
            for (page, _) in &self.pages {
                if matches_target(&page.title, std::slice::from_ref(target)) {
                    push_unique(&mut found, page.clone());
                }
            }
        }
        Ok(found)
    }

    async fn fetch_body(&self, id: &str) -> Result<String> {
        self.pages
            .iter()
            .find(|(page, _)| page.id == id)
            .and_then(|(_, body)| body.clone())
            .ok_or_else(|| DocSyncError::Network(format!("page {id}: content unavailable")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_preserves_target_order() {
        let source = MemorySource::new()
            .with_page("1", "Runbooks", "<p>r</p>")
            .with_page("2", "API Guidelines", "<p>a</p>");

        let pages = source
            .fetch_pages(&["api".to_string(), "runbook".to_string()])
            .await
            .unwrap();
        let titles: Vec<&str> = pages.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["API Guidelines", "Runbooks"]);
    }

    #[tokio::test]
    async fn broken_page_body_fails() {
        let source = MemorySource::new().with_broken_page("9", "Broken");
        assert!(source.fetch_body("9").await.is_err());
        assert!(source.fetch_body("unknown").await.is_err());
    }
}
