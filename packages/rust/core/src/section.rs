//! Managed section assembly.
//!
//! The managed section is regenerated from scratch on every run and has a
//! fixed shape:
//!
//! ```text
//! ---
//!
//! ## Platform Documentation (Auto-synced from Confluence)
//!
//! **Last synced**: 2024-05-01 12:00:00 UTC
//!
//! <intro sentence>
//!
//! ### <page title>
//!
//! <page body>
//!
//! **Full Platform Documentation**: <space url>
//!
//! ---
//! ```

use chrono::{DateTime, Utc};

use docsync_shared::{Markers, NormalizedDocument, SyncConfig};

/// Separator line emitted directly above the section heading.
pub const SECTION_SEPARATOR: &str = "---";

/// Label of the timestamp line.
pub const LAST_SYNCED_LABEL: &str = "**Last synced**";

/// Label of the footer link line.
pub const FOOTER_LABEL: &str = "**Full Platform Documentation**";

/// The fixed parts of the section that come from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionLayout {
    /// Heading line (start marker) and closing line (end marker).
    pub markers: Markers,
    /// Sentence placed under the heading.
    pub intro: String,
}

impl From<&SyncConfig> for SectionLayout {
    fn from(config: &SyncConfig) -> Self {
        Self {
            markers: config.markers.clone(),
            intro: config.intro.clone(),
        }
    }
}

/// A fully specified managed section, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedSection {
    pub header: String,
    pub generated_at: String,
    pub intro: String,
    pub documents: Vec<NormalizedDocument>,
    pub footer_link: String,
    pub closing: String,
}

impl ManagedSection {
    /// Render the section; the text always ends with the closing line and a newline.
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = vec![
            SECTION_SEPARATOR.to_string(),
            String::new(),
            self.header.clone(),
            String::new(),
            format!("{LAST_SYNCED_LABEL}: {}", self.generated_at),
            String::new(),
            self.intro.clone(),
            String::new(),
        ];

        let markers = Markers {
            start: self.header.clone(),
            end: self.closing.clone(),
        };

        for doc in &self.documents {
            lines.push(format!("### {}", doc.title));
            lines.push(String::new());
            lines.push(guard_marker_lines(&doc.body, &markers));
            lines.push(String::new());
        }

        lines.push(format!("{FOOTER_LABEL}: {}", self.footer_link));
        lines.push(String::new());
        lines.push(self.closing.clone());
        lines.push(String::new());

        lines.join("\n")
    }
}

/// Assemble the managed section text for `docs` in the order given.
pub fn assemble(
    layout: &SectionLayout,
    docs: &[NormalizedDocument],
    space_ref: &str,
    synced_at: &str,
) -> String {
    ManagedSection {
        header: layout.markers.start.clone(),
        generated_at: synced_at.to_string(),
        intro: layout.intro.clone(),
        documents: docs.to_vec(),
        footer_link: space_ref.to_string(),
        closing: layout.markers.end.clone(),
    }
    .render()
}

/// Timestamp format used on the "Last synced" line.
pub fn format_synced_at(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Escape body lines that would read as a section boundary.
///
/// Applies inside fenced code blocks too, since boundary lookup does not
/// track fences.
fn guard_marker_lines(body: &str, markers: &Markers) -> String {
    let start = markers.start.trim();
    let end = markers.end.trim();

    body.split('\n')
        .map(|line| {
            let trimmed = line.trim();
            if trimmed == start || trimmed == end {
                format!("\\{trimmed}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
