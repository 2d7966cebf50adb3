//! Core domain types for docsync.

use serde::{Deserialize, Serialize};

use crate::error::{DocSyncError, Result};

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// A page located in the documentation service, before its body is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    /// Service-side page identifier.
    pub id: String,
    /// Page title as shown in the service.
    pub title: String,
}

/// A fetched page in its source markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    pub title: String,
    /// Source markup (Confluence storage format).
    pub body: String,
}

/// A page after conversion and cleanup, ready for assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDocument {
    pub title: String,
    /// Cleaned Markdown.
    pub body: String,
}

// ---------------------------------------------------------------------------
// Markers
// ---------------------------------------------------------------------------

/// The two literal lines bounding the managed section in the target file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markers {
    /// Heading line that opens the section.
    pub start: String,
    /// Standalone line that closes the section.
    pub end: String,
}

impl Markers {
    /// Both markers must be non-empty single lines and distinct.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("start_marker", &self.start), ("end_marker", &self.end)] {
            if value.trim().is_empty() {
                return Err(DocSyncError::config(format!("{name} must not be empty")));
            }
            if value.contains('\n') {
                return Err(DocSyncError::config(format!("{name} must be a single line")));
            }
        }
        if self.start.trim() == self.end.trim() {
            return Err(DocSyncError::config(
                "start_marker and end_marker must differ",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TargetDocument
// ---------------------------------------------------------------------------

/// How the existing target file was split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocateMode {
    /// No file existed.
    Fresh,
    /// File exists without a managed section; the section is appended.
    Append,
    /// Both markers found; the section is replaced in place.
    Replace,
    /// Start marker found without a closing marker; the section runs to end-of-file.
    ReplaceToEnd,
}

impl std::fmt::Display for LocateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Fresh => "fresh",
            Self::Append => "append",
            Self::Replace => "replace",
            Self::ReplaceToEnd => "replace-to-end",
        };
        f.write_str(s)
    }
}

/// The on-disk target file split around the managed section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDocument {
    /// Hand-written content before the section (right-trimmed).
    pub prefix: String,
    /// The existing managed block, separator through end marker line.
    pub managed: Option<String>,
    /// Hand-written content after the section (left-trimmed).
    pub suffix: String,
    /// Which branch produced this split.
    pub mode: LocateMode,
}

impl TargetDocument {
    /// Split for a file that does not exist yet.
    pub fn fresh() -> Self {
        Self {
            prefix: String::new(),
            managed: None,
            suffix: String::new(),
            mode: LocateMode::Fresh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> Markers {
        Markers {
            start: "## Synced".into(),
            end: "---".into(),
        }
    }

    #[test]
    fn markers_validate_ok() {
        assert!(markers().validate().is_ok());
    }

    #[test]
    fn markers_reject_empty_and_multiline() {
        let mut m = markers();
        m.start = "   ".into();
        assert!(m.validate().is_err());

        let mut m = markers();
        m.end = "---\n---".into();
        assert!(m.validate().is_err());
    }

    #[test]
    fn locate_mode_display() {
        assert_eq!(LocateMode::ReplaceToEnd.to_string(), "replace-to-end");
        assert_eq!(LocateMode::Append.to_string(), "append");
    }

    #[test]
    fn fresh_target_is_empty() {
        let t = TargetDocument::fresh();
        assert!(t.prefix.is_empty());
        assert!(t.managed.is_none());
        assert!(t.suffix.is_empty());
        assert_eq!(t.mode, LocateMode::Fresh);
    }
}
