//! Recombining the target file and persisting it.

use std::path::Path;

use tracing::{debug, instrument};

use docsync_shared::{DocSyncError, Result};

/// Join `prefix`, `section`, and `suffix` with one blank line between non-empty parts.
///
/// Trailing whitespace of a part is dropped before the separator; the final
/// part is kept verbatim.
pub fn merge(prefix: &str, section: &str, suffix: &str) -> String {
    let parts: Vec<&str> = [prefix, section, suffix]
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .collect();

    let mut merged = String::with_capacity(prefix.len() + section.len() + suffix.len() + 4);
    for (i, part) in parts.iter().enumerate() {
        if i + 1 < parts.len() {
            merged.push_str(part.trim_end());
            merged.push_str("\n\n");
        } else {
            merged.push_str(part);
        }
    }

    merged
}

/// Write `content` to `path` via a sibling temp file and an atomic rename.
///
/// The parent directory is created first if needed.
#[instrument(skip(content), fields(path = %path.display(), bytes = content.len()))]
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DocSyncError::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| DocSyncError::validation(format!("{} is not a file path", path.display())))?;
    let temp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    std::fs::write(&temp, content).map_err(|e| DocSyncError::io(&temp, e))?;

    if let Err(e) = std::fs::rename(&temp, path) {
        let _ = std::fs::remove_file(&temp);
        return Err(DocSyncError::io(path, e));
    }

    debug!("wrote file");
    Ok(())
}

/// Merge the three parts and write the result as the complete new file content.
pub fn merge_and_write(prefix: &str, section: &str, suffix: &str, path: &Path) -> Result<()> {
    write_atomic(path, &merge(prefix, section, suffix))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
