//! Locating the managed section inside an existing target file.
//!
//! Markers are matched as whole lines (surrounding whitespace ignored), so
//! marker text quoted inside hand-written prose is never a boundary.

use tracing::debug;

use docsync_shared::{LocateMode, TargetDocument};

use crate::section::SECTION_SEPARATOR;

/// A line of the input with its byte span (newline included in `end`).
struct Line<'a> {
    start: usize,
    end: usize,
    text: &'a str,
}

fn split_lines(content: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut offset = 0;

    for raw in content.split_inclusive('\n') {
        lines.push(Line {
            start: offset,
            end: offset + raw.len(),
            text: raw.trim_end_matches(['\n', '\r']),
        });
        offset += raw.len();
    }

    lines
}

fn is_line(text: &str, marker: &str) -> bool {
    text.trim() == marker.trim()
}

/// Index of the separator line that belongs to the section opened at `heading`.
///
/// The separator sits directly above the heading, optionally with one blank
/// line in between.
fn separator_above(lines: &[Line<'_>], heading: usize) -> Option<usize> {
    let mut idx = heading;
    if idx > 0 && lines[idx - 1].text.trim().is_empty() {
        idx -= 1;
    }
    (idx > 0 && is_line(lines[idx - 1].text, SECTION_SEPARATOR)).then(|| idx - 1)
}

/// Split `existing` into prefix, managed block, and suffix.
///
/// - `None` (no file) → fresh mode, everything empty.
/// - No start-marker line → append mode, the whole file (right-trimmed) is the prefix.
/// - Start-marker line found → the first occurrence preceded by a separator
///   line wins, otherwise the first occurrence. The suffix starts after the
///   first end-marker line below the heading; without one the section runs
///   to end-of-file and the suffix is empty.
pub fn locate(existing: Option<&str>, start_marker: &str, end_marker: &str) -> TargetDocument {
    let Some(content) = existing else {
        debug!("no existing file");
        return TargetDocument::fresh();
    };

    let lines = split_lines(content);
    let headings: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| is_line(line.text, start_marker))
        .map(|(i, _)| i)
        .collect();

    let Some(&first) = headings.first() else {
        debug!("no managed section found, appending");
        return TargetDocument {
            prefix: content.trim_end().to_string(),
            managed: None,
            suffix: String::new(),
            mode: LocateMode::Append,
        };
    };

    let (heading, block_first_line) = headings
        .iter()
        .find_map(|&h| separator_above(&lines, h).map(|sep| (h, sep)))
        .unwrap_or((first, first));

    let block_start = lines[block_first_line].start;
    let prefix = content[..block_start].trim_end().to_string();

    let closing = lines
        .iter()
        .skip(heading + 1)
        .find(|line| is_line(line.text, end_marker));

    match closing {
        Some(line) => {
            debug!(block_start, block_end = line.end, "found managed section");
            TargetDocument {
                prefix,
                managed: Some(content[block_start..line.end].to_string()),
                suffix: content[line.end..].trim_start().to_string(),
                mode: LocateMode::Replace,
            }
        }
        None => {
            debug!(block_start, "managed section has no closing line, replacing to end of file");
            TargetDocument {
                prefix,
                managed: Some(content[block_start..].to_string()),
                suffix: String::new(),
                mode: LocateMode::ReplaceToEnd,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
