//! Byte budget enforcement for the managed section.

use tracing::{info, warn};

use docsync_shared::Markers;

/// Outcome of [`enforce`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enforced {
    /// The (possibly truncated) section text.
    pub content: String,
    /// Whether truncation happened.
    pub truncated: bool,
    /// Size of the input in bytes.
    pub original_bytes: usize,
}

/// Notice appended to a truncated section.
///
/// It ends with the closing line so a truncated section is still bounded.
pub fn truncation_notice(space_ref: &str, end_marker: &str) -> String {
    format!(
        "\n\n***\n\n**Note**: Content truncated due to size limit. \
         See full documentation: {space_ref}\n\n{end_marker}\n"
    )
}

/// Cap `content` at `max_bytes`, appending the truncation notice when cut.
///
/// The section head (everything through the start-marker line) is never cut,
/// so a truncated section is still found by its heading on the next run.
/// The result never exceeds `max_bytes` unless head plus notice alone is
/// larger than the budget, in which case exactly head plus notice is
/// returned. A multi-byte character straddling the cut is dropped.
pub fn enforce(content: &str, max_bytes: usize, space_ref: &str, markers: &Markers) -> Enforced {
    let original_bytes = content.len();

    if original_bytes <= max_bytes {
        info!(original_bytes, max_bytes, "content within size limit");
        return Enforced {
            content: content.to_string(),
            truncated: false,
            original_bytes,
        };
    }

    let notice = truncation_notice(space_ref, &markers.end);
    let head_bytes = section_head_len(content, &markers.start);
    if head_bytes + notice.len() > max_bytes {
        warn!(
            head_bytes,
            notice_bytes = notice.len(),
            max_bytes,
            "budget smaller than section head plus truncation notice"
        );
    }

    let room = max_bytes.saturating_sub(notice.len()).max(head_bytes);
    let body = utf8_prefix(content, room);
    let body = drop_dangling_marker(body, &markers.end);

    let mut truncated = String::with_capacity(body.len() + notice.len());
    truncated.push_str(body);
    truncated.push_str(&notice);

    warn!(
        original_bytes,
        final_bytes = truncated.len(),
        max_bytes,
        "content exceeded size limit and was truncated"
    );

    Enforced {
        content: truncated,
        truncated: true,
        original_bytes,
    }
}

/// Byte length of the leading part of `content` up to and including the first
/// start-marker line, or 0 when there is no such line.
fn section_head_len(content: &str, start_marker: &str) -> usize {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        offset += line.len();
        if line.trim() == start_marker.trim() {
            return offset;
        }
    }
    0
}

/// Longest prefix of at most `max` bytes that is valid UTF-8.
fn utf8_prefix(content: &str, max: usize) -> &str {
    let bytes = &content.as_bytes()[..max.min(content.len())];
    match std::str::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => &content[..e.valid_up_to()],
    }
}

/// Trim trailing whitespace and any trailing closing-marker line left by the cut.
fn drop_dangling_marker<'a>(body: &'a str, end_marker: &str) -> &'a str {
    let mut body = body.trim_end();
    loop {
        let last_line_start = body.rfind('\n').map_or(0, |i| i + 1);
        if body[last_line_start..].trim() != end_marker.trim() {
            return body;
        }
        body = body[..last_line_start].trim_end();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
