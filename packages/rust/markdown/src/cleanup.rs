//! Post-conversion cleanup pipeline for Markdown produced by `htmd`.
//!
//! Each cleanup pass is a function `&str -> String` applied in sequence.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full cleanup pipeline on raw converter output.
pub(crate) fn run_pipeline(md: &str) -> String {
    let mut result = md.to_string();

    result = strip_leftover_html(&result);
    result = normalize_whitespace(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Strip leftover HTML and Confluence tags
// ---------------------------------------------------------------------------

/// Remove stray layout and `ac:`/`ri:` tags that survived the conversion.
///
/// Inner text is preserved and fenced code blocks are left untouched.
fn strip_leftover_html(md: &str) -> String {
    let mut result = String::new();
    let mut in_code_block = false;

    for line in md.lines() {
        if line.trim_start().starts_with("```") {
            in_code_block = !in_code_block;
            result.push_str(line);
            result.push('\n');
            continue;
        }

        if in_code_block {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        result.push_str(&strip_html_tags(line));
        result.push('\n');
    }

    if result.ends_with('\n') {
        result.pop();
    }

    result
}

/// Strip known wrapper tags from a single line, preserving inner text.
fn strip_html_tags(line: &str) -> String {
    static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"</?(?:div|span|section|article|aside|header|footer|figure|figcaption|details|summary|ac:[\w-]+|ri:[\w-]+)(?:\s[^>]*)?/?>",
        )
        .expect("valid regex")
    });

    HTML_TAG_RE.replace_all(line, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 2: Normalize whitespace
// ---------------------------------------------------------------------------

/// Trim trailing whitespace on every line.
fn normalize_whitespace(md: &str) -> String {
    md.lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
