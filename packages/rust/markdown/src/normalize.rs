//! Content normalizer for converted page bodies.
//!
//! Strips platform leftovers that have no rendering in the instructions file
//! and shapes the text so it can sit inside the managed section without
//! being mistaken for a section boundary. Every pass is lenient: an
//! unterminated token is left in place.

use std::sync::LazyLock;

use regex::Regex;

/// Thematic break equivalent to `---` that can never close the managed section.
const NEUTRAL_RULE: &str = "***";

/// Clean a single document body.
pub fn normalize(raw: &str) -> String {
    let mut result = normalize_line_endings(raw);

    result = strip_front_matter(&result);
    result = strip_macros(&result);
    result = strip_comments(&result);
    result = neutralize_rules(&result);
    result = collapse_blank_lines(&result);

    result.trim().to_string()
}

// ---------------------------------------------------------------------------
// Pass 0: Line endings
// ---------------------------------------------------------------------------

fn normalize_line_endings(md: &str) -> String {
    md.replace("\r\n", "\n")
}

// ---------------------------------------------------------------------------
// Pass 1: Front matter
// ---------------------------------------------------------------------------

/// Remove a leading `---` ... `---` metadata block.
fn strip_front_matter(md: &str) -> String {
    static FRONT_MATTER_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)\A\s*---[ \t]*\n(?:.*?\n)?---[ \t]*(?:\n|\z)").expect("valid regex")
    });

    FRONT_MATTER_RE.replace(md, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 2: Inline macros
// ---------------------------------------------------------------------------

/// Remove `{...}` macro tokens; the first closing brace on the same line ends a token.
fn strip_macros(md: &str) -> String {
    static MACRO_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\{.*?\}").expect("valid regex"));

    MACRO_RE.replace_all(md, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 3: HTML comments
// ---------------------------------------------------------------------------

fn strip_comments(md: &str) -> String {
    static COMMENT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

    COMMENT_RE.replace_all(md, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 4: Standalone `---` lines
// ---------------------------------------------------------------------------

/// Rewrite bare `---` lines so the body never contains the section's closing line.
///
/// A `---` directly under a paragraph line is a setext H2 underline and
/// becomes an ATX heading; any other `---` line becomes `***`. Lines inside
/// fenced code blocks are left as they are.
fn neutralize_rules(md: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut in_code_block = false;

    for line in md.split('\n') {
        if is_fence(line) {
            in_code_block = !in_code_block;
            lines.push(line.to_string());
            continue;
        }

        if in_code_block || line.trim() != "---" {
            lines.push(line.to_string());
            continue;
        }

        match lines.last_mut() {
            Some(prev) if is_setext_candidate(prev) => {
                *prev = format!("## {}", prev.trim());
            }
            _ => lines.push(NEUTRAL_RULE.to_string()),
        }
    }

    lines.join("\n")
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

/// A paragraph line that a following `---` would turn into a heading.
///
/// List items and block quotes are excluded: under them `---` is a thematic break.
fn is_setext_candidate(line: &str) -> bool {
    static BLOCK_MARKER_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^(?:[-*+]|\d{1,9}[.)])(?:\s|$)").expect("valid regex"));

    let trimmed = line.trim();
    !trimmed.is_empty()
        && !trimmed.starts_with('#')
        && !trimmed.starts_with('|')
        && !trimmed.starts_with('>')
        && !is_fence(trimmed)
        && !BLOCK_MARKER_RE.is_match(trimmed)
        && trimmed != NEUTRAL_RULE
}

// ---------------------------------------------------------------------------
// Pass 5: Blank lines
// ---------------------------------------------------------------------------

/// Collapse runs of 3+ newlines into exactly 2.
fn collapse_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n").to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
