//! Storage-format to Markdown conversion and content normalization.
//!
//! Confluence pages arrive as storage-format XHTML. [`convert_storage`] turns
//! that into Markdown using the `htmd` crate (with a table pre-pass via
//! `scraper`), and [`normalize`] cleans the result so it can be embedded in
//! the managed section of the instructions file.

mod cleanup;
mod normalize;

use std::sync::LazyLock;

use regex::{Captures, Regex};
use scraper::Html;
use tracing::{debug, instrument};

use docsync_shared::{DocSyncError, NormalizedDocument, RawDocument, Result};

pub use normalize::normalize;

/// Tags whose content never belongs in the instructions file.
const SKIP_TAGS: [&str; 5] = ["script", "style", "iframe", "noscript", "svg"];

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Convert Confluence storage-format markup to Markdown.
///
/// 1. Expands `code` macros (CDATA bodies) into `<pre><code>` blocks
/// 2. Pre-processes HTML tables into markdown tables
/// 3. Converts HTML → Markdown via `htmd`
/// 4. Runs the cleanup pipeline
#[instrument(skip_all, fields(input_len = storage.len()))]
pub fn convert_storage(storage: &str) -> Result<String> {
    let html = expand_code_macros(storage);
    let html = preprocess_tables(&html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIP_TAGS.to_vec())
        .build();

    let raw_markdown = converter
        .convert(&html)
        .map_err(|e| DocSyncError::Conversion(format!("htmd conversion failed: {e}")))?;

    debug!(raw_len = raw_markdown.len(), "htmd conversion complete");

    Ok(cleanup::run_pipeline(&raw_markdown))
}

/// Convert and normalize a fetched page in one step.
pub fn prepare_document(raw: &RawDocument) -> Result<NormalizedDocument> {
    let markdown = convert_storage(&raw.body)?;
    Ok(NormalizedDocument {
        title: raw.title.trim().to_string(),
        body: normalize(&markdown),
    })
}

// ---------------------------------------------------------------------------
// Code macro expansion
// ---------------------------------------------------------------------------

/// Rewrite `<ac:structured-macro ac:name="code">` blocks into `<pre><code>`.
///
/// The HTML parser drops CDATA sections, so the code body has to be lifted
/// out before conversion.
fn expand_code_macros(storage: &str) -> String {
    static CODE_MACRO_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r#"(?s)<ac:structured-macro[^>]*ac:name="code"[^>]*>(.*?)</ac:structured-macro>"#,
        )
        .expect("valid regex")
    });
    static LANGUAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"<ac:parameter[^>]*ac:name="language"[^>]*>\s*([\w+#-]+)\s*</ac:parameter>"#)
            .expect("valid regex")
    });
    static CDATA_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("valid regex"));

    CODE_MACRO_RE
        .replace_all(storage, |caps: &Captures| {
            let inner = &caps[1];
            let code = CDATA_RE
                .captures(inner)
                .map(|c| escape_html(&c[1]))
                .unwrap_or_default();

            match LANGUAGE_RE.captures(inner) {
                Some(lang) => format!(
                    "<pre><code class=\"language-{}\">{code}</code></pre>",
                    lang[1].to_lowercase()
                ),
                None => format!("<pre><code>{code}</code></pre>"),
            }
        })
        .to_string()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// ---------------------------------------------------------------------------
// Table pre-processing
// ---------------------------------------------------------------------------

/// Convert HTML `<table>` elements to markdown table syntax before htmd conversion.
///
/// `htmd` 0.1 doesn't support table conversion, so we handle it manually.
fn preprocess_tables(html: &str) -> String {
    let doc = Html::parse_fragment(html);

    let Ok(table_sel) = scraper::Selector::parse("table") else {
        return html.to_string();
    };

    if doc.select(&table_sel).next().is_none() {
        return html.to_string();
    }

    let mut result = html.to_string();

    for table_el in doc.select(&table_sel) {
        let table_html = table_el.html();
        let md_table = html_table_to_markdown(&table_el);
        // Serialized HTML may differ from the input; unmatched tables fall through to htmd
        result = result.replacen(&table_html, &md_table, 1);
    }

    result
}

/// Convert a single HTML table element to a markdown table string.
fn html_table_to_markdown(table: &scraper::ElementRef) -> String {
    let (Ok(tr_sel), Ok(th_sel), Ok(td_sel)) = (
        scraper::Selector::parse("tr"),
        scraper::Selector::parse("th"),
        scraper::Selector::parse("td"),
    ) else {
        return String::new();
    };

    let cell_text = |cell: scraper::ElementRef| {
        cell.text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .replace('|', "\\|")
    };

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut has_header = false;

    for tr in table.select(&tr_sel) {
        let ths: Vec<String> = tr.select(&th_sel).map(cell_text).collect();

        if !ths.is_empty() {
            // Confluence puts header cells in the first row, sometimes mixed with <td>
            let mut row = ths;
            row.extend(tr.select(&td_sel).map(cell_text));
            if rows.is_empty() {
                has_header = true;
            }
            rows.push(row);
            continue;
        }

        let tds: Vec<String> = tr.select(&td_sel).map(cell_text).collect();

        if !tds.is_empty() {
            rows.push(tds);
        }
    }

    let col_count = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    if col_count == 0 {
        return String::new();
    }

    for row in &mut rows {
        while row.len() < col_count {
            row.push(String::new());
        }
    }

    let mut md = String::from("\n\n");

    // Header row (first row doubles as header when the table has none)
    let header = &rows[0];
    md.push_str("| ");
    md.push_str(&header.join(" | "));
    md.push_str(" |\n");

    md.push_str("| ");
    md.push_str(&vec!["---"; col_count].join(" | "));
    md.push_str(" |\n");

    let data_start = if has_header { 1 } else { 0 };
    for row in &rows[data_start..] {
        md.push_str("| ");
        md.push_str(&row.join(" | "));
        md.push_str(" |\n");
    }

    md.push('\n');
    md
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
