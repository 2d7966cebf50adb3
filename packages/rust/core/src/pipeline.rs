//! End-to-end `sync` pipeline: lookup → fetch → convert → assemble → budget → splice → write.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use docsync_confluence::PageSource;
use docsync_markdown::prepare_document;
use docsync_shared::{
    DocSyncError, LocateMode, NormalizedDocument, RawDocument, Result, SyncConfig,
};

use crate::boundary::locate;
use crate::budget::enforce;
use crate::merge::{merge, write_atomic};
use crate::section::{SectionLayout, assemble, format_synced_at};

// ---------------------------------------------------------------------------
// Options, results, progress
// ---------------------------------------------------------------------------

/// Per-run options that are not part of the persistent configuration.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Timestamp written on the "Last synced" line. Fix it for reproducible output.
    pub synced_at: DateTime<Utc>,
    /// Compute the merged file without writing it.
    pub dry_run: bool,
}

impl SyncOptions {
    pub fn now() -> Self {
        Self {
            synced_at: Utc::now(),
            dry_run: false,
        }
    }
}

/// A page that could not be exported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub title: String,
    pub reason: String,
}

/// Pages successfully exported plus the ones that failed.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    /// Number of pages matched by the title lookup.
    pub pages_found: usize,
    /// Converted and normalized pages, in lookup order.
    pub documents: Vec<NormalizedDocument>,
    pub failures: Vec<PageFailure>,
}

/// The managed section after budget enforcement.
#[derive(Debug, Clone)]
pub struct BuiltSection {
    pub content: String,
    pub assembled_bytes: usize,
    pub truncated: bool,
}

/// Outcome of splicing the section into the target file.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    /// How the existing file was split.
    pub mode: LocateMode,
    /// Whether the file content differs from what was on disk.
    pub changed: bool,
    /// Whether the file was written.
    pub written: bool,
    /// The complete new file content.
    pub merged: String,
}

/// Result of a full sync run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub output_path: PathBuf,
    pub pages_found: usize,
    pub pages_exported: usize,
    pub failures: Vec<PageFailure>,
    pub section_bytes: usize,
    pub truncated: bool,
    pub mode: LocateMode,
    pub changed: bool,
    pub written: bool,
    /// The complete new file content (useful for dry runs).
    pub merged: String,
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called for each page matched by the lookup.
    fn page_found(&self, title: &str);
    /// Called when a page is fetched and converted.
    fn page_exported(&self, title: &str, current: usize, total: usize);
    /// Called when a page could not be exported.
    fn page_failed(&self, failure: &PageFailure);
    /// Called when the pipeline completes.
    fn done(&self, report: &SyncReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_found(&self, _title: &str) {}
    fn page_exported(&self, _title: &str, _current: usize, _total: usize) {}
    fn page_failed(&self, _failure: &PageFailure) {}
    fn done(&self, _report: &SyncReport) {}
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Look up the target pages and export each one.
///
/// A page whose body cannot be fetched, is empty, or fails conversion is
/// recorded as a failure and skipped. Finding no pages, or exporting none,
/// aborts the run.
#[instrument(skip_all, fields(space = %config.space_key))]
pub async fn export_pages<S: PageSource>(
    source: &S,
    config: &SyncConfig,
    progress: &dyn ProgressReporter,
) -> Result<ExportOutcome> {
    progress.phase("Searching for pages");
    let pages = source.fetch_pages(&config.target_pages).await?;

    if pages.is_empty() {
        return Err(DocSyncError::NoPages {
            space: config.space_key.clone(),
            titles: config.target_pages.clone(),
        });
    }

    for page in &pages {
        progress.page_found(&page.title);
    }
    info!(found = pages.len(), "selected pages");

    progress.phase("Exporting pages");
    let total = pages.len();
    let mut documents = Vec::with_capacity(total);
    let mut failures = Vec::new();

    for (i, page) in pages.iter().enumerate() {
        let exported = match source.fetch_body(&page.id).await {
            Ok(body) if body.trim().is_empty() => Err("page has no content".to_string()),
            Ok(body) => prepare_document(&RawDocument {
                title: page.title.clone(),
                body,
            })
            .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match exported {
            Ok(doc) => {
                progress.page_exported(&doc.title, i + 1, total);
                documents.push(doc);
            }
            Err(reason) => {
                warn!(title = %page.title, %reason, "page export failed");
                let failure = PageFailure {
                    title: page.title.clone(),
                    reason,
                };
                progress.page_failed(&failure);
                failures.push(failure);
            }
        }
    }

    if documents.is_empty() {
        return Err(DocSyncError::NothingExported { attempted: total });
    }

    info!(
        exported = documents.len(),
        failed = failures.len(),
        "page export complete"
    );

    Ok(ExportOutcome {
        pages_found: total,
        documents,
        failures,
    })
}

/// Assemble the managed section and cap it to the configured budget.
pub fn build_section(
    documents: &[NormalizedDocument],
    config: &SyncConfig,
    synced_at: DateTime<Utc>,
) -> BuiltSection {
    let layout = SectionLayout::from(config);
    let space_ref = config.space_url();

    let assembled = assemble(&layout, documents, &space_ref, &format_synced_at(synced_at));
    let enforced = enforce(
        &assembled,
        config.max_bytes(),
        &space_ref,
        &layout.markers,
    );

    BuiltSection {
        content: enforced.content,
        assembled_bytes: enforced.original_bytes,
        truncated: enforced.truncated,
    }
}

/// Splice `section` into the configured target file.
#[instrument(skip_all, fields(path = %config.output_path.display(), dry_run = dry_run))]
pub fn apply_section(section: &str, config: &SyncConfig, dry_run: bool) -> Result<ApplyOutcome> {
    let path = &config.output_path;

    let existing = match std::fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(DocSyncError::io(path, e)),
    };

    let target = locate(
        existing.as_deref(),
        &config.markers.start,
        &config.markers.end,
    );
    let merged = merge(&target.prefix, section, &target.suffix);

    let changed = existing
        .as_deref()
        .is_none_or(|old| content_digest(old) != content_digest(&merged));

    let written = changed && !dry_run;
    if written {
        write_atomic(path, &merged)?;
    }

    info!(mode = %target.mode, changed, written, bytes = merged.len(), "merge complete");

    Ok(ApplyOutcome {
        mode: target.mode,
        changed,
        written,
        merged,
    })
}

/// Run the full sync pipeline against `source`.
#[instrument(skip_all, fields(space = %config.space_key, path = %config.output_path.display()))]
pub async fn run_sync<S: PageSource>(
    source: &S,
    config: &SyncConfig,
    options: &SyncOptions,
    progress: &dyn ProgressReporter,
) -> Result<SyncReport> {
    let start = Instant::now();

    let exported = export_pages(source, config, progress).await?;

    progress.phase("Building managed section");
    let section = build_section(&exported.documents, config, options.synced_at);

    progress.phase("Merging into target file");
    let applied = apply_section(&section.content, config, options.dry_run)?;

    let report = SyncReport {
        output_path: config.output_path.clone(),
        pages_found: exported.pages_found,
        pages_exported: exported.documents.len(),
        failures: exported.failures,
        section_bytes: section.content.len(),
        truncated: section.truncated,
        mode: applied.mode,
        changed: applied.changed,
        written: applied.written,
        merged: applied.merged,
        elapsed: start.elapsed(),
    };

    progress.done(&report);
    Ok(report)
}

/// Hex SHA-256 of a file's content.
fn content_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Mutex;

    use chrono::TimeZone;
    use docsync_confluence::MemorySource;
    use docsync_shared::{AppConfig, DEFAULT_START_MARKER};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("docsync-pipeline-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn make_config(output: &Path) -> SyncConfig {
        let mut config = SyncConfig::from(&AppConfig::default());
        config.base_url = "https://example.atlassian.net".into();
        config.space_key = "pilot".into();
        config.target_pages = vec!["Backend Developer Documentation".into()];
        config.output_path = output.to_path_buf();
        config
    }

    fn fixed_options() -> SyncOptions {
        SyncOptions {
            synced_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            dry_run: false,
        }
    }

    fn source() -> MemorySource {
        MemorySource::new().with_page(
            "1",
            "Backend Developer Documentation",
            "<h2>Standards</h2><p>Use typed errors.</p>",
        )
    }

    #[derive(Default)]
    struct RecordingProgress {
        failed: Mutex<Vec<String>>,
        exported: Mutex<Vec<String>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, _name: &str) {}
        fn page_found(&self, _title: &str) {}
        fn page_exported(&self, title: &str, _current: usize, _total: usize) {
            self.exported.lock().unwrap().push(title.to_string());
        }
        fn page_failed(&self, failure: &PageFailure) {
            self.failed.lock().unwrap().push(failure.title.clone());
        }
        fn done(&self, _report: &SyncReport) {}
    }

    #[tokio::test]
    async fn creates_fresh_file() {
        let tmp = temp_dir();
        let out = tmp.join(".github").join("copilot-instructions.md");
        let config = make_config(&out);

        let report = run_sync(&source(), &config, &fixed_options(), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.mode, LocateMode::Fresh);
        assert!(report.written);
        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.starts_with("---\n\n## Platform Documentation"));
        assert!(written.contains("### Backend Developer Documentation"));
        assert!(written.contains("Use typed errors."));
        assert!(written.contains("**Last synced**: 2024-05-01 12:00:00 UTC"));
        assert!(written.contains(
            "**Full Platform Documentation**: https://example.atlassian.net/wiki/spaces/pilot"
        ));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn second_run_is_byte_identical() {
        let tmp = temp_dir();
        let out = tmp.join("instructions.md");
        std::fs::write(&out, "# Team Rules\n\nBe kind.\n").unwrap();
        let config = make_config(&out);

        run_sync(&source(), &config, &fixed_options(), &SilentProgress)
            .await
            .unwrap();
        let first = std::fs::read_to_string(&out).unwrap();

        let report = run_sync(&source(), &config, &fixed_options(), &SilentProgress)
            .await
            .unwrap();
        let second = std::fs::read_to_string(&out).unwrap();

        assert_eq!(first, second);
        assert_eq!(report.mode, LocateMode::Replace);
        assert!(!report.changed);
        assert!(!report.written);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn replaces_section_and_keeps_surroundings() {
        let tmp = temp_dir();
        let out = tmp.join("instructions.md");
        let existing = format!(
            "# Team Rules\n\nBe kind.\n\n---\n\n{DEFAULT_START_MARKER}\n\nSTALE CONTENT\n\n---\n\n## Local Notes\n\nKeep this.\n"
        );
        std::fs::write(&out, &existing).unwrap();
        let config = make_config(&out);

        run_sync(&source(), &config, &fixed_options(), &SilentProgress)
            .await
            .unwrap();
        let written = std::fs::read_to_string(&out).unwrap();

        assert!(written.starts_with("# Team Rules\n\nBe kind.\n\n---\n\n## Platform"));
        assert!(!written.contains("STALE CONTENT"));
        assert!(written.ends_with("\n---\n\n## Local Notes\n\nKeep this.\n"));
        assert_eq!(written.matches(DEFAULT_START_MARKER).count(), 1);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn missing_end_marker_does_not_duplicate_tail() {
        let tmp = temp_dir();
        let out = tmp.join("instructions.md");
        let existing = format!("# Notes\n\n---\n\n{DEFAULT_START_MARKER}\n\nold body\nold tail\n");
        std::fs::write(&out, &existing).unwrap();
        let config = make_config(&out);

        let report = run_sync(&source(), &config, &fixed_options(), &SilentProgress)
            .await
            .unwrap();
        let written = std::fs::read_to_string(&out).unwrap();

        assert_eq!(report.mode, LocateMode::ReplaceToEnd);
        assert!(written.starts_with("# Notes\n\n---\n\n"));
        assert!(!written.contains("old tail"));
        assert!(written.ends_with("\n---\n"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn truncated_section_stays_idempotent() {
        let tmp = temp_dir();
        let out = tmp.join("instructions.md");
        std::fs::write(&out, "# Notes\n\nIntro text.\n").unwrap();

        let big_body: String = (0..400)
            .map(|i| format!("<p>Rule {i}: keep handlers small and typed.</p><hr/>"))
            .collect();
        let source = MemorySource::new().with_page("1", "Backend Developer Documentation", &big_body);

        let mut config = make_config(&out);
        config.max_size_kb = 2;

        let first_report = run_sync(&source, &config, &fixed_options(), &SilentProgress)
            .await
            .unwrap();
        assert!(first_report.truncated);
        assert!(first_report.section_bytes <= 2048);

        // Hand-written text added below the section must survive re-runs.
        let with_suffix = format!("{}\n## Appendix\n\nMine.\n", std::fs::read_to_string(&out).unwrap());
        std::fs::write(&out, &with_suffix).unwrap();

        run_sync(&source, &config, &fixed_options(), &SilentProgress)
            .await
            .unwrap();
        let second = std::fs::read_to_string(&out).unwrap();
        run_sync(&source, &config, &fixed_options(), &SilentProgress)
            .await
            .unwrap();
        let third = std::fs::read_to_string(&out).unwrap();

        assert_eq!(second, third);
        assert!(second.starts_with("# Notes\n\nIntro text.\n\n---\n"));
        assert!(second.ends_with("## Appendix\n\nMine.\n"));
        assert_eq!(second.matches("## Appendix").count(), 1);
        assert_eq!(second.matches("Content truncated due to size limit").count(), 1);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn narrow_budget_with_long_space_url_is_idempotent() {
        let tmp = temp_dir();
        let out = tmp.join("instructions.md");
        std::fs::write(&out, "# Notes\n").unwrap();

        let mut config = make_config(&out);
        config.base_url = format!("https://example.atlassian.net/{}", "x".repeat(880));
        config.max_size_kb = 1;

        run_sync(&source(), &config, &fixed_options(), &SilentProgress)
            .await
            .unwrap();
        let first = std::fs::read_to_string(&out).unwrap();

        let report = run_sync(&source(), &config, &fixed_options(), &SilentProgress)
            .await
            .unwrap();
        let second = std::fs::read_to_string(&out).unwrap();

        assert_eq!(first, second);
        assert_eq!(report.mode, LocateMode::Replace);
        assert!(report.truncated);
        assert!(second.starts_with(&format!("# Notes\n\n---\n\n{DEFAULT_START_MARKER}\n")));
        assert_eq!(second.matches("Content truncated due to size limit").count(), 1);
        assert_eq!(second.matches(DEFAULT_START_MARKER).count(), 1);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn fenced_yaml_separator_keeps_section_bounded() {
        let tmp = temp_dir();
        let out = tmp.join("instructions.md");
        let config = make_config(&out);
        let source = MemorySource::new().with_page(
            "1",
            "Backend Developer Documentation",
            "<p>Monitors:</p><pre><code class=\"language-yaml\">name: a\n---\nname: b</code></pre>",
        );

        run_sync(&source, &config, &fixed_options(), &SilentProgress)
            .await
            .unwrap();
        let with_suffix = format!("{}\n## Local\n\nMine.\n", std::fs::read_to_string(&out).unwrap());
        std::fs::write(&out, &with_suffix).unwrap();

        let report = run_sync(&source, &config, &fixed_options(), &SilentProgress)
            .await
            .unwrap();
        let written = std::fs::read_to_string(&out).unwrap();

        assert!(!report.changed);
        assert_eq!(written, with_suffix);
        assert!(written.contains("name: a\n\\---\nname: b"));
        assert_eq!(written.matches("## Local").count(), 1);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn partial_failures_are_recorded() {
        let tmp = temp_dir();
        let out = tmp.join("instructions.md");
        let mut config = make_config(&out);
        config.target_pages = vec!["Guide".into()];

        let source = MemorySource::new()
            .with_page("1", "Style Guide", "<p>Style rules</p>")
            .with_broken_page("2", "Broken Guide")
            .with_page("3", "Empty Guide", "   ");

        let progress = RecordingProgress::default();
        let report = run_sync(&source, &config, &fixed_options(), &progress)
            .await
            .unwrap();

        assert_eq!(report.pages_found, 3);
        assert_eq!(report.pages_exported, 1);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(*progress.exported.lock().unwrap(), vec!["Style Guide"]);
        assert_eq!(
            *progress.failed.lock().unwrap(),
            vec!["Broken Guide", "Empty Guide"]
        );

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn no_pages_found_is_fatal() {
        let tmp = temp_dir();
        let config = make_config(&tmp.join("instructions.md"));
        let source = MemorySource::new().with_page("1", "Unrelated", "<p>x</p>");

        let err = run_sync(&source, &config, &fixed_options(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, DocSyncError::NoPages { .. }));
        assert!(!tmp.join("instructions.md").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn zero_exports_is_fatal() {
        let tmp = temp_dir();
        let config = make_config(&tmp.join("instructions.md"));
        let source = MemorySource::new().with_broken_page("1", "Backend Developer Documentation");

        let err = run_sync(&source, &config, &fixed_options(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, DocSyncError::NothingExported { attempted: 1 }));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn dry_run_leaves_file_untouched() {
        let tmp = temp_dir();
        let out = tmp.join("instructions.md");
        std::fs::write(&out, "# Notes\n").unwrap();
        let config = make_config(&out);
        let options = SyncOptions {
            dry_run: true,
            ..fixed_options()
        };

        let report = run_sync(&source(), &config, &options, &SilentProgress)
            .await
            .unwrap();

        assert!(report.changed);
        assert!(!report.written);
        assert!(report.merged.starts_with("# Notes\n\n---\n"));
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "# Notes\n");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn concrete_scenario_appends_after_notes() {
        let tmp = temp_dir();
        let out = tmp.join("instructions.md");
        std::fs::write(&out, "# My Notes\n").unwrap();
        let mut config = make_config(&out);
        config.max_size_kb = 1_000_000;

        let docs = vec![NormalizedDocument {
            title: "A".into(),
            body: docsync_markdown::normalize("Hello\n\n\n\nWorld"),
        }];
        assert_eq!(docs[0].body, "Hello\n\nWorld");

        let section = build_section(&docs, &config, fixed_options().synced_at);
        assert!(!section.truncated);
        assert!(section.content.contains("### A\n\nHello\n\nWorld\n"));

        let applied = apply_section(&section.content, &config, false).unwrap();
        assert_eq!(applied.mode, LocateMode::Append);
        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            format!("# My Notes\n\n{}", section.content)
        );

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn empty_section_into_empty_file_is_just_scaffolding() {
        let tmp = temp_dir();
        let out = tmp.join("instructions.md");
        std::fs::write(&out, "").unwrap();
        let config = make_config(&out);

        let section = build_section(&[], &config, fixed_options().synced_at);
        apply_section(&section.content, &config, false).unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap(), section.content);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn digest_is_stable_hex() {
        let d = content_digest("abc");
        assert_eq!(d.len(), 64);
        assert_eq!(d, content_digest("abc"));
        assert_ne!(d, content_digest("abd"));
    }
}
