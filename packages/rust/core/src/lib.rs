//! Core sync logic for docsync.
//!
//! This crate turns exported Confluence pages into a managed section and
//! splices it into a hand-edited instructions file, leaving everything
//! outside the section untouched.

pub mod boundary;
pub mod budget;
pub mod merge;
pub mod pipeline;
pub mod section;

pub use boundary::locate;
pub use budget::{Enforced, enforce, truncation_notice};
pub use merge::{merge, merge_and_write, write_atomic};
pub use pipeline::{
    ApplyOutcome, BuiltSection, ExportOutcome, PageFailure, ProgressReporter, SilentProgress,
    SyncOptions, SyncReport, apply_section, build_section, export_pages, run_sync,
};
pub use section::{ManagedSection, SectionLayout, assemble, format_synced_at};
