//! Shared types, error model, and configuration for docsync.
//!
//! This crate is the foundation depended on by all other docsync crates.
//! It provides:
//! - [`DocSyncError`], the unified error type
//! - Domain types ([`RawDocument`], [`NormalizedDocument`], [`TargetDocument`], [`Markers`])
//! - Configuration ([`AppConfig`], [`SyncConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ConfluenceConfig, Credentials, DEFAULT_END_MARKER, DEFAULT_START_MARKER,
    OutputConfig, SyncConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from, resolve_credentials,
};
pub use error::{DocSyncError, Result};
pub use types::{LocateMode, Markers, NormalizedDocument, PageRef, RawDocument, TargetDocument};
