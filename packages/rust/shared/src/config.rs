//! Application configuration for docsync.
//!
//! User config lives at `~/.docsync/docsync.toml`.
//! CLI flags (and their env vars) override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DocSyncError, Result};
use crate::types::Markers;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docsync.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docsync";

/// Heading line that opens the managed section.
pub const DEFAULT_START_MARKER: &str = "## Platform Documentation (Auto-synced from Confluence)";

/// Standalone line that closes the managed section.
pub const DEFAULT_END_MARKER: &str = "---";

// ---------------------------------------------------------------------------
// Config structs (matching docsync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Confluence source settings.
    #[serde(default)]
    pub confluence: ConfluenceConfig,

    /// Target instructions file settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[confluence]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfluenceConfig {
    /// Confluence instance URL, used for API calls and the footer link.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Space key to search, also used in the footer link.
    #[serde(default = "default_space_key")]
    pub space_key: String,

    /// Name of the env var holding the account email (never store it here).
    #[serde(default = "default_email_env")]
    pub email_env: String,

    /// Name of the env var holding the API token (never store it here).
    #[serde(default = "default_api_token_env")]
    pub api_token_env: String,

    /// Page titles to sync, matched case-insensitively as substrings.
    #[serde(default = "default_target_pages")]
    pub target_pages: Vec<String>,

    /// HTTP timeout per request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            space_key: default_space_key(),
            email_env: default_email_env(),
            api_token_env: default_api_token_env(),
            target_pages: default_target_pages(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://vfs.atlassian.net".into()
}
fn default_space_key() -> String {
    "pilot".into()
}
fn default_email_env() -> String {
    "CONFLUENCE_EMAIL".into()
}
fn default_api_token_env() -> String {
    "CONFLUENCE_API_TOKEN".into()
}
fn default_target_pages() -> Vec<String> {
    vec!["Backend Developer Documentation".into()]
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Instructions file to splice the managed section into.
    #[serde(default = "default_output_path")]
    pub path: String,

    /// Size cap for the managed section, in KiB.
    #[serde(default = "default_max_size_kb")]
    pub max_size_kb: u64,

    /// Line that opens the managed section.
    #[serde(default = "default_start_marker")]
    pub start_marker: String,

    /// Standalone line that closes the managed section.
    #[serde(default = "default_end_marker")]
    pub end_marker: String,

    /// Sentence placed under the section heading.
    #[serde(default = "default_intro")]
    pub intro: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            max_size_kb: default_max_size_kb(),
            start_marker: default_start_marker(),
            end_marker: default_end_marker(),
            intro: default_intro(),
        }
    }
}

fn default_output_path() -> String {
    ".github/copilot-instructions.md".into()
}
fn default_max_size_kb() -> u64 {
    100
}
fn default_start_marker() -> String {
    DEFAULT_START_MARKER.into()
}
fn default_end_marker() -> String {
    DEFAULT_END_MARKER.into()
}
fn default_intro() -> String {
    "The following standards are automatically synced from Backend Developer Documentation in Confluence."
        .into()
}

// ---------------------------------------------------------------------------
// Sync config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime sync configuration, built once at startup and passed to each component.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Confluence instance URL.
    pub base_url: String,
    /// Confluence space key.
    pub space_key: String,
    /// Page titles to look up.
    pub target_pages: Vec<String>,
    /// HTTP timeout per request.
    pub timeout_secs: u64,
    /// Destination instructions file.
    pub output_path: PathBuf,
    /// Size cap for the managed section, in KiB.
    pub max_size_kb: u64,
    /// Managed section boundary lines.
    pub markers: Markers,
    /// Sentence placed under the section heading.
    pub intro: String,
}

impl From<&AppConfig> for SyncConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.confluence.base_url.clone(),
            space_key: config.confluence.space_key.clone(),
            target_pages: config.confluence.target_pages.clone(),
            timeout_secs: config.confluence.timeout_secs,
            output_path: PathBuf::from(&config.output.path),
            max_size_kb: config.output.max_size_kb,
            markers: Markers {
                start: config.output.start_marker.clone(),
                end: config.output.end_marker.clone(),
            },
            intro: config.output.intro.clone(),
        }
    }
}

impl SyncConfig {
    /// Link back to the authoritative space, used in the footer and truncation notice.
    pub fn space_url(&self) -> String {
        format!(
            "{}/wiki/spaces/{}",
            self.base_url.trim_end_matches('/'),
            self.space_key
        )
    }

    /// Byte budget for the managed section.
    pub fn max_bytes(&self) -> usize {
        usize::try_from(self.max_size_kb.saturating_mul(1024)).unwrap_or(usize::MAX)
    }

    /// Reject configurations that cannot produce a sane run.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            DocSyncError::config(format!("invalid base_url '{}': {e}", self.base_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DocSyncError::config(format!(
                "base_url must be http(s), got '{}'",
                self.base_url
            )));
        }
        if self.space_key.trim().is_empty() {
            return Err(DocSyncError::config("space_key must not be empty"));
        }
        if self.target_pages.iter().all(|t| t.trim().is_empty()) {
            return Err(DocSyncError::config("at least one target page is required"));
        }
        if self.max_size_kb == 0 {
            return Err(DocSyncError::config("max_size_kb must be greater than zero"));
        }
        self.markers.validate()
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Confluence API credentials resolved from the environment.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub api_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

/// Read the email and API token from the env vars named in the config.
pub fn resolve_credentials(config: &ConfluenceConfig) -> Result<Credentials> {
    let read = |name: &str| match std::env::var(name) {
        Ok(val) if !val.trim().is_empty() => Some(val),
        _ => None,
    };

    let email = read(&config.email_env);
    let api_token = read(&config.api_token_env);

    match (email, api_token) {
        (Some(email), Some(api_token)) => Ok(Credentials { email, api_token }),
        (email, token) => {
            let mut missing = Vec::new();
            if email.is_none() {
                missing.push(config.email_env.as_str());
            }
            if token.is_none() {
                missing.push(config.api_token_env.as_str());
            }
            Err(DocSyncError::config(format!(
                "missing required environment variables: {}.\n\
                 Generate an API token at https://id.atlassian.com/manage-profile/security/api-tokens",
                missing.join(", ")
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docsync/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| DocSyncError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docsync/docsync.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocSyncError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DocSyncError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocSyncError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocSyncError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocSyncError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
