//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use docsync_confluence::ConfluenceClient;
use docsync_core::pipeline::{PageFailure, ProgressReporter, SyncOptions, SyncReport, run_sync};
use docsync_shared::{
    AppConfig, SyncConfig, init_config, load_config, load_config_from, resolve_credentials,
};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docsync: sync Confluence documentation into an instructions file.
#[derive(Parser)]
#[command(
    name = "docsync",
    version,
    about = "Sync Confluence pages into the auto-managed section of an instructions file.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.docsync/docsync.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch the configured pages and rewrite the managed section.
    Sync(SyncArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags for `docsync sync`. Each one overrides the config file.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct SyncArgs {
    /// Instructions file to update.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Size cap for the managed section, in KiB.
    #[arg(long, env = "DOCSYNC_MAX_SIZE_KB")]
    pub max_size_kb: Option<u64>,

    /// Confluence instance URL.
    #[arg(long, env = "CONFLUENCE_URL")]
    pub base_url: Option<String>,

    /// Confluence space key.
    #[arg(long, env = "CONFLUENCE_SPACE_KEY")]
    pub space_key: Option<String>,

    /// Page title to sync (repeatable; replaces the configured list).
    #[arg(long = "page")]
    pub pages: Vec<String>,

    /// Show what would change without writing the file.
    #[arg(long)]
    pub dry_run: bool,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docsync=info",
        1 => "docsync=debug",
        _ => "docsync=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Sync(args) => cmd_sync(&config, &args).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

/// Build the runtime config from the file config plus command-line overrides.
fn resolve_sync_config(config: &AppConfig, args: &SyncArgs) -> Result<SyncConfig> {
    let mut sync = SyncConfig::from(config);

    if let Some(output) = &args.output {
        sync.output_path = output.clone();
    }
    if let Some(kb) = args.max_size_kb {
        sync.max_size_kb = kb;
    }
    if let Some(base_url) = &args.base_url {
        Url::parse(base_url).map_err(|e| eyre!("invalid URL '{base_url}': {e}"))?;
        sync.base_url = base_url.clone();
    }
    if let Some(space_key) = &args.space_key {
        sync.space_key = space_key.clone();
    }
    if !args.pages.is_empty() {
        sync.target_pages = args.pages.clone();
    }

    sync.validate()?;
    Ok(sync)
}

async fn cmd_sync(config: &AppConfig, args: &SyncArgs) -> Result<()> {
    let sync = resolve_sync_config(config, args)?;
    let credentials = resolve_credentials(&config.confluence)?;

    info!(
        base_url = %sync.base_url,
        space = %sync.space_key,
        output = %sync.output_path.display(),
        dry_run = args.dry_run,
        "starting sync"
    );

    let client = ConfluenceClient::from_config(&sync, credentials)?;
    client.check_space().await?;

    let options = SyncOptions {
        dry_run: args.dry_run,
        ..SyncOptions::now()
    };

    let reporter = CliProgress::new()?;
    let report = run_sync(&client, &sync, &options, &reporter).await?;

    print_summary(&report);

    for failure in &report.failures {
        eprintln!("  failed: {} ({})", failure.title, failure.reason);
    }

    Ok(())
}

fn print_summary(report: &SyncReport) {
    let status = match (report.changed, report.written) {
        (false, _) => "unchanged",
        (true, true) => "updated",
        (true, false) => "would change (dry run)",
    };

    println!();
    println!("  Sync complete: {status}");
    println!("  File:      {}", report.output_path.display());
    println!("  Mode:      {}", report.mode);
    println!("  Found:     {}", report.pages_found);
    println!("  Exported:  {}", report.pages_exported);
    println!("  Failed:    {}", report.failures.len());
    println!(
        "  Section:   {:.1} KB{}",
        report.section_bytes as f64 / 1024.0,
        if report.truncated { " (truncated)" } else { "" }
    );
    println!("  Time:      {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner on stdout.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Result<Self> {
        let spinner = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout());
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")?
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Ok(Self { spinner })
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_found(&self, title: &str) {
        self.spinner.println(format!("  found: {title}"));
    }

    fn page_exported(&self, title: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Exported [{current}/{total}] {title}"));
    }

    fn page_failed(&self, failure: &PageFailure) {
        self.spinner
            .set_message(format!("Failed {}: {}", failure.title, failure.reason));
    }

    fn done(&self, _report: &SyncReport) {
        self.spinner.finish_and_clear();
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}
