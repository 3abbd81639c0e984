//! Command-line interface for notion-export.
//!
//! Provides commands for exporting a page tree, listing the root pages
//! an export would start from, and showing the resolved configuration.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use crate::config::{ExportConfig, Overrides};
use crate::core::Exporter;
use crate::domain::RunSummary;

/// notion-export - Export a Notion page tree to Markdown
#[derive(Parser, Debug)]
#[command(name = "notion-export")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: .notion-export/config.yaml here or in a parent directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Notion integration token
    #[arg(long, global = true, env = "NOTION_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Proxy URL for API and asset requests
    #[arg(long, global = true)]
    pub proxy: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export pages to Markdown
    Export {
        /// Root page id or URL (exports every discovered root if omitted)
        #[arg(short, long, env = "NOTION_ROOT_PAGE_ID")]
        root: Option<String>,

        /// Output directory
        #[arg(short, long, env = "NOTION_EXPORT_OUT_DIR")]
        out: Option<PathBuf>,

        /// Pages processed concurrently
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Asset downloads in flight per page
        #[arg(long)]
        download_concurrency: Option<usize>,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,

        /// Plan the export without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// List the root pages an export would start from
    Roots,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let mut overrides = Overrides {
            token: self.token,
            proxy: self.proxy,
            ..Overrides::default()
        };

        match self.command {
            Commands::Export {
                root,
                out,
                concurrency,
                download_concurrency,
                force,
                dry_run,
            } => {
                overrides.root_page_id = root;
                overrides.out_dir = out;
                overrides.concurrency = concurrency;
                overrides.download_concurrency = download_concurrency;
                overrides.force = force;
                overrides.dry_run = dry_run;

                let config = ExportConfig::load(self.config.as_deref(), overrides)?;
                run_export(config).await
            }
            Commands::Roots => {
                let config = ExportConfig::load(self.config.as_deref(), overrides)?;
                list_roots(config).await
            }
            Commands::Config => {
                let config = ExportConfig::load(self.config.as_deref(), overrides)?;
                show_config(&config);
                Ok(())
            }
        }
    }
}

/// Run an export and print its summary
async fn run_export(config: ExportConfig) -> Result<()> {
    let exporter = Exporter::from_config(config)?;
    let summary = exporter.run().await?;

    print_summary(&summary);

    if !summary.is_clean() {
        bail!("{} page(s) failed to export", summary.pages_failed);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    if summary.dry_run {
        println!("Dry run {} (nothing was written)", summary.run_id);
    } else {
        println!("Export {}", summary.run_id);
    }
    println!("  Pages visited:     {}", summary.pages_visited);
    println!(
        "  Pages {}:     {}",
        if summary.dry_run { "planned" } else { "written" },
        summary.pages_written
    );
    println!("  Pages skipped:     {}", summary.pages_skipped);
    println!("  Pages failed:      {}", summary.pages_failed);
    println!("  Assets downloaded: {}", summary.assets_downloaded);
    println!("  Assets failed:     {}", summary.assets_failed);
    if let Some(ms) = summary.duration_ms() {
        println!("  Duration:          {:.1}s", ms as f64 / 1000.0);
    }

    if !summary.failures.is_empty() {
        println!("\nFailures:");
        for failure in &summary.failures {
            println!(
                "  {} {}: {}",
                failure.page_id,
                failure.title.as_deref().unwrap_or("(untitled)"),
                failure.reason
            );
        }
    }
}

/// List discovered root pages
async fn list_roots(config: ExportConfig) -> Result<()> {
    let exporter = Exporter::from_config(config)?;
    let roots = exporter.list_roots().await?;

    if roots.is_empty() {
        println!("No root pages found (is the integration shared with any pages?)");
        return Ok(());
    }

    println!("{:<38} {}", "PAGE ID", "TITLE");
    println!("{}", "-".repeat(75));

    for page in roots {
        println!("{:<38} {}", page.id, page.title);
    }

    Ok(())
}

/// Show resolved configuration
fn show_config(config: &ExportConfig) {
    println!("notion-export configuration");
    println!();
    println!(
        "Config file: {}",
        config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Connection:");
    println!("  Token:   {}", config.redacted_token());
    println!("  Proxy:   {}", config.proxy.as_deref().unwrap_or("(none)"));
    println!("  Timeout: {}s", config.request_timeout.as_secs());
    println!(
        "  Retry:   {} attempts, {}ms initial backoff",
        config.retry.max_attempts, config.retry.initial_delay_ms
    );
    println!();
    println!("Export:");
    println!(
        "  Root page:            {}",
        config.root_page_id.as_deref().unwrap_or("(discover)")
    );
    println!("  Output directory:     {}", config.out_dir.display());
    println!("  Concurrency:          {}", config.concurrency);
    println!("  Download concurrency: {}", config.download_concurrency);
    println!("  Force overwrite:      {}", config.force);
}
