//! Export run: traversal plus the per-page render/download/write handler.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{parse_page_id, NotionApi, NotionClient};
use crate::config::ExportConfig;
use crate::domain::{PageNode, PageRecord, RunSummary};

use super::download::AssetDownloader;
use super::paths::PathPlanner;
use super::render::Renderer;
use super::traversal::{PageHandler, Traverser};
use super::writer::{OutputWriter, WriteOutcome};

/// Drives one export run
pub struct Exporter {
    api: Arc<dyn NotionApi>,
    downloader: AssetDownloader,
    config: ExportConfig,
}

impl Exporter {
    /// Build an exporter with HTTP clients configured from `config`
    pub fn from_config(config: ExportConfig) -> Result<Self> {
        config.validate()?;

        let client = NotionClient::new(
            config.token.clone(),
            config.request_timeout,
            config.proxy.as_deref(),
        )?
        .with_retry_policy(config.retry.clone());
        let downloader = AssetDownloader::new(
            config.download_concurrency,
            config.request_timeout,
            config.proxy.as_deref(),
        )?;

        Ok(Self::new(Arc::new(client), downloader, config))
    }

    /// Build an exporter around an existing API client
    pub fn new(api: Arc<dyn NotionApi>, downloader: AssetDownloader, config: ExportConfig) -> Self {
        Self {
            api,
            downloader,
            config,
        }
    }

    /// Export the configured root (or every discovered root)
    #[instrument(skip(self), fields(run_id = tracing::field::Empty))]
    pub async fn run(&self) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));

        let root = self
            .config
            .root_page_id
            .as_deref()
            .map(parse_page_id)
            .transpose()
            .context("Invalid root page id")?;

        let mut summary = RunSummary::new(run_id, self.config.dry_run);
        info!(
            out_dir = %self.config.out_dir.display(),
            root = root.as_deref().unwrap_or("(discover)"),
            dry_run = self.config.dry_run,
            force = self.config.force,
            "Starting export"
        );

        let paths = PathPlanner::new(&self.config.out_dir);
        let handler = Arc::new(ExportHandler {
            renderer: Renderer::new(),
            downloader: self.downloader.clone(),
            writer: OutputWriter::new(paths, self.config.force, self.config.dry_run),
            dry_run: self.config.dry_run,
            stats: ExportStats::default(),
        });

        let traverser = Traverser::new(Arc::clone(&self.api), self.config.concurrency);
        let report = traverser
            .traverse(root.as_deref(), Arc::clone(&handler) as Arc<dyn PageHandler>)
            .await?;

        summary.pages_visited = report.visited;
        summary.pages_written = handler.stats.written.load(Ordering::Relaxed);
        summary.pages_skipped = handler.stats.skipped.load(Ordering::Relaxed);
        summary.assets_downloaded = handler.stats.assets_downloaded.load(Ordering::Relaxed);
        summary.assets_failed = handler.stats.assets_failed.load(Ordering::Relaxed);
        for failure in report.failures {
            summary.record_failure(failure);
        }
        summary.complete();

        info!(
            pages_visited = summary.pages_visited,
            pages_written = summary.pages_written,
            pages_skipped = summary.pages_skipped,
            pages_failed = summary.pages_failed,
            assets_downloaded = summary.assets_downloaded,
            assets_failed = summary.assets_failed,
            duration_ms = summary.duration_ms().unwrap_or(0),
            "Export complete"
        );

        Ok(summary)
    }

    /// Root pages that an export without `--root` would start from
    pub async fn list_roots(&self) -> Result<Vec<PageRecord>> {
        let traverser = Traverser::new(Arc::clone(&self.api), self.config.concurrency);
        traverser
            .discover_roots()
            .await
            .context("Failed to list root pages")
    }
}

#[derive(Debug, Default)]
struct ExportStats {
    written: AtomicUsize,
    skipped: AtomicUsize,
    assets_downloaded: AtomicUsize,
    assets_failed: AtomicUsize,
}

/// Render, download and write one page
struct ExportHandler {
    renderer: Renderer,
    downloader: AssetDownloader,
    writer: OutputWriter,
    dry_run: bool,
    stats: ExportStats,
}

#[async_trait]
impl PageHandler for ExportHandler {
    async fn handle(&self, page: PageNode) -> Result<()> {
        let rendered = self.renderer.render_page(&page);
        let location = self.writer.paths().resolve(&page);

        // Nothing is downloaded for pages that will not be written
        let assets = if self.dry_run || self.writer.would_skip(&location).await {
            Vec::new()
        } else {
            self.downloader.collect_assets(&page, &rendered.assets).await
        };
        let download_failures = if self.dry_run {
            0
        } else {
            rendered.assets.len().saturating_sub(assets.len())
        };

        let outcome = self
            .writer
            .write_page(&page, &rendered.content, &assets)
            .await
            .with_context(|| format!("Failed to write page \"{}\"", page.title))?;

        match outcome {
            WriteOutcome::Written {
                assets_written,
                assets_failed,
                ..
            } => {
                self.stats.written.fetch_add(1, Ordering::Relaxed);
                self.stats
                    .assets_downloaded
                    .fetch_add(assets_written, Ordering::Relaxed);
                self.stats
                    .assets_failed
                    .fetch_add(assets_failed + download_failures, Ordering::Relaxed);
                if download_failures > 0 {
                    warn!(page_id = %page.id, title = %page.title, failed = download_failures, "Some assets were not downloaded");
                }
            }
            WriteOutcome::Skipped { .. } => {
                self.stats.skipped.fetch_add(1, Ordering::Relaxed);
            }
            WriteOutcome::DryRun { path } => {
                debug!(page_id = %page.id, path = %path.display(), assets = rendered.assets.len(), "Planned");
                self.stats.written.fetch_add(1, Ordering::Relaxed);
            }
        }

        Ok(())
    }
}
