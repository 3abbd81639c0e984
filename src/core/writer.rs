//! Persisting rendered pages and their assets.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::domain::{AssetDescriptor, PageNode};

use super::paths::{PageLocation, PathPlanner};

/// What `write_page` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Markdown written; asset writes are best-effort
    Written {
        path: PathBuf,
        assets_written: usize,
        assets_failed: usize,
    },

    /// Target existed and overwriting was not forced
    Skipped { path: PathBuf },

    /// Dry run: nothing touched
    DryRun { path: PathBuf },
}

impl WriteOutcome {
    /// Target Markdown path
    pub fn path(&self) -> &Path {
        match self {
            WriteOutcome::Written { path, .. }
            | WriteOutcome::Skipped { path }
            | WriteOutcome::DryRun { path } => path,
        }
    }
}

/// Writes pages under the output directory
#[derive(Debug, Clone)]
pub struct OutputWriter {
    paths: PathPlanner,
    force: bool,
    dry_run: bool,
}

impl OutputWriter {
    pub fn new(paths: PathPlanner, force: bool, dry_run: bool) -> Self {
        Self {
            paths,
            force,
            dry_run,
        }
    }

    /// Path planner used for placement
    pub fn paths(&self) -> &PathPlanner {
        &self.paths
    }

    /// Whether a write to `location` would be skipped (existing file, no force)
    pub async fn would_skip(&self, location: &PageLocation) -> bool {
        !self.dry_run && !self.force && exists(&location.file_path).await
    }

    /// Write a page's Markdown and downloaded assets
    pub async fn write_page(
        &self,
        page: &PageNode,
        markdown: &str,
        assets: &[AssetDescriptor],
    ) -> Result<WriteOutcome> {
        let location = self.paths.resolve(page);
        let path = location.file_path.clone();

        if self.dry_run {
            info!(page_id = %page.id, path = %path.display(), assets = assets.len(), "Dry run: would write page");
            return Ok(WriteOutcome::DryRun { path });
        }

        if self.would_skip(&location).await {
            info!(page_id = %page.id, path = %path.display(), "File exists, skipping (use --force to overwrite)");
            return Ok(WriteOutcome::Skipped { path });
        }

        fs::create_dir_all(&location.directory)
            .await
            .with_context(|| format!("Failed to create directory: {}", location.directory.display()))?;

        fs::write(&path, markdown)
            .await
            .with_context(|| format!("Failed to write page: {}", path.display()))?;

        let mut assets_written = 0;
        let mut assets_failed = 0;
        for asset in assets {
            let target = location.directory.join(&asset.plan.local_path);
            match write_asset(&target, &asset.bytes).await {
                Ok(()) => {
                    debug!(path = %target.display(), bytes = asset.bytes.len(), "Asset written");
                    assets_written += 1;
                }
                Err(e) => {
                    warn!(page_id = %page.id, path = %target.display(), error = %e, "Failed to write asset");
                    assets_failed += 1;
                }
            }
        }

        info!(page_id = %page.id, path = %path.display(), assets_written, "Page written");

        Ok(WriteOutcome::Written {
            path,
            assets_written,
            assets_failed,
        })
    }
}

async fn write_asset(target: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create media directory: {}", parent.display()))?;
    }
    fs::write(target, bytes)
        .await
        .with_context(|| format!("Failed to write asset: {}", target.display()))
}

async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::domain::{AssetPlan, MediaKind};

    fn asset(name: &str, bytes: &[u8]) -> AssetDescriptor {
        AssetDescriptor {
            plan: AssetPlan {
                id: name.into(),
                original_url: format!("https://x.test/{}", name),
                local_path: PathBuf::from("media").join(name),
                kind: MediaKind::Image,
                caption: None,
            },
            bytes: bytes.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_writes_markdown_and_assets() {
        let temp = TempDir::new().unwrap();
        let writer = OutputWriter::new(PathPlanner::new(temp.path()), false, false);
        let page = PageNode::new("p", "Root", vec![], vec![]);

        let outcome = writer
            .write_page(&page, "# Root\n", &[asset("a.png", b"png")])
            .await
            .unwrap();

        let md = temp.path().join("Root").join("Root.md");
        assert_eq!(
            outcome,
            WriteOutcome::Written {
                path: md.clone(),
                assets_written: 1,
                assets_failed: 0
            }
        );
        assert_eq!(std::fs::read_to_string(&md).unwrap(), "# Root\n");
        assert_eq!(
            std::fs::read(temp.path().join("Root/media/a.png")).unwrap(),
            b"png"
        );
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let writer = OutputWriter::new(PathPlanner::new(temp.path()), false, true);
        let page = PageNode::new("p", "Root", vec![], vec![]);

        let outcome = writer.write_page(&page, "# Root\n", &[]).await.unwrap();

        assert!(matches!(outcome, WriteOutcome::DryRun { .. }));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_force_overwrites() {
        let temp = TempDir::new().unwrap();
        let page = PageNode::new("p", "Root", vec![], vec![]);
        let md = temp.path().join("Root/Root.md");
        std::fs::create_dir_all(md.parent().unwrap()).unwrap();
        std::fs::write(&md, "old").unwrap();

        let writer = OutputWriter::new(PathPlanner::new(temp.path()), true, false);
        let outcome = writer.write_page(&page, "new\n", &[]).await.unwrap();

        assert!(matches!(outcome, WriteOutcome::Written { .. }));
        assert_eq!(std::fs::read_to_string(&md).unwrap(), "new\n");
    }
}
