//! Asset downloading.
//!
//! Downloads run with bounded concurrency. Each failure is logged and the
//! asset is left out of the result; one bad URL never fails the page.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{AssetDescriptor, AssetPlan, PageNode};

/// Why a single asset could not be fetched
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Fetches asset bytes over HTTP
#[derive(Debug, Clone)]
pub struct AssetDownloader {
    client: reqwest::Client,
    concurrency: usize,
}

impl AssetDownloader {
    /// Create a downloader with its own HTTP client
    pub fn new(concurrency: usize, timeout: Duration, proxy: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if let Some(proxy_url) = proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .with_context(|| format!("Invalid proxy URL: {}", proxy_url))?;
            builder = builder.proxy(proxy);
        }
        let client = builder.build().context("Failed to build download client")?;

        Ok(Self::with_client(client, concurrency))
    }

    /// Create a downloader around an existing client
    pub fn with_client(client: reqwest::Client, concurrency: usize) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
        }
    }

    /// Download every planned asset for a page.
    ///
    /// Plans are deduplicated by local path first. The result holds only
    /// the assets that downloaded successfully, in completion order.
    pub async fn collect_assets(&self, page: &PageNode, plans: &[AssetPlan]) -> Vec<AssetDescriptor> {
        let mut seen = HashSet::new();
        let unique: Vec<&AssetPlan> = plans
            .iter()
            .filter(|p| seen.insert(p.local_path.clone()))
            .collect();

        if unique.is_empty() {
            return Vec::new();
        }

        debug!(page_id = %page.id, count = unique.len(), "Downloading assets");

        stream::iter(unique.into_iter().cloned())
            .map(|plan| self.download_one(page, plan))
            .buffer_unordered(self.concurrency)
            .filter_map(|result| async move { result })
            .collect()
            .await
    }

    async fn download_one(&self, page: &PageNode, plan: AssetPlan) -> Option<AssetDescriptor> {
        match self.fetch(&plan.original_url).await {
            Ok(bytes) => {
                debug!(
                    page_id = %page.id,
                    path = %plan.local_path.display(),
                    bytes = bytes.len(),
                    "Asset downloaded"
                );
                Some(AssetDescriptor { plan, bytes })
            }
            Err(e) => {
                warn!(
                    page_id = %page.id,
                    url = %plan.original_url,
                    path = %plan.local_path.display(),
                    error = %e,
                    "Asset download failed"
                );
                None
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status.as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}
