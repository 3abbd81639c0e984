//! Breadth-first traversal of the page tree.
//!
//! The dequeue loop owns the queue and the visited set. Each dequeued
//! page is hydrated (page metadata plus its complete block tree), its
//! child pages are enqueued, and the page is handed to a `PageHandler`
//! on a bounded pool. Discovery runs ahead of the handlers by at most
//! `PENDING_PER_WORKER` pages per worker, so hydrated trees waiting for a
//! permit stay bounded.

use std::collections::{HashMap, HashSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::adapters::{normalize_id, ApiError, NotionApi};
use crate::domain::{Block, PageFailure, PageNode, PageRecord, Parent, UNTITLED};

use super::paths::SiblingNames;

/// Dispatched pages allowed to wait for a handler permit, per worker
pub const PENDING_PER_WORKER: usize = 4;

/// Work done for every traversed page
#[async_trait]
pub trait PageHandler: Send + Sync {
    async fn handle(&self, page: PageNode) -> Result<()>;
}

/// A page waiting to be hydrated
#[derive(Debug, Clone)]
struct QueueItem {
    id: String,
    /// Ancestor directory names, fixed at enqueue time
    path: Vec<String>,
    /// Title from the parent's child-page block
    title_hint: Option<String>,
}

impl QueueItem {
    fn root(id: &str) -> Self {
        Self {
            id: normalize_id(id),
            path: Vec::new(),
            title_hint: None,
        }
    }
}

/// What happened during one traversal
#[derive(Debug, Clone, Default)]
pub struct TraversalReport {
    /// Pages hydrated and dispatched to the handler
    pub visited: usize,

    /// Handler calls that completed successfully
    pub handled: usize,

    /// Pages that failed hydration or handling
    pub failures: Vec<PageFailure>,
}

/// Breadth-first walker over the remote page tree
pub struct Traverser {
    api: Arc<dyn NotionApi>,
    concurrency: usize,
}

impl Traverser {
    /// Create a traverser; `concurrency` bounds concurrent handler calls
    pub fn new(api: Arc<dyn NotionApi>, concurrency: usize) -> Self {
        Self {
            api,
            concurrency: concurrency.max(1),
        }
    }

    /// Walk the tree from `root` (or from discovered roots) calling `handler` per page.
    ///
    /// Returns once the queue is empty and every dispatched handler has
    /// settled. Only a failed lookup of an explicit root (or of the root
    /// listing) aborts the traversal.
    pub async fn traverse(
        &self,
        root: Option<&str>,
        handler: Arc<dyn PageHandler>,
    ) -> Result<TraversalReport> {
        let mut queue: VecDeque<QueueItem> = match root {
            Some(id) => VecDeque::from([QueueItem::root(id)]),
            None => self
                .discover_roots()
                .await
                .context("Failed to discover root pages")?
                .iter()
                .map(|record| QueueItem {
                    title_hint: Some(record.title.clone()),
                    ..QueueItem::root(&record.id)
                })
                .collect(),
        };
        let explicit_root = root.map(normalize_id);

        info!(roots = queue.len(), concurrency = self.concurrency, "Starting traversal");

        let mut visited: HashSet<String> = HashSet::new();
        // Names claimed so far in each output directory, keyed by its path
        let mut directories: HashMap<Vec<String>, SiblingNames> = HashMap::new();
        let mut report = TraversalReport::default();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let max_pending = self.concurrency * PENDING_PER_WORKER;
        let mut tasks: JoinSet<PageResult> = JoinSet::new();

        while let Some(item) = queue.pop_front() {
            if !visited.insert(item.id.clone()) {
                debug!(page_id = %item.id, "Already visited, skipping");
                continue;
            }

            while tasks.len() >= max_pending {
                match tasks.join_next().await {
                    Some(joined) => record_result(&mut report, joined),
                    None => break,
                }
            }

            let page = match self.hydrate(&item).await {
                Ok(page) => {
                    // Claimed in dequeue order, which only depends on document order
                    let siblings = directories
                        .entry(item.path.clone())
                        .or_insert_with(|| match item.path.last() {
                            Some(parent) => SiblingNames::under(parent),
                            None => SiblingNames::roots(),
                        });
                    let placement = siblings.claim(&page.title);
                    page.with_placement(placement)
                }
                Err(e) if explicit_root.as_deref() == Some(item.id.as_str()) => {
                    return Err(e).with_context(|| format!("Failed to load root page {}", item.id));
                }
                Err(e) => {
                    error!(page_id = %item.id, title = ?item.title_hint, error = %e, "Failed to fetch page");
                    report.failures.push(PageFailure {
                        page_id: item.id.clone(),
                        title: item.title_hint.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            report.visited += 1;
            debug!(
                page_id = %page.id,
                title = %page.title,
                depth = page.path.len(),
                child_pages = page.child_pages.len(),
                "Page hydrated"
            );

            let mut child_path = page.path.clone();
            child_path.extend(page.placement.as_ref().map(|p| p.name.clone()));
            for child in &page.child_pages {
                let id = normalize_id(&child.id);
                if visited.contains(&id) {
                    continue;
                }
                queue.push_back(QueueItem {
                    id,
                    path: child_path.clone(),
                    title_hint: Some(child.title.clone()),
                });
            }

            let handler = Arc::clone(&handler);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                // The permit is held for the duration of the handler call
                let _permit = semaphore.acquire_owned().await.ok();
                let page_id = page.id.clone();
                let title = page.title.clone();
                let outcome = AssertUnwindSafe(handler.handle(page))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| Err(anyhow::anyhow!("page handler panicked")));
                PageResult {
                    page_id,
                    title,
                    outcome,
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            record_result(&mut report, joined);
        }

        info!(
            visited = report.visited,
            handled = report.handled,
            failed = report.failures.len(),
            "Traversal complete"
        );

        Ok(report)
    }

    /// Pages that look like roots among everything the credentials can see.
    ///
    /// Best-effort: a page counts as a root when its parent is the
    /// workspace or a page that is not itself visible. Pages under blocks
    /// are expected to be reached through their containing page; database
    /// rows are not exported.
    pub async fn discover_roots(&self) -> Result<Vec<PageRecord>, ApiError> {
        let pages = self.api.search_all_pages().await?;
        let visible: HashSet<&str> = pages.iter().map(|p| p.id.as_str()).collect();

        let roots: Vec<PageRecord> = pages
            .iter()
            .filter(|p| match &p.parent {
                Parent::Workspace => true,
                Parent::Page(parent) => !visible.contains(parent.as_str()),
                Parent::Database(_) | Parent::Block(_) => false,
            })
            .cloned()
            .collect();

        if roots.is_empty() && !pages.is_empty() {
            warn!(visible = pages.len(), "No root pages found among visible pages");
        }

        Ok(roots)
    }

    /// Fetch page metadata and its complete block tree
    async fn hydrate(&self, item: &QueueItem) -> Result<PageNode, ApiError> {
        let record = self.api.retrieve_page(&item.id).await?;
        let blocks = self.fetch_block_tree(&record.id).await?;

        let title = match &item.title_hint {
            Some(hint) if record.title == UNTITLED && !hint.trim().is_empty() => hint.clone(),
            _ => record.title,
        };

        Ok(PageNode::new(record.id, title, item.path.clone(), blocks))
    }

    /// Fetch a block tree breadth-first with an explicit work list.
    ///
    /// Each entry is the index path of a block whose children still need
    /// fetching, so nesting depth never grows the call stack.
    pub async fn fetch_block_tree(&self, root_id: &str) -> Result<Vec<Block>, ApiError> {
        let mut blocks = self.api.list_all_children(root_id).await?;
        let mut pending: VecDeque<Vec<usize>> = blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.needs_children())
            .map(|(i, _)| vec![i])
            .collect();

        while let Some(index_path) = pending.pop_front() {
            let Some(block_id) = block_at_mut(&mut blocks, &index_path).map(|b| b.id.clone()) else {
                continue;
            };

            let children = self.api.list_all_children(&block_id).await?;
            for (i, child) in children.iter().enumerate() {
                if child.needs_children() {
                    let mut child_path = index_path.clone();
                    child_path.push(i);
                    pending.push_back(child_path);
                }
            }

            if let Some(block) = block_at_mut(&mut blocks, &index_path) {
                block.children = children;
            }
        }

        Ok(blocks)
    }
}

/// Outcome of one handler task
struct PageResult {
    page_id: String,
    title: String,
    outcome: Result<()>,
}

fn record_result(report: &mut TraversalReport, joined: Result<PageResult, JoinError>) {
    match joined {
        Ok(PageResult {
            outcome: Ok(()), ..
        }) => report.handled += 1,
        Ok(PageResult {
            page_id,
            title,
            outcome: Err(e),
        }) => {
            error!(%page_id, %title, error = %format!("{:#}", e), "Page export failed");
            report.failures.push(PageFailure {
                page_id,
                title: Some(title),
                reason: format!("{:#}", e),
            });
        }
        Err(e) => {
            error!(error = %e, "Page task failed to complete");
            report.failures.push(PageFailure {
                page_id: String::new(),
                title: None,
                reason: e.to_string(),
            });
        }
    }
}

fn block_at_mut<'a>(blocks: &'a mut [Block], index_path: &[usize]) -> Option<&'a mut Block> {
    let (first, rest) = index_path.split_first()?;
    let mut current = blocks.get_mut(*first)?;
    for &i in rest {
        current = current.children.get_mut(i)?;
    }
    Some(current)
}
