//! Shared helpers for integration tests: an in-memory page tree.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use notion_export::adapters::{normalize_id, Paginated};
use notion_export::domain::{Block, BlockKind, PageRecord, Parent, RichText};
use notion_export::{ApiError, NotionApi};

/// Canonical page id built from a small number
pub fn page_id(n: u32) -> String {
    normalize_id(&format!("{:032x}", n))
}

pub fn paragraph(id: &str, text: &str) -> Block {
    Block::new(id, BlockKind::Paragraph).with_text(vec![RichText::plain(text)])
}

pub fn child_page(id: &str, title: &str) -> Block {
    Block::new(id, BlockKind::ChildPage { title: title.into() })
}

/// In-memory `NotionApi` with optional per-page failures
#[derive(Default)]
pub struct FakeNotion {
    pages: HashMap<String, PageRecord>,
    children: HashMap<String, Vec<Block>>,
    failing: HashSet<String>,
    page_size: Option<usize>,
    retrieved: Mutex<Vec<String>>,
}

impl FakeNotion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page with its top-level blocks
    pub fn page(mut self, id: &str, title: &str, parent: Parent, blocks: Vec<Block>) -> Self {
        let id = normalize_id(id);
        self.pages.insert(
            id.clone(),
            PageRecord {
                id: id.clone(),
                title: title.into(),
                parent,
            },
        );
        self.children.insert(id, blocks);
        self
    }

    /// Children of a non-page block
    pub fn block_children(mut self, block_id: &str, blocks: Vec<Block>) -> Self {
        self.children.insert(normalize_id(block_id), blocks);
        self
    }

    /// Make every call for this page fail with NotFound
    pub fn failing(mut self, id: &str) -> Self {
        self.failing.insert(normalize_id(id));
        self
    }

    /// Split children listings into pages of `size`
    pub fn paginated(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Ids passed to `retrieve_page`, in call order
    pub fn retrieved(&self) -> Vec<String> {
        self.retrieved.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotionApi for FakeNotion {
    async fn list_block_children(
        &self,
        id: &str,
        cursor: Option<&str>,
    ) -> Result<Paginated<Block>, ApiError> {
        let id = normalize_id(id);
        if self.failing.contains(&id) {
            return Err(ApiError::NotFound(id));
        }

        let all = self.children.get(&id).cloned().unwrap_or_default();
        let Some(size) = self.page_size else {
            return Ok(Paginated::last(all));
        };

        let start: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
        let end = (start + size).min(all.len());
        Ok(Paginated {
            results: all[start..end].to_vec(),
            next_cursor: (end < all.len()).then(|| end.to_string()),
        })
    }

    async fn retrieve_page(&self, id: &str) -> Result<PageRecord, ApiError> {
        let id = normalize_id(id);
        self.retrieved.lock().unwrap().push(id.clone());
        if self.failing.contains(&id) {
            return Err(ApiError::NotFound(id));
        }
        self.pages.get(&id).cloned().ok_or(ApiError::NotFound(id))
    }

    async fn search_pages(&self, _cursor: Option<&str>) -> Result<Paginated<PageRecord>, ApiError> {
        let mut pages: Vec<PageRecord> = self.pages.values().cloned().collect();
        pages.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(Paginated::last(pages))
    }
}

/// A block that reports children the fake will serve separately
pub fn parent_block(id: &str, kind: BlockKind) -> Block {
    let mut block = Block::new(id, kind);
    block.has_children = true;
    block
}
