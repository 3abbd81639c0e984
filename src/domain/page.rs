//! Pages as seen by the exporter.
//!
//! `PageRecord` is the normalized metadata returned by the API client;
//! `PageNode` is a page after hydration, with its full block tree.

use serde::{Deserialize, Serialize};

use super::block::{Block, BlockKind};

/// Title used when a page has no resolvable title property
pub const UNTITLED: &str = "Untitled";

/// Where a page lives in the workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Parent {
    Workspace,
    Page(String),
    Database(String),
    Block(String),
}

/// Normalized page metadata from a retrieve or search call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Canonical page id
    pub id: String,

    /// Title extracted from the page's title property
    pub title: String,

    pub parent: Parent,
}

/// A child page discovered inside a page's block tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildPageRef {
    pub id: String,
    pub title: String,
}

/// On-disk name of a page, chosen once when its parent is hydrated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Sanitized file and directory name, unique among siblings
    pub name: String,

    /// Asset name prefix, unique among siblings, used while the page
    /// shares its parent's media folder
    pub asset_prefix: String,
}

/// A fully hydrated page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageNode {
    /// Canonical page id
    pub id: String,

    pub title: String,

    /// Ancestor directory names from the export root, exclusive of this page
    pub path: Vec<String>,

    /// Name assigned by the traversal; the sanitized title is used when absent
    #[serde(default)]
    pub placement: Option<Placement>,

    /// Whether at least one child page was found in the block tree
    pub has_child_pages: bool,

    /// Complete block tree
    pub blocks: Vec<Block>,

    /// Child pages in document order
    #[serde(default)]
    pub child_pages: Vec<ChildPageRef>,
}

impl PageNode {
    /// Build a node from hydrated blocks, discovering its child pages
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        path: Vec<String>,
        blocks: Vec<Block>,
    ) -> Self {
        let child_pages = collect_child_pages(&blocks);
        Self {
            id: id.into(),
            title: title.into(),
            path,
            placement: None,
            has_child_pages: !child_pages.is_empty(),
            blocks,
            child_pages,
        }
    }

    /// Attach the name chosen for this page among its siblings
    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = Some(placement);
        self
    }

    /// Whether this page is an export root
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Root pages and pages with children get their own directory
    pub fn owns_directory(&self) -> bool {
        self.is_root() || self.has_child_pages
    }
}

/// Collect child-page blocks anywhere in the tree, in document order.
///
/// Child pages nested under toggles or columns still belong to this page.
pub fn collect_child_pages(blocks: &[Block]) -> Vec<ChildPageRef> {
    let mut found = Vec::new();
    let mut stack: Vec<&Block> = blocks.iter().rev().collect();

    while let Some(block) = stack.pop() {
        if let BlockKind::ChildPage { title } = &block.kind {
            found.push(ChildPageRef {
                id: block.id.clone(),
                title: title.clone(),
            });
            continue;
        }
        stack.extend(block.children.iter().rev());
    }

    found
}
