//! Placement of pages on disk.
//!
//! Root pages and pages with children own a directory named after
//! themselves; leaf pages are written straight into their parent's
//! directory. Resolution is a pure function of the page node.
//!
//! Siblings never share a name: the traversal claims each child's name
//! through `SiblingNames` in discovery order, before any handler runs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::domain::{PageNode, Placement};

use super::assets::asset_base_name;

/// Fallback for an ancestor segment that sanitizes to nothing
pub const UNTITLED_SEGMENT: &str = "Untitled";

/// Fallback for a page's own title that sanitizes to nothing
pub const UNTITLED_PAGE: &str = "Untitled Page";

/// Maximum length of one sanitized segment, in characters
pub const MAX_SEGMENT_CHARS: usize = 120;

/// Extension of rendered pages
pub const MARKDOWN_EXT: &str = "md";

/// Planned on-disk location of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    /// Directory the Markdown file lives in
    pub directory: PathBuf,

    pub file_name: String,

    /// `directory` joined with `file_name`
    pub file_path: PathBuf,
}

/// Maps page nodes to locations under an output root
#[derive(Debug, Clone)]
pub struct PathPlanner {
    out_dir: PathBuf,
}

impl PathPlanner {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// Output root
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Compute where a page is written
    pub fn resolve(&self, page: &PageNode) -> PageLocation {
        let mut directory = self.out_dir.clone();
        for ancestor in &page.path {
            directory.push(sanitize_segment(ancestor, UNTITLED_SEGMENT));
        }

        let title = match &page.placement {
            Some(placement) => sanitize_segment(&placement.name, UNTITLED_PAGE),
            None => sanitize_segment(&page.title, UNTITLED_PAGE),
        };
        if page.owns_directory() {
            directory.push(&title);
        }

        let file_name = format!("{}.{}", title, MARKDOWN_EXT);
        let file_path = directory.join(&file_name);

        PageLocation {
            directory,
            file_name,
            file_path,
        }
    }
}

/// Names handed out to the children of one directory.
///
/// Comparison ignores case so that siblings stay distinct on
/// case-insensitive file systems.
#[derive(Debug, Default)]
pub struct SiblingNames {
    names: HashSet<String>,
    prefixes: HashSet<String>,
}

impl SiblingNames {
    /// Names for the children of a page; the page's own name is taken
    /// since its Markdown file lives in the same directory.
    pub fn under(parent: &str) -> Self {
        let mut siblings = Self::default();
        siblings.names.insert(parent.to_lowercase());
        siblings
    }

    /// Names for export roots, which share the output directory
    pub fn roots() -> Self {
        Self::default()
    }

    /// Claim a name for the next sibling titled `title`.
    ///
    /// The first claim keeps the sanitized title; later ones get `-2`,
    /// `-3`, ... so the result depends only on claim order.
    pub fn claim(&mut self, title: &str) -> Placement {
        let base = sanitize_segment(title, UNTITLED_PAGE);
        let name = claim_unique(&mut self.names, &base, MAX_SEGMENT_CHARS);
        let asset_prefix = claim_unique(&mut self.prefixes, &asset_base_name(&name), usize::MAX);

        Placement { name, asset_prefix }
    }
}

fn claim_unique(taken: &mut HashSet<String>, base: &str, max_chars: usize) -> String {
    if taken.insert(base.to_lowercase()) {
        return base.to_string();
    }

    let mut n = 2u32;
    loop {
        let suffix = format!("-{}", n);
        let room = max_chars.saturating_sub(suffix.len());
        let head: String = base.chars().take(room).collect();
        let candidate = format!("{}{}", trim_segment(&head), suffix);
        if taken.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}

/// Make a title safe to use as one path segment.
///
/// Removes characters illegal on common file systems, collapses
/// whitespace, strips trailing dots and surrounding whitespace, and caps
/// the length. Applying it twice gives the same result as applying it once.
pub fn sanitize_segment(raw: &str, fallback: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !is_illegal(*c))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let trimmed = trim_segment(&cleaned);
    let capped: String = trimmed.chars().take(MAX_SEGMENT_CHARS).collect();
    let result = trim_segment(&capped);

    if result.is_empty() {
        fallback.to_string()
    } else {
        result.to_string()
    }
}

fn is_illegal(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') || c.is_control()
}

fn trim_segment(s: &str) -> &str {
    s.trim_start()
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
}
