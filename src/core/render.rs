//! Block tree → Markdown rendering.
//!
//! Pure string accumulation: no I/O happens here. Media blocks produce
//! `AssetPlan`s that the downloader and writer consume afterwards.
//!
//! Dispatch is a single `match` over `BlockKind`, one function per kind.

use tracing::debug;

use crate::domain::{plain_text, AssetPlan, Block, BlockKind, Media, MediaKind, PageNode, RichText, UNTITLED};

use super::assets::AssetPlanner;
use super::rich_text::render_rich_text;

/// Base URL for links to pages that are not part of the export
pub const NOTION_PAGE_BASE: &str = "https://www.notion.so";

/// Result of rendering a page
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Markdown text, ending in exactly one newline
    pub content: String,

    /// Assets referenced by the content, in document order
    pub assets: Vec<AssetPlan>,
}

/// Renders hydrated pages to Markdown
#[derive(Debug, Clone, Default)]
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    /// Render a page: title heading followed by its block tree
    pub fn render_page(&self, page: &PageNode) -> RenderedPage {
        // Leaf pages write their assets into the parent's media folder
        let assets = match &page.placement {
            Some(placement) if !page.owns_directory() => {
                AssetPlanner::with_prefix(placement.asset_prefix.as_str())
            }
            _ => AssetPlanner::new(),
        };

        let mut ctx = RenderContext { assets };
        let body = ctx.render_blocks(&page.blocks);

        let title = if page.title.trim().is_empty() {
            UNTITLED
        } else {
            page.title.trim()
        };

        let mut content = format!("# {}", title);
        if !body.trim().is_empty() {
            content.push_str("\n\n");
            content.push_str(&body);
        }
        let mut content = content.trim_end().to_string();
        content.push('\n');

        RenderedPage {
            content,
            assets: ctx.assets.into_plans(),
        }
    }
}

/// Per-pass rendering state
struct RenderContext {
    assets: AssetPlanner,
}

impl RenderContext {
    /// Render sibling blocks, keeping list items tight
    fn render_blocks(&mut self, blocks: &[Block]) -> String {
        let mut out = String::new();
        let mut number = 0usize;
        let mut previous_was_item = false;

        for block in blocks {
            if matches!(block.kind, BlockKind::NumberedListItem) {
                number += 1;
            } else {
                number = 0;
            }

            let rendered = self.render_block(block, number);
            if rendered.is_empty() {
                continue;
            }

            let is_item = is_list_item(&block.kind);
            if !out.is_empty() {
                out.push_str(if is_item && previous_was_item { "\n" } else { "\n\n" });
            }
            out.push_str(&rendered);
            previous_was_item = is_item;
        }

        out
    }

    fn render_block(&mut self, block: &Block, number: usize) -> String {
        let text = render_rich_text(&block.rich_text);

        match &block.kind {
            BlockKind::Paragraph => self.with_children(text, block),
            BlockKind::Heading { level, .. } => {
                let heading = format!("{} {}", "#".repeat(*level as usize + 1), text.trim());
                self.with_children(heading, block)
            }
            BlockKind::BulletedListItem | BlockKind::Toggle => {
                self.list_item(format!("- {}", text), block, "  ")
            }
            BlockKind::NumberedListItem => {
                let marker = format!("{}. ", number.max(1));
                let indent = " ".repeat(marker.len());
                self.list_item(format!("{}{}", marker, text), block, &indent)
            }
            BlockKind::ToDo { checked } => {
                let mark = if *checked { "x" } else { " " };
                self.list_item(format!("- [{}] {}", mark, text), block, "  ")
            }
            BlockKind::Quote => self.quoted(text, block),
            BlockKind::Callout { icon } => {
                let line = match icon {
                    Some(icon) => format!("{} {}", icon, text),
                    None => text,
                };
                self.quoted(line, block)
            }
            BlockKind::Code { language, caption } => render_code(block, language, caption),
            BlockKind::Divider => "---".to_string(),
            BlockKind::Equation { expression } => render_equation(expression),
            BlockKind::Image(media) => self.render_media(block, media, MediaKind::Image),
            BlockKind::File(media) => self.render_media(block, media, MediaKind::File),
            BlockKind::Pdf(media) => self.render_media(block, media, MediaKind::Pdf),
            BlockKind::Audio(media) => self.render_media(block, media, MediaKind::Audio),
            BlockKind::Video(media) => self.render_media(block, media, MediaKind::Video),
            BlockKind::Bookmark { url, caption } => {
                let label = plain_text(caption);
                render_link(url.as_deref(), Some(label.trim()))
            }
            BlockKind::Embed { url } | BlockKind::LinkPreview { url } => {
                render_link(url.as_deref(), None)
            }
            BlockKind::LinkToPage { target } => {
                let url = target
                    .as_deref()
                    .map(|id| format!("{}/{}", NOTION_PAGE_BASE, id.replace('-', "")));
                render_link(url.as_deref(), Some("Linked page"))
            }
            BlockKind::ChildPage { title } => render_child_page(title),
            BlockKind::ChildDatabase { title } => render_child_database(title),
            BlockKind::Table { has_column_header } => render_table(block, *has_column_header),
            BlockKind::TableRow { cells } => table_row(cells),
            BlockKind::ColumnList | BlockKind::Column | BlockKind::SyncedBlock => {
                self.render_blocks(&block.children)
            }
            BlockKind::TableOfContents | BlockKind::Breadcrumb => String::new(),
            BlockKind::Unsupported { block_type } => {
                debug!(block_id = %block.id, %block_type, "Skipping unsupported block");
                String::new()
            }
        }
    }

    /// Block text followed by its children at the same level
    fn with_children(&mut self, head: String, block: &Block) -> String {
        let children = self.render_blocks(&block.children);
        join_nonempty(&[head.trim_end(), children.as_str()], "\n\n")
    }

    /// List item with children indented under it
    fn list_item(&mut self, head: String, block: &Block, indent: &str) -> String {
        let children = self.render_blocks(&block.children);
        if children.is_empty() {
            return head.trim_end().to_string();
        }
        format!("{}\n{}", head.trim_end(), indent_lines(&children, indent))
    }

    /// Text and children inside a block quote
    fn quoted(&mut self, head: String, block: &Block) -> String {
        let children = self.render_blocks(&block.children);
        let inner = join_nonempty(&[head.trim_end(), children.as_str()], "\n\n");
        if inner.is_empty() {
            return String::new();
        }
        inner
            .lines()
            .map(|line| {
                if line.is_empty() {
                    ">".to_string()
                } else {
                    format!("> {}", line)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render_media(&mut self, block: &Block, media: &Media, kind: MediaKind) -> String {
        let Some(url) = media.source_url() else {
            debug!(block_id = %block.id, %kind, "Media block without a URL");
            return String::new();
        };

        let caption = media.caption_text();
        let plan = self.assets.plan(&block.id, url, kind, caption.as_deref());
        let target = plan.markdown_ref();

        match kind {
            MediaKind::Image => format!("![{}]({})", caption.unwrap_or_default(), target),
            _ => {
                let label = caption
                    .or_else(|| media.name.clone().filter(|n| !n.trim().is_empty()))
                    .unwrap_or_else(|| target.clone());
                format!("[{}]({})", label, target)
            }
        }
    }
}

fn is_list_item(kind: &BlockKind) -> bool {
    matches!(
        kind,
        BlockKind::BulletedListItem
            | BlockKind::NumberedListItem
            | BlockKind::ToDo { .. }
            | BlockKind::Toggle
    )
}

fn render_code(block: &Block, language: &str, caption: &[RichText]) -> String {
    let code = block.plain_text();
    let longest_run = code
        .split(|c: char| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run.max(2) + 1);
    let language = if language == "plain text" { "" } else { language };

    let mut out = format!("{}{}\n{}\n{}", fence, language, code.trim_end_matches('\n'), fence);
    let caption = render_rich_text(caption);
    if !caption.trim().is_empty() {
        out.push_str("\n\n");
        out.push_str(caption.trim());
    }
    out
}

fn render_equation(expression: &str) -> String {
    let expression = expression.trim();
    if expression.is_empty() {
        return String::new();
    }
    format!("$$\n{}\n$$", expression)
}

fn render_link(url: Option<&str>, label: Option<&str>) -> String {
    let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
        return String::new();
    };
    let label = label.filter(|l| !l.is_empty()).unwrap_or(url);
    format!("[{}]({})", label, url)
}

fn render_child_page(title: &str) -> String {
    let title = title.trim();
    format!("📄 {}", if title.is_empty() { UNTITLED } else { title })
}

fn render_child_database(title: &str) -> String {
    let title = title.trim();
    format!(
        "> Database \"{}\" was not exported: database export is not supported.",
        if title.is_empty() { UNTITLED } else { title }
    )
}

fn render_table(block: &Block, has_column_header: bool) -> String {
    let rows: Vec<&Vec<Vec<RichText>>> = block
        .children
        .iter()
        .filter_map(|row| match &row.kind {
            BlockKind::TableRow { cells } => Some(cells),
            _ => None,
        })
        .collect();

    let Some(first) = rows.first() else {
        return String::new();
    };
    let width = rows.iter().map(|r| r.len()).max().unwrap_or(0).max(1);

    let mut lines = Vec::with_capacity(rows.len() + 2);
    let body_rows = if has_column_header {
        lines.push(table_line(first, width));
        &rows[1..]
    } else {
        // Markdown tables need a header row
        lines.push(table_line(&[], width));
        &rows[..]
    };
    lines.push(format!("|{}", " --- |".repeat(width)));
    for row in body_rows {
        lines.push(table_line(row, width));
    }

    lines.join("\n")
}

fn table_row(cells: &[Vec<RichText>]) -> String {
    table_line(cells, cells.len().max(1))
}

fn table_line(cells: &[Vec<RichText>], width: usize) -> String {
    let mut line = String::from("|");
    for i in 0..width {
        let cell = cells
            .get(i)
            .map(|c| render_rich_text(c).replace('|', "\\|").replace('\n', " "))
            .unwrap_or_default();
        line.push(' ');
        line.push_str(cell.trim());
        line.push_str(" |");
    }
    line
}

fn indent_lines(text: &str, indent: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", indent, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn join_nonempty(parts: &[&str], separator: &str) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(separator)
}
