//! Content blocks and rich text.
//!
//! Blocks form an owned tree: every block exclusively owns its children.
//! The set of block kinds is closed; anything the exporter does not know
//! about is kept as `BlockKind::Unsupported` so rendering can skip it.

use serde::{Deserialize, Serialize};

/// One unit of structured content within a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Canonical block id
    pub id: String,

    /// Whether the API reported nested blocks under this one
    pub has_children: bool,

    /// Nested blocks (populated during hydration)
    #[serde(default)]
    pub children: Vec<Block>,

    /// Rich text owned by text-bearing kinds (paragraphs, headings, list items, ...)
    #[serde(default)]
    pub rich_text: Vec<RichText>,

    /// Type-specific payload
    pub kind: BlockKind,
}

impl Block {
    /// Create a block without children
    pub fn new(id: impl Into<String>, kind: BlockKind) -> Self {
        Self {
            id: id.into(),
            has_children: false,
            children: Vec::new(),
            rich_text: Vec::new(),
            kind,
        }
    }

    /// Attach rich text
    pub fn with_text(mut self, rich_text: Vec<RichText>) -> Self {
        self.rich_text = rich_text;
        self
    }

    /// Attach already-hydrated children
    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.has_children = !children.is_empty();
        self.children = children;
        self
    }

    /// Whether hydration should fetch this block's children.
    ///
    /// Child pages and child databases are separate objects; their content
    /// is never inlined into the parent's tree.
    pub fn needs_children(&self) -> bool {
        self.has_children
            && !matches!(
                self.kind,
                BlockKind::ChildPage { .. } | BlockKind::ChildDatabase { .. }
            )
    }

    /// Concatenated plain text of this block's rich text
    pub fn plain_text(&self) -> String {
        plain_text(&self.rich_text)
    }
}

/// Type-specific block payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph,
    Heading { level: u8, toggleable: bool },
    BulletedListItem,
    NumberedListItem,
    ToDo { checked: bool },
    Quote,
    Code { language: String, caption: Vec<RichText> },
    Callout { icon: Option<String> },
    Toggle,
    Divider,
    Equation { expression: String },
    Image(Media),
    File(Media),
    Pdf(Media),
    Audio(Media),
    Video(Media),
    Bookmark { url: Option<String>, caption: Vec<RichText> },
    Embed { url: Option<String> },
    LinkPreview { url: Option<String> },
    LinkToPage { target: Option<String> },
    ChildPage { title: String },
    ChildDatabase { title: String },
    Table { has_column_header: bool },
    TableRow { cells: Vec<Vec<RichText>> },
    ColumnList,
    Column,
    SyncedBlock,
    TableOfContents,
    Breadcrumb,
    Unsupported { block_type: String },
}

impl BlockKind {
    /// The media payload and asset kind, if this is a media block
    pub fn media(&self) -> Option<(&Media, MediaKind)> {
        match self {
            BlockKind::Image(m) => Some((m, MediaKind::Image)),
            BlockKind::File(m) => Some((m, MediaKind::File)),
            BlockKind::Pdf(m) => Some((m, MediaKind::Pdf)),
            BlockKind::Audio(m) => Some((m, MediaKind::Audio)),
            BlockKind::Video(m) => Some((m, MediaKind::Video)),
            _ => None,
        }
    }
}

/// Payload shared by image/file/pdf/audio/video blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Media {
    /// Notion-hosted, time-limited URL
    pub file_url: Option<String>,

    /// Externally hosted URL
    pub external_url: Option<String>,

    #[serde(default)]
    pub caption: Vec<RichText>,

    /// Original file name, when the API reports one
    pub name: Option<String>,
}

impl Media {
    /// Source URL, preferring the Notion-hosted file over the external one
    pub fn source_url(&self) -> Option<&str> {
        self.file_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| self.external_url.as_deref().filter(|u| !u.trim().is_empty()))
    }

    /// Caption as plain text, `None` when empty
    pub fn caption_text(&self) -> Option<String> {
        let text = plain_text(&self.caption);
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

/// Kind of binary resource a media block references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    File,
    Pdf,
    Audio,
    Video,
    External,
}

impl MediaKind {
    /// Extension used when the source URL has no recognizable suffix
    pub fn default_extension(&self) -> &'static str {
        match self {
            MediaKind::Image => "png",
            MediaKind::Audio => "mp3",
            MediaKind::Video => "mp4",
            MediaKind::Pdf => "pdf",
            MediaKind::File | MediaKind::External => "bin",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MediaKind::Image => "image",
            MediaKind::File => "file",
            MediaKind::Pdf => "pdf",
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::External => "external",
        };
        f.write_str(name)
    }
}

/// One run of formatted text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichText {
    pub plain_text: String,

    #[serde(default)]
    pub annotations: Annotations,

    /// Hyperlink target
    pub href: Option<String>,

    /// Inline equation expression (replaces `plain_text` when present)
    pub equation: Option<String>,
}

impl RichText {
    /// Unformatted text segment
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            plain_text: text.into(),
            ..Default::default()
        }
    }
}

/// Formatting flags on a rich text segment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub code: bool,
}

/// Concatenate the plain text of a rich text run
pub fn plain_text(segments: &[RichText]) -> String {
    segments.iter().map(|s| s.plain_text.as_str()).collect()
}
