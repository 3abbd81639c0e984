//! Normalization of raw API JSON into domain records.
//!
//! Every id leaving this module is in canonical form. Unknown or
//! malformed block payloads degrade to `BlockKind::Unsupported` instead
//! of failing the whole listing.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::{plain_text, Annotations, Block, BlockKind, Media, PageRecord, Parent, RichText, UNTITLED};

use super::ids::normalize_id;
use super::{ApiError, Paginated};

/// Raw list envelope shared by children listings and search
#[derive(Debug, Deserialize)]
pub struct RawList {
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

impl RawList {
    fn cursor(&self) -> Option<String> {
        if self.has_more {
            self.next_cursor.clone().filter(|c| !c.is_empty())
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    id: String,
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    has_children: bool,
    #[serde(flatten)]
    payloads: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRichText {
    #[serde(default)]
    plain_text: String,
    #[serde(default)]
    annotations: Annotations,
    #[serde(default)]
    href: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    text: Option<RawTextContent>,
    #[serde(default)]
    equation: Option<RawEquation>,
}

#[derive(Debug, Deserialize)]
struct RawTextContent {
    #[serde(default)]
    link: Option<RawLink>,
}

#[derive(Debug, Deserialize)]
struct RawLink {
    url: String,
}

#[derive(Debug, Deserialize)]
struct RawEquation {
    expression: String,
}

#[derive(Debug, Default, Deserialize)]
struct TextPayload {
    #[serde(default)]
    rich_text: Vec<RawRichText>,
    #[serde(default)]
    is_toggleable: bool,
    #[serde(default)]
    checked: bool,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    caption: Vec<RawRichText>,
    #[serde(default)]
    icon: Option<RawIcon>,
}

#[derive(Debug, Deserialize)]
struct RawIcon {
    #[serde(default)]
    emoji: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MediaPayload {
    #[serde(default)]
    file: Option<RawUrl>,
    #[serde(default)]
    external: Option<RawUrl>,
    #[serde(default)]
    caption: Vec<RawRichText>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUrl {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LinkPayload {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    caption: Vec<RawRichText>,
    #[serde(default)]
    page_id: Option<String>,
    #[serde(default)]
    database_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    expression: Option<String>,
    #[serde(default)]
    has_column_header: bool,
    #[serde(default)]
    cells: Vec<Vec<RawRichText>>,
}

#[derive(Debug, Deserialize)]
struct RawPage {
    id: String,
    #[serde(default)]
    parent: Option<RawParent>,
    #[serde(default)]
    properties: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawParent {
    #[serde(rename = "type")]
    parent_type: String,
    #[serde(default)]
    page_id: Option<String>,
    #[serde(default)]
    database_id: Option<String>,
    #[serde(default)]
    block_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawProperty {
    #[serde(rename = "type")]
    property_type: String,
    #[serde(default)]
    title: Vec<RawRichText>,
}

/// Decode a children listing into blocks
pub fn parse_block_list(value: Value) -> Result<Paginated<Block>, ApiError> {
    let list: RawList = decode(value)?;
    let next_cursor = list.cursor();
    let results = list
        .results
        .into_iter()
        .map(parse_block)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Paginated {
        results,
        next_cursor,
    })
}

/// Decode a search listing into page records, ignoring non-page objects
pub fn parse_page_list(value: Value) -> Result<Paginated<PageRecord>, ApiError> {
    let list: RawList = decode(value)?;
    let next_cursor = list.cursor();
    let results = list
        .results
        .into_iter()
        .filter(|v| v.get("object").and_then(Value::as_str).unwrap_or("page") == "page")
        .map(parse_page)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Paginated {
        results,
        next_cursor,
    })
}

/// Decode a retrieved page
pub fn parse_page(value: Value) -> Result<PageRecord, ApiError> {
    let raw: RawPage = decode(value)?;

    let parent = match raw.parent {
        Some(p) => match p.parent_type.as_str() {
            "page_id" => p.page_id.map(|id| Parent::Page(normalize_id(&id))),
            "database_id" => p.database_id.map(|id| Parent::Database(normalize_id(&id))),
            "block_id" => p.block_id.map(|id| Parent::Block(normalize_id(&id))),
            _ => None,
        }
        .unwrap_or(Parent::Workspace),
        None => Parent::Workspace,
    };

    Ok(PageRecord {
        id: normalize_id(&raw.id),
        title: extract_title(&raw.properties),
        parent,
    })
}

/// Find the single title-typed property and concatenate its plain text
fn extract_title(properties: &Map<String, Value>) -> String {
    let title = properties
        .values()
        .filter_map(|v| serde_json::from_value::<RawProperty>(v.clone()).ok())
        .find(|p| p.property_type == "title")
        .map(|p| plain_text(&convert_rich_text(p.title)))
        .unwrap_or_default();

    if title.trim().is_empty() {
        UNTITLED.to_string()
    } else {
        title
    }
}

fn parse_block(value: Value) -> Result<Block, ApiError> {
    let mut raw: RawBlock = decode(value)?;
    let payload = raw.payloads.remove(&raw.block_type).unwrap_or(Value::Null);

    let (kind, rich_text) = match block_kind(&raw.block_type, payload) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(block_id = %raw.id, block_type = %raw.block_type, error = %e, "Unreadable block payload");
            (
                BlockKind::Unsupported {
                    block_type: raw.block_type.clone(),
                },
                Vec::new(),
            )
        }
    };

    Ok(Block {
        id: normalize_id(&raw.id),
        has_children: raw.has_children,
        children: Vec::new(),
        rich_text,
        kind,
    })
}

/// Map a block type name and its payload to a `BlockKind`
fn block_kind(
    block_type: &str,
    payload: Value,
) -> Result<(BlockKind, Vec<RichText>), serde_json::Error> {
    let kind = match block_type {
        "paragraph" | "heading_1" | "heading_2" | "heading_3" | "bulleted_list_item"
        | "numbered_list_item" | "to_do" | "quote" | "code" | "callout" | "toggle" => {
            let text: TextPayload = from_payload(payload)?;
            let rich_text = convert_rich_text(text.rich_text);
            let kind = match block_type {
                "paragraph" => BlockKind::Paragraph,
                "heading_1" => BlockKind::Heading { level: 1, toggleable: text.is_toggleable },
                "heading_2" => BlockKind::Heading { level: 2, toggleable: text.is_toggleable },
                "heading_3" => BlockKind::Heading { level: 3, toggleable: text.is_toggleable },
                "bulleted_list_item" => BlockKind::BulletedListItem,
                "numbered_list_item" => BlockKind::NumberedListItem,
                "to_do" => BlockKind::ToDo { checked: text.checked },
                "quote" => BlockKind::Quote,
                "code" => BlockKind::Code {
                    language: text.language.unwrap_or_default(),
                    caption: convert_rich_text(text.caption),
                },
                "callout" => BlockKind::Callout {
                    icon: text.icon.and_then(|i| i.emoji),
                },
                _ => BlockKind::Toggle,
            };
            return Ok((kind, rich_text));
        }
        "image" | "file" | "pdf" | "audio" | "video" => {
            let media: MediaPayload = from_payload(payload)?;
            let media = Media {
                file_url: media.file.and_then(|f| f.url),
                external_url: media.external.and_then(|e| e.url),
                caption: convert_rich_text(media.caption),
                name: media.name,
            };
            match block_type {
                "image" => BlockKind::Image(media),
                "file" => BlockKind::File(media),
                "pdf" => BlockKind::Pdf(media),
                "audio" => BlockKind::Audio(media),
                _ => BlockKind::Video(media),
            }
        }
        "bookmark" => {
            let link: LinkPayload = from_payload(payload)?;
            BlockKind::Bookmark {
                url: link.url,
                caption: convert_rich_text(link.caption),
            }
        }
        "embed" => BlockKind::Embed {
            url: from_payload::<LinkPayload>(payload)?.url,
        },
        "link_preview" => BlockKind::LinkPreview {
            url: from_payload::<LinkPayload>(payload)?.url,
        },
        "link_to_page" => {
            let link: LinkPayload = from_payload(payload)?;
            BlockKind::LinkToPage {
                target: link.page_id.or(link.database_id).map(|id| normalize_id(&id)),
            }
        }
        "child_page" => BlockKind::ChildPage {
            title: from_payload::<LinkPayload>(payload)?.title.unwrap_or_default(),
        },
        "child_database" => BlockKind::ChildDatabase {
            title: from_payload::<LinkPayload>(payload)?.title.unwrap_or_default(),
        },
        "equation" => BlockKind::Equation {
            expression: from_payload::<LinkPayload>(payload)?.expression.unwrap_or_default(),
        },
        "table" => BlockKind::Table {
            has_column_header: from_payload::<LinkPayload>(payload)?.has_column_header,
        },
        "table_row" => BlockKind::TableRow {
            cells: from_payload::<LinkPayload>(payload)?
                .cells
                .into_iter()
                .map(convert_rich_text)
                .collect(),
        },
        "divider" => BlockKind::Divider,
        "column_list" => BlockKind::ColumnList,
        "column" => BlockKind::Column,
        "synced_block" => BlockKind::SyncedBlock,
        "table_of_contents" => BlockKind::TableOfContents,
        "breadcrumb" => BlockKind::Breadcrumb,
        other => BlockKind::Unsupported {
            block_type: other.to_string(),
        },
    };

    Ok((kind, Vec::new()))
}

fn from_payload<T: for<'de> Deserialize<'de> + Default>(payload: Value) -> Result<T, serde_json::Error> {
    if payload.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(payload)
}

fn convert_rich_text(raw: Vec<RawRichText>) -> Vec<RichText> {
    raw.into_iter()
        .map(|r| {
            let link = r.text.and_then(|t| t.link).map(|l| l.url);
            let equation = match r.kind.as_deref() {
                Some("equation") => r.equation.map(|e| e.expression),
                _ => None,
            };
            RichText {
                plain_text: r.plain_text,
                annotations: r.annotations,
                href: r.href.or(link),
                equation,
            }
        })
        .collect()
}

fn decode<T: for<'de> Deserialize<'de>>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_paragraph_with_link() {
        let list = parse_block_list(json!({
            "object": "list",
            "results": [{
                "object": "block",
                "id": "1429989fe8ac4effbc8f57f56486db54",
                "type": "paragraph",
                "has_children": false,
                "paragraph": {
                    "rich_text": [{
                        "type": "text",
                        "text": { "content": "docs", "link": { "url": "https://example.com" } },
                        "annotations": { "bold": true, "italic": false, "strikethrough": false,
                                         "underline": false, "code": false, "color": "default" },
                        "plain_text": "docs",
                        "href": null
                    }]
                }
            }],
            "next_cursor": null,
            "has_more": false
        }))
        .unwrap();

        assert!(list.next_cursor.is_none());
        let block = &list.results[0];
        assert_eq!(block.id, "1429989f-e8ac-4eff-bc8f-57f56486db54");
        assert_eq!(block.kind, BlockKind::Paragraph);
        assert_eq!(block.rich_text[0].href.as_deref(), Some("https://example.com"));
        assert!(block.rich_text[0].annotations.bold);
    }

    #[test]
    fn test_parse_media_and_cursor() {
        let list = parse_block_list(json!({
            "results": [{
                "id": "img", "type": "image", "has_children": false,
                "image": {
                    "type": "file",
                    "file": { "url": "https://s3.example.com/d.png?sig=1", "expiry_time": "2026-01-01T00:00:00Z" },
                    "caption": [{ "type": "text", "plain_text": "Diagram" }]
                }
            }],
            "next_cursor": "abc",
            "has_more": true
        }))
        .unwrap();

        assert_eq!(list.next_cursor.as_deref(), Some("abc"));
        match &list.results[0].kind {
            BlockKind::Image(media) => {
                assert_eq!(media.source_url(), Some("https://s3.example.com/d.png?sig=1"));
                assert_eq!(media.caption_text().as_deref(), Some("Diagram"));
            }
            other => panic!("expected image, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_block_type_is_unsupported() {
        let list = parse_block_list(json!({
            "results": [{ "id": "x", "type": "ai_block", "has_children": false, "ai_block": {} }],
            "has_more": false
        }))
        .unwrap();

        assert_eq!(
            list.results[0].kind,
            BlockKind::Unsupported { block_type: "ai_block".into() }
        );
    }

    #[test]
    fn test_inline_equation() {
        let list = parse_block_list(json!({
            "results": [{
                "id": "eq", "type": "paragraph", "has_children": false,
                "paragraph": { "rich_text": [{
                    "type": "equation",
                    "equation": { "expression": "e=mc^2" },
                    "plain_text": "e=mc^2"
                }]}
            }]
        }))
        .unwrap();

        assert_eq!(list.results[0].rich_text[0].equation.as_deref(), Some("e=mc^2"));
    }

    #[test]
    fn test_page_title_and_parent() {
        let page = parse_page(json!({
            "object": "page",
            "id": "1429989fe8ac4effbc8f57f56486db54",
            "parent": { "type": "page_id", "page_id": "59833787-2cf9-4fdf-8782-e53db20768a5" },
            "properties": {
                "Status": { "id": "a", "type": "select", "select": null },
                "Name": { "id": "title", "type": "title", "title": [
                    { "type": "text", "plain_text": "Team " },
                    { "type": "text", "plain_text": "Notes" }
                ]}
            }
        }))
        .unwrap();

        assert_eq!(page.title, "Team Notes");
        assert_eq!(
            page.parent,
            Parent::Page("59833787-2cf9-4fdf-8782-e53db20768a5".into())
        );
    }

    #[test]
    fn test_page_without_title_uses_fallback() {
        let page = parse_page(json!({
            "id": "abc",
            "parent": { "type": "workspace", "workspace": true },
            "properties": {}
        }))
        .unwrap();

        assert_eq!(page.title, UNTITLED);
        assert_eq!(page.parent, Parent::Workspace);
    }
}
