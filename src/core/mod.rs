//! Core export logic.
//!
//! This module contains:
//! - Traversal: breadth-first walk with a bounded handler pool
//! - Paths: placement of pages on disk
//! - Render: block tree to Markdown
//! - Assets/Download: asset naming and fetching
//! - Writer: persisting pages honoring force and dry-run
//! - Exporter: the run that ties them together

pub mod assets;
pub mod download;
pub mod exporter;
pub mod paths;
pub mod render;
pub mod rich_text;
pub mod traversal;
pub mod writer;

// Re-export commonly used types
pub use assets::AssetPlanner;
pub use download::{AssetDownloader, DownloadError};
pub use exporter::Exporter;
pub use paths::{sanitize_segment, PageLocation, PathPlanner, SiblingNames};
pub use render::{RenderedPage, Renderer};
pub use rich_text::render_rich_text;
pub use traversal::{PageHandler, TraversalReport, Traverser};
pub use writer::{OutputWriter, WriteOutcome};
