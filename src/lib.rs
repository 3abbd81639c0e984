//! notion-export - Export a Notion page tree to Markdown
//!
//! Walks a page tree breadth-first through the Notion REST API and writes
//! each page as a Markdown file, with its images and files downloaded
//! next to it.
//!
//! # Output layout
//!
//! - Root pages and pages with sub-pages own a directory:
//!   `<Title>/<Title>.md` with assets in `<Title>/media/`
//! - Leaf pages are written into their parent's directory:
//!   `<Parent>/<Title>.md` with assets in `<Parent>/media/`
//!
//! # Modules
//!
//! - `adapters`: Notion API client, response decoding, retry
//! - `core`: traversal, rendering, asset handling, writing
//! - `domain`: data structures (PageNode, Block, AssetPlan, RunSummary)
//! - `config`: layered configuration
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Export one page tree
//! NOTION_TOKEN=secret_... notion-export export --root <page-id-or-url> --out notes
//!
//! # See what would be written
//! notion-export export --root <page-id> --dry-run
//!
//! # List pages an export without --root would start from
//! notion-export roots
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{ApiError, NotionApi, NotionClient, RetryPolicy};
pub use config::ExportConfig;
pub use core::{Exporter, PageHandler, Traverser};
pub use domain::{Block, BlockKind, PageNode, RunSummary};
