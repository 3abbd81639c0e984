//! Domain types for the exporter.
//!
//! This module contains the core data structures:
//! - Page: page metadata and hydrated page nodes
//! - Block: the closed set of content blocks and rich text
//! - Asset: asset plans and downloaded assets
//! - Summary: run statistics

pub mod asset;
pub mod block;
pub mod page;
pub mod summary;

// Re-export commonly used types
pub use asset::{AssetDescriptor, AssetPlan, MEDIA_DIR};
pub use block::{plain_text, Annotations, Block, BlockKind, Media, MediaKind, RichText};
pub use page::{ChildPageRef, PageNode, PageRecord, Parent, Placement, UNTITLED};
pub use summary::{PageFailure, RunSummary};
