//! Adapter interfaces for the remote document API.
//!
//! The exporter depends on the `NotionApi` trait, never on HTTP details.
//! `NotionClient` is the production implementation; tests substitute an
//! in-memory fake.

pub mod ids;
pub mod notion;
pub mod records;
pub mod retry;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Block, PageRecord};

pub use ids::{normalize_id, parse_page_id, IdError};
pub use notion::NotionClient;
pub use retry::RetryPolicy;

/// One page of a cursor-paginated listing
#[derive(Debug, Clone)]
pub struct Paginated<T> {
    pub results: Vec<T>,

    /// Cursor for the next page, present only when more results exist
    pub next_cursor: Option<String>,
}

impl<T> Paginated<T> {
    /// A final page with no continuation
    pub fn last(results: Vec<T>) -> Self {
        Self {
            results,
            next_cursor: None,
        }
    }
}

/// Errors returned by the remote API
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Rate limited by the API")]
    RateLimited,

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Request rejected with status {status}: {message}")]
    BadRequest { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether the failure is transient and worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::RateLimited
                | ApiError::Server { .. }
                | ApiError::Network(_)
                | ApiError::Timeout(_)
        )
    }

    /// Classify an HTTP error status
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 => ApiError::RateLimited,
            401 | 403 => ApiError::Unauthorized(message),
            404 => ApiError::NotFound(message),
            500..=599 => ApiError::Server { status, message },
            _ => ApiError::BadRequest { status, message },
        }
    }
}

/// Read-only access to the remote document tree
#[async_trait]
pub trait NotionApi: Send + Sync {
    /// List one page of a block's (or page's) direct children
    async fn list_block_children(
        &self,
        id: &str,
        cursor: Option<&str>,
    ) -> Result<Paginated<Block>, ApiError>;

    /// Retrieve a page's metadata
    async fn retrieve_page(&self, id: &str) -> Result<PageRecord, ApiError>;

    /// List one page of all pages visible to the credentials
    async fn search_pages(&self, cursor: Option<&str>) -> Result<Paginated<PageRecord>, ApiError>;

    /// List every direct child, following cursors until exhausted
    async fn list_all_children(&self, id: &str) -> Result<Vec<Block>, ApiError> {
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.list_block_children(id, cursor.as_deref()).await?;
            all.extend(page.results);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(all)
    }

    /// Search every accessible page, following cursors until exhausted
    async fn search_all_pages(&self) -> Result<Vec<PageRecord>, ApiError> {
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.search_pages(cursor.as_deref()).await?;
            all.extend(page.results);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(ApiError::from_status(429, ""), ApiError::RateLimited));
        assert!(matches!(ApiError::from_status(503, ""), ApiError::Server { status: 503, .. }));
        assert!(matches!(ApiError::from_status(401, ""), ApiError::Unauthorized(_)));
        assert!(matches!(ApiError::from_status(404, ""), ApiError::NotFound(_)));
        assert!(matches!(ApiError::from_status(400, ""), ApiError::BadRequest { status: 400, .. }));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(ApiError::RateLimited.is_retryable());
        assert!(ApiError::from_status(502, "bad gateway").is_retryable());
        assert!(ApiError::Network("connection reset".into()).is_retryable());
        assert!(ApiError::Timeout("30s".into()).is_retryable());

        assert!(!ApiError::from_status(401, "").is_retryable());
        assert!(!ApiError::from_status(404, "").is_retryable());
        assert!(!ApiError::from_status(400, "").is_retryable());
        assert!(!ApiError::Decode("eof".into()).is_retryable());
    }
}
