//! HTTP client for the Notion REST API.
//!
//! Every call goes through the client's `RetryPolicy`; ids are normalized
//! before they are placed in a URL.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use crate::domain::{Block, PageRecord};

use super::ids::normalize_id;
use super::records::{parse_block_list, parse_page, parse_page_list};
use super::retry::RetryPolicy;
use super::{ApiError, NotionApi, Paginated};

/// Production API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";

/// API version header sent with every request
pub const NOTION_VERSION: &str = "2022-06-28";

/// Page size used for all paginated calls
pub const PAGE_SIZE: u32 = 100;

/// Notion API client
pub struct NotionClient {
    /// Integration token
    token: String,
    /// API root, without trailing slash
    base_url: String,
    /// HTTP client (carries timeout and proxy settings)
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl NotionClient {
    /// Create a client against the production API
    pub fn new(token: impl Into<String>, timeout: Duration, proxy: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("notion-export/", env!("CARGO_PKG_VERSION")));

        if let Some(proxy_url) = proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .with_context(|| format!("Invalid proxy URL: {}", proxy_url))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
            retry: RetryPolicy::default(),
        })
    }

    /// Point the client at a different API root (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build API URL
    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send one request and decode the JSON body, without retry
    async fn send_once(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .query(query);

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(classify_transport)?;
        let status = response.status();

        if !status.is_success() {
            let message = error_message(response.text().await.unwrap_or_default());
            return Err(ApiError::from_status(status.as_u16(), message));
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(e.to_string())
            } else {
                ApiError::Decode(e.to_string())
            }
        })
    }

    /// Send with the retry policy applied
    async fn send(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        query: Vec<(&str, String)>,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let url = self.api_url(path);
        debug!(operation, %url, "API request");

        self.retry
            .run(operation, || {
                self.send_once(method.clone(), &url, &query, body.as_ref())
            })
            .await
    }
}

#[async_trait]
impl NotionApi for NotionClient {
    async fn list_block_children(
        &self,
        id: &str,
        cursor: Option<&str>,
    ) -> Result<Paginated<Block>, ApiError> {
        let id = normalize_id(id);
        let mut query = vec![("page_size", PAGE_SIZE.to_string())];
        if let Some(cursor) = cursor {
            query.push(("start_cursor", cursor.to_string()));
        }

        let value = self
            .send(
                "list_block_children",
                Method::GET,
                &format!("blocks/{}/children", id),
                query,
                None,
            )
            .await?;
        parse_block_list(value)
    }

    async fn retrieve_page(&self, id: &str) -> Result<PageRecord, ApiError> {
        let id = normalize_id(id);
        let value = self
            .send(
                "retrieve_page",
                Method::GET,
                &format!("pages/{}", id),
                Vec::new(),
                None,
            )
            .await?;
        parse_page(value)
    }

    async fn search_pages(&self, cursor: Option<&str>) -> Result<Paginated<PageRecord>, ApiError> {
        let mut body = json!({
            "filter": { "property": "object", "value": "page" },
            "page_size": PAGE_SIZE,
        });
        if let Some(cursor) = cursor {
            body["start_cursor"] = Value::String(cursor.to_string());
        }

        let value = self
            .send("search_pages", Method::POST, "search", Vec::new(), Some(body))
            .await?;
        parse_page_list(value)
    }
}

/// Map a transport failure to a retryable or permanent error
fn classify_transport(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout(e.to_string())
    } else if e.is_connect() || e.is_request() {
        // Connection refused/reset and DNS failures surface here
        ApiError::Network(e.to_string())
    } else if let Some(status) = e.status() {
        ApiError::from_status(status.as_u16(), e.to_string())
    } else if e.is_builder() {
        ApiError::BadRequest {
            status: StatusCode::BAD_REQUEST.as_u16(),
            message: e.to_string(),
        }
    } else {
        ApiError::Network(e.to_string())
    }
}

/// Pull the `message` field out of an API error body when present
fn error_message(body: String) -> String {
    serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body)
}
