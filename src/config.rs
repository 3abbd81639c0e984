//! Configuration for an export run.
//!
//! Configuration sources (highest priority first):
//! 1. Command-line flags
//! 2. Environment variables (NOTION_TOKEN, NOTION_ROOT_PAGE_ID, NOTION_EXPORT_OUT_DIR)
//! 3. Config file (.notion-export/config.yaml)
//! 4. Defaults
//!
//! Flags and environment variables are merged by clap before they reach
//! this module, so both arrive as `Overrides`.
//!
//! Config file discovery:
//! - `--config <path>` wins when given
//! - Otherwise searches the current directory and parents for .notion-export/config.yaml
//! - Then falls back to the user config directory (e.g. ~/.config/notion-export/config.yaml)
//! - `out_dir` in the config file is relative to the project root (the
//!   directory holding .notion-export/)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::adapters::RetryPolicy;

/// Directory holding the config file
pub const CONFIG_DIR: &str = ".notion-export";

/// Subdirectory of the user config directory
pub const USER_CONFIG_DIR: &str = "notion-export";

pub const CONFIG_FILE_NAME: &str = "config.yaml";

pub const DEFAULT_OUT_DIR: &str = "export";
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 8;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub token: Option<String>,
    pub root_page_id: Option<String>,
    /// Output directory (relative to the project root)
    pub out_dir: Option<String>,
    pub concurrency: Option<usize>,
    pub download_concurrency: Option<usize>,
    pub proxy: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub force: Option<bool>,
    /// Backoff for transient API failures
    pub retry: Option<RetryPolicy>,
}

/// Values from flags and environment variables
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub token: Option<String>,
    pub root_page_id: Option<String>,
    pub out_dir: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub download_concurrency: Option<usize>,
    pub proxy: Option<String>,
    pub force: bool,
    pub dry_run: bool,
}

/// Resolved, immutable configuration for one run
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Integration token; may be empty until validated
    pub token: String,
    /// Page to start from; discovered roots are used when absent
    pub root_page_id: Option<String>,
    pub out_dir: PathBuf,
    /// Concurrent page handlers
    pub concurrency: usize,
    /// Concurrent asset downloads per page
    pub download_concurrency: usize,
    pub force: bool,
    pub dry_run: bool,
    pub proxy: Option<String>,
    /// Per-request timeout
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    /// Path to config file (if one was used)
    pub config_file: Option<PathBuf>,
}

impl ExportConfig {
    /// Load configuration, discovering the config file unless one is given
    pub fn load(explicit: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => std::env::current_dir()
                .ok()
                .and_then(|cwd| find_config_file(&cwd))
                .or_else(user_config_file),
        };

        match config_path {
            Some(path) => {
                let file = load_config_file(&path)?;
                Ok(Self::resolve(overrides, Some((&path, file))))
            }
            None => Ok(Self::resolve(overrides, None)),
        }
    }

    /// Merge overrides over an optional config file over defaults
    pub fn resolve(overrides: Overrides, file: Option<(&Path, ConfigFile)>) -> Self {
        let (config_file, file) = match file {
            Some((path, file)) => (Some(path.to_path_buf()), file),
            None => (None, ConfigFile::default()),
        };

        let out_dir = match (overrides.out_dir, &file.out_dir, &config_file) {
            (Some(dir), _, _) => dir,
            (None, Some(dir), path) => match path.as_deref().and_then(project_root) {
                Some(root) => resolve_path(root, dir),
                None => PathBuf::from(dir),
            },
            (None, None, _) => PathBuf::from(DEFAULT_OUT_DIR),
        };

        Self {
            token: overrides
                .token
                .or(file.token)
                .map(|t| t.trim().to_string())
                .unwrap_or_default(),
            root_page_id: overrides
                .root_page_id
                .or(file.root_page_id)
                .filter(|id| !id.trim().is_empty()),
            out_dir,
            concurrency: overrides
                .concurrency
                .or(file.concurrency)
                .unwrap_or(DEFAULT_CONCURRENCY),
            download_concurrency: overrides
                .download_concurrency
                .or(file.download_concurrency)
                .unwrap_or(DEFAULT_DOWNLOAD_CONCURRENCY),
            force: overrides.force || file.force.unwrap_or(false),
            dry_run: overrides.dry_run,
            proxy: overrides.proxy.or(file.proxy).filter(|p| !p.trim().is_empty()),
            request_timeout: Duration::from_secs(
                file.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            retry: file.retry.unwrap_or_default(),
            config_file,
        }
    }

    /// Check the settings a run needs
    pub fn validate(&self) -> Result<()> {
        if self.token.is_empty() {
            bail!(
                "No Notion token configured: pass --token, set NOTION_TOKEN, or add `token` to {}/{}",
                CONFIG_DIR,
                CONFIG_FILE_NAME
            );
        }
        if self.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        if self.download_concurrency == 0 {
            bail!("download_concurrency must be at least 1");
        }
        if self.request_timeout.is_zero() {
            bail!("timeout_seconds must be at least 1");
        }
        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        Ok(())
    }

    /// Token suitable for display
    pub fn redacted_token(&self) -> String {
        redact(&self.token)
    }
}

/// Find config file by searching `start` and its parents
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Per-user config file, if present
fn user_config_file() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join(USER_CONFIG_DIR).join(CONFIG_FILE_NAME);
    path.exists().then_some(path)
}

/// Load and parse config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Directory holding .notion-export/ (grandparent of config.yaml).
///
/// Files outside a .notion-export/ directory have no project root.
fn project_root(config_path: &Path) -> Option<&Path> {
    let dir = config_path.parent()?;
    if dir.file_name()? == CONFIG_DIR {
        dir.parent()
    } else {
        None
    }
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn redact(token: &str) -> String {
    if token.is_empty() {
        return "(not set)".to_string();
    }
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() <= 8 {
        "********".to_string()
    } else {
        format!("{}********", visible)
    }
}
