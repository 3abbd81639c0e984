//! Asset naming and placement.
//!
//! An `AssetPlanner` lives for one page render pass and hands out unique
//! `media/<name>.<ext>` paths. A leaf page shares its parent's media
//! folder, so its names carry the page's asset prefix: `<prefix>--<name>`.
//! Sanitized base names never contain `--`, which keeps every page's names
//! apart without coordination between concurrently rendered pages.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use url::Url;

use crate::domain::{AssetPlan, MediaKind, MEDIA_DIR};

/// Maximum length of a sanitized asset base name
pub const MAX_ASSET_NAME_CHARS: usize = 60;

/// Base name used when nothing usable remains after sanitization
pub const DEFAULT_ASSET_NAME: &str = "asset";

/// Separator between a page's asset prefix and the asset's own name
pub const PREFIX_SEPARATOR: &str = "--";

const MAX_EXTENSION_CHARS: usize = 5;

/// Plans asset files for one render pass
#[derive(Debug)]
pub struct AssetPlanner {
    prefix: Option<String>,
    names: HashSet<String>,
    by_url: HashMap<String, usize>,
    plans: Vec<AssetPlan>,
}

impl AssetPlanner {
    /// Planner for a page that owns its media folder
    pub fn new() -> Self {
        Self {
            prefix: None,
            names: HashSet::new(),
            by_url: HashMap::new(),
            plans: Vec::new(),
        }
    }

    /// Planner for a page whose media folder is shared with its parent
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Self::new()
        }
    }

    /// Plan an asset for a media block.
    ///
    /// The same URL referenced twice in one pass yields the same plan.
    pub fn plan(
        &mut self,
        block_id: &str,
        url: &str,
        kind: MediaKind,
        caption: Option<&str>,
    ) -> AssetPlan {
        if let Some(&idx) = self.by_url.get(url) {
            return self.plans[idx].clone();
        }

        let mut base = asset_base_name(caption.unwrap_or(block_id));
        if let Some(prefix) = &self.prefix {
            base = format!("{}{}{}", prefix, PREFIX_SEPARATOR, base);
        }
        let ext = extension_from_url(url).unwrap_or_else(|| kind.default_extension().to_string());

        let name = first_free_name(&base, &ext, |candidate| self.names.contains(candidate));
        self.names.insert(name.clone());

        let plan = AssetPlan {
            id: block_id.to_string(),
            original_url: url.to_string(),
            local_path: PathBuf::from(MEDIA_DIR).join(&name),
            kind,
            caption: caption.map(str::to_string),
        };

        self.by_url.insert(url.to_string(), self.plans.len());
        self.plans.push(plan.clone());
        plan
    }

    /// All plans made so far, in document order
    pub fn into_plans(self) -> Vec<AssetPlan> {
        self.plans
    }
}

impl Default for AssetPlanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Sanitize a caption or block id into a file base name
pub fn asset_base_name(raw: &str) -> String {
    let mut name = String::with_capacity(raw.len());
    for c in raw.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() || matches!(c, '_' | '.') {
            name.push(c);
        } else if !name.ends_with('-') {
            name.push('-');
        }
    }

    let separators: &[char] = &['-', '.'];
    let capped: String = name
        .trim_matches(separators)
        .chars()
        .take(MAX_ASSET_NAME_CHARS)
        .collect();
    let capped = capped.trim_end_matches(separators);

    if capped.is_empty() {
        DEFAULT_ASSET_NAME.to_string()
    } else {
        capped.to_string()
    }
}

/// Extension of the URL's last path segment, if it looks like one
pub fn extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    let (stem, ext) = last.rsplit_once('.')?;

    let valid = !stem.is_empty()
        && !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_CHARS
        && ext.chars().all(|c| c.is_ascii_alphanumeric());

    valid.then(|| ext.to_ascii_lowercase())
}

fn first_free_name(base: &str, ext: &str, is_taken: impl Fn(&str) -> bool) -> String {
    let first = format!("{}.{}", base, ext);
    if !is_taken(&first) {
        return first;
    }

    let mut n = 2u32;
    loop {
        let candidate = format!("{}-{}.{}", base, n, ext);
        if !is_taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
