//! Asset plans and downloaded assets.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::block::MediaKind;

/// Name of the per-directory subfolder that holds downloaded assets
pub const MEDIA_DIR: &str = "media";

/// Where a referenced binary resource will be placed locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPlan {
    /// Source block id
    pub id: String,

    /// Remote URL (often time-limited)
    pub original_url: String,

    /// Path relative to the page's directory, e.g. `media/diagram.png`
    pub local_path: PathBuf,

    pub kind: MediaKind,

    pub caption: Option<String>,
}

impl AssetPlan {
    /// Relative reference used inside the Markdown (`./media/...`)
    pub fn markdown_ref(&self) -> String {
        let parts: Vec<String> = self
            .local_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        format!("./{}", parts.join("/"))
    }
}

/// An asset plan with its downloaded bytes
#[derive(Debug, Clone)]
pub struct AssetDescriptor {
    pub plan: AssetPlan,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_ref_uses_forward_slashes() {
        let plan = AssetPlan {
            id: "b1".into(),
            original_url: "https://example.com/x.png".into(),
            local_path: PathBuf::from(MEDIA_DIR).join("x.png"),
            kind: MediaKind::Image,
            caption: None,
        };
        assert_eq!(plan.markdown_ref(), "./media/x.png");
    }
}
