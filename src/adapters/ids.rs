//! Canonical id form.
//!
//! The API accepts ids with or without hyphens. Every id is normalized to
//! lowercase 8-4-4-4-12 before it is sent or stored so that the visited
//! set and asset names stay stable.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("Not a page id or page URL: {0}")]
    Invalid(String),
}

/// Normalize an id to canonical form.
///
/// Input that is not a 32-digit hex id is returned trimmed and lowercased.
pub fn normalize_id(raw: &str) -> String {
    let compact: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '-')
        .collect::<String>()
        .to_ascii_lowercase();

    if compact.len() == 32 && compact.chars().all(|c| c.is_ascii_hexdigit()) {
        hyphenate(&compact)
    } else {
        raw.trim().to_ascii_lowercase()
    }
}

/// Parse a user-supplied page id or page URL.
///
/// Accepts `0123...`, `0123-...` and URLs such as
/// `https://www.notion.so/Team-Notes-0123...?pvs=4`.
pub fn parse_page_id(input: &str) -> Result<String, IdError> {
    let trimmed = input.trim();
    let without_query = trimmed.split(['?', '#']).next().unwrap_or(trimmed);
    let last_segment = without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(without_query);

    let compact: Vec<char> = last_segment.chars().filter(|c| *c != '-').collect();
    if compact.len() >= 32 {
        let tail = &compact[compact.len() - 32..];
        if tail.iter().all(|c| c.is_ascii_hexdigit()) {
            let tail: String = tail.iter().collect();
            return Ok(hyphenate(&tail.to_ascii_lowercase()));
        }
    }

    Err(IdError::Invalid(input.to_string()))
}

fn hyphenate(compact: &str) -> String {
    format!(
        "{}-{}-{}-{}-{}",
        &compact[0..8],
        &compact[8..12],
        &compact[12..16],
        &compact[16..20],
        &compact[20..32]
    )
}
