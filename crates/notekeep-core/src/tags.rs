//! Tag name normalization and validation.
//!
//! Tag names are compared case-insensitively: every name is trimmed and
//! lowercased before it reaches storage, and a target set is deduplicated
//! after normalization.

use std::collections::BTreeSet;

use crate::defaults::{TAG_NAME_MAX_LEN, TAG_SEPARATOR};
use crate::error::{Error, Result};

/// Normalize a single tag name. Returns `None` for blank input.
pub fn normalize_tag_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Validate an already-normalized tag name.
///
/// Rules:
/// - Length between 1 and [`TAG_NAME_MAX_LEN`] characters
/// - No separator (`,`) or control characters
pub fn validate_tag_name(tag: &str) -> std::result::Result<(), String> {
    if tag.is_empty() {
        return Err("Tag name cannot be empty".to_string());
    }
    if tag.chars().count() > TAG_NAME_MAX_LEN {
        return Err(format!(
            "Tag name must be {} characters or less",
            TAG_NAME_MAX_LEN
        ));
    }

    let invalid_chars: Vec<char> = tag
        .chars()
        .filter(|c| *c == TAG_SEPARATOR || c.is_control())
        .collect();

    if !invalid_chars.is_empty() {
        let chars_display: String = invalid_chars
            .iter()
            .take(5)
            .map(|c| format!("{:?}", c))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(format!("Tag contains invalid characters: {}", chars_display));
    }

    Ok(())
}

/// Normalize, validate, and deduplicate a target tag set.
///
/// Blank entries are dropped. The result is sorted, which keeps
/// reconciliation order deterministic.
pub fn normalize_tag_set<I, S>(names: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut set = BTreeSet::new();
    for name in names {
        if let Some(normalized) = normalize_tag_name(name.as_ref()) {
            validate_tag_name(&normalized).map_err(Error::Validation)?;
            set.insert(normalized);
        }
    }
    Ok(set.into_iter().collect())
}

/// Split a comma-separated tag line into normalized names, dropping blanks
/// and duplicates while keeping first-seen order.
pub fn parse_tag_list(line: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    line.split(TAG_SEPARATOR)
        .filter_map(normalize_tag_name)
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}
