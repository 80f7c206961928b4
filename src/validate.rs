//! Strict-mode validation: detect unknown keys in `setman.toml`.
//!
//! Uses `serde_ignored` to deserialize into `C::Layer` (all-optional fields) and
//! capture any keys that the layer doesn't consume. Each unknown key is
//! reported with its best-effort line number.

use std::path::Path;

use confique::Config;
use serde::Deserialize;

use crate::error::SetmanError;

/// Validate that a TOML options file contains no keys unknown to `C`.
pub fn validate_unknown_keys<C: Config>(content: &str, path: &Path) -> Result<(), SetmanError>
where
    C::Layer: for<'de> Deserialize<'de>,
{
    let mut unknown_keys: Vec<String> = Vec::new();

    let deserializer = toml::Deserializer::new(content);
    let _layer: C::Layer = serde_ignored::deserialize(deserializer, |ignored_path| {
        unknown_keys.push(ignored_path.to_string());
    })
    .map_err(|e| SetmanError::Deserialize {
        path: path.to_path_buf(),
        format: "toml".into(),
        reason: e.to_string(),
    })?;

    if unknown_keys.is_empty() {
        return Ok(());
    }

    let keys = unknown_keys
        .into_iter()
        .map(|key| match find_key_line(content, &key) {
            0 => key,
            line => format!("{key} (line {line})"),
        })
        .collect();

    Err(SetmanError::UnknownOptionKeys {
        path: path.to_path_buf(),
        keys,
    })
}

/// 1-indexed line of a dotted key in TOML content, 0 when not found.
///
/// Tracks `[section]` headers so a leaf is only matched inside its own
/// table. Quoted keys and inline tables are not handled.
fn find_key_line(content: &str, dotted_key: &str) -> usize {
    let segments: Vec<&str> = dotted_key.split('.').collect();
    let leaf = segments.last().copied().unwrap_or(dotted_key);
    let expected_section = &segments[..segments.len().saturating_sub(1)];

    let mut current_section: Vec<String> = Vec::new();

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.starts_with('[') && !trimmed.starts_with("[[") {
            let header = trimmed.trim_start_matches('[').trim_end_matches(']').trim();
            current_section = header.split('.').map(|s| s.trim().to_string()).collect();
            continue;
        }

        let in_right_section = expected_section.len() == current_section.len()
            && expected_section
                .iter()
                .zip(&current_section)
                .all(|(a, b)| *a == b);

        if in_right_section
            && let Some(after_key) = trimmed.strip_prefix(leaf)
            && after_key.trim_start().starts_with('=')
        {
            return i + 1;
        }
    }
    0
}
