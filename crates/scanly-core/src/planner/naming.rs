//! Filesystem-safe path components.

use regex::Regex;
use std::sync::LazyLock;

/// Maximum length, in characters, of one path component.
const MAX_COMPONENT_LENGTH: usize = 120;

/// Characters reserved on NTFS that must be removed.
const NTFS_RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Reserved device names on Windows.
const NTFS_RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

fn trim_component(text: &str) -> &str {
    text.trim_start().trim_end_matches(|c: char| c == '.' || c.is_whitespace())
}

/// Make `text` safe to use as a single path component.
///
/// # Rules Applied
/// 1. Remove NTFS-reserved and control characters
/// 2. Collapse internal whitespace
/// 3. Trim leading whitespace and trailing dots/whitespace
/// 4. Truncate to `MAX_COMPONENT_LENGTH` characters
/// 5. Suffix Windows device names with `_`
///
/// Returns an empty string if nothing survives; see [`safe_component_or`].
pub fn safe_component(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !NTFS_RESERVED_CHARS.contains(c) && (c.is_whitespace() || !c.is_control()))
        .collect();
    let collapsed = WHITESPACE_RUN.replace_all(&stripped, " ");
    let mut result = trim_component(&collapsed).to_string();

    if result.chars().count() > MAX_COMPONENT_LENGTH {
        result = result.chars().take(MAX_COMPONENT_LENGTH).collect();
        result = trim_component(&result).to_string();
    }

    let device = result.split('.').next().unwrap_or("").to_uppercase();
    if NTFS_RESERVED_NAMES.contains(&device.as_str()) {
        result.push('_');
    }

    result
}

/// Like [`safe_component`], falling back to a sanitized `fallback` and then
/// to `"Untitled"` when the result is empty.
pub fn safe_component_or(text: &str, fallback: &str) -> String {
    let primary = safe_component(text);
    if !primary.is_empty() {
        return primary;
    }
    let fallback = safe_component(fallback);
    if !fallback.is_empty() {
        return fallback;
    }
    "Untitled".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_reserved_characters() {
        assert_eq!(safe_component("Mission: Impossible"), "Mission Impossible");
        assert_eq!(safe_component("What/If?*"), "WhatIf");
        assert_eq!(safe_component("Tab\there"), "Tab here");
    }

    #[test]
    fn test_trims_trailing_dots_and_spaces() {
        assert_eq!(safe_component("  Dr. Strangelove...  "), "Dr. Strangelove");
    }

    #[test]
    fn test_reserved_device_names() {
        assert_eq!(safe_component("con"), "con_");
        assert_eq!(safe_component("Console"), "Console");
    }

    #[test]
    fn test_truncates_on_char_boundary() {
        let long = "é".repeat(300);
        assert_eq!(safe_component(&long).chars().count(), MAX_COMPONENT_LENGTH);
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(safe_component_or("???", "source stem"), "source stem");
        assert_eq!(safe_component_or("...", ":::"), "Untitled");
    }
}
