//! Structured hint payload returned by the hint provider.
//!
//! Providers are language models and do not reliably follow a schema, so every
//! field has a default, `null` is accepted anywhere, and integers may arrive as
//! digit strings.

use crate::analyzer::normalize_separators;
use crate::config::MatchConfig;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Refinements suggested for one filename.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilenameHint {
    #[serde(deserialize_with = "lenient_string")]
    pub raw: String,
    #[serde(
        rename = "sanitised_guess",
        alias = "sanitized_title",
        deserialize_with = "lenient_string"
    )]
    pub sanitized_title: String,
    #[serde(deserialize_with = "lenient_strings")]
    pub title_tokens: Vec<String>,
    #[serde(deserialize_with = "lenient_int")]
    pub year_hint: Option<i32>,
    #[serde(deserialize_with = "lenient_int")]
    pub season_hint: Option<u32>,
    #[serde(deserialize_with = "lenient_int")]
    pub episode_hint: Option<u32>,
    #[serde(deserialize_with = "lenient_strings")]
    pub possible_alt_titles: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub removed_tags: Vec<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub confidence: f64,
}

impl FilenameHint {
    /// Parse a provider payload. The payload must be a JSON object.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(de::Error::custom("hint payload is not a JSON object"));
        }
        serde_json::from_value(value)
    }

    /// Suggested title, separator-normalized. Falls back to the joined title tokens.
    pub fn title(&self) -> Option<String> {
        let sanitized = normalize_separators(&self.sanitized_title);
        if !sanitized.is_empty() {
            return Some(sanitized);
        }
        let joined = normalize_separators(&self.title_tokens.join(" "));
        (!joined.is_empty()).then_some(joined)
    }

    /// Year hint, if it falls in the accepted range.
    pub fn year(&self) -> Option<i32> {
        self.year_hint
            .filter(|y| (MatchConfig::MIN_YEAR..=MatchConfig::MAX_YEAR).contains(y))
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s),
                _ => None,
            })
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

fn lenient_int<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let value = match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
                s.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    };
    Ok(value.and_then(|v| T::try_from(v).ok()))
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}
