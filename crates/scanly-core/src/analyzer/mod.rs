//! Filename analysis.
//!
//! Turns a noisy release filename and its parent folder name into a clean
//! title plus year, season and episode hints. Analysis is pure: it touches
//! neither the filesystem nor the network.

mod patterns;

pub use patterns::{is_episode_marker, is_stopword, normalize_separators};

use crate::models::{MediaCandidate, MediaType};
use patterns::{
    ends_title, is_anime_hint, year_token, EPISODE_RE, EPISODE_WORD_RE, NXM_RE, SEASON_RE,
    SEASON_WORD_RE, SXXEYY_RE,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Structured view of a filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilenameAnalysis {
    pub raw: String,
    pub clean_title: String,
    /// Stopword-free tokens in their original order.
    pub tokens: Vec<String>,
    pub year: Option<i32>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub media_type: MediaType,
    pub folder_hint: String,
}

impl FilenameAnalysis {
    /// Build the pipeline candidate from this analysis.
    ///
    /// An empty title falls back to the joined tokens, then to the file stem.
    pub fn to_candidate(&self) -> MediaCandidate {
        let query = if !self.clean_title.is_empty() {
            self.clean_title.clone()
        } else if !self.tokens.is_empty() {
            self.tokens.join(" ")
        } else {
            normalize_separators(strip_extension(&self.raw))
        };

        MediaCandidate::new(self.media_type, query)
            .with_year(self.year)
            .with_episode(self.season, self.episode)
    }
}

/// Analyze a filename together with its parent folder name.
pub fn analyze(filename: &str, parent: &str) -> FilenameAnalysis {
    let base = normalize_separators(strip_extension(filename));
    let all_tokens: Vec<&str> = base.split(' ').filter(|t| !t.is_empty()).collect();

    let tokens: Vec<String> = all_tokens
        .iter()
        .filter(|t| !patterns::is_stopword(t))
        .map(|t| t.to_string())
        .collect();

    let year = all_tokens.iter().find_map(|t| year_token(t));
    let (season, episode) = extract_season_episode(&base);

    let media_type = if season.is_some() || episode.is_some() {
        MediaType::Show
    } else if all_tokens.iter().any(|t| is_anime_hint(t)) {
        MediaType::Anime
    } else {
        MediaType::Movie
    };

    let clean_title = tokens
        .iter()
        .take_while(|t| !ends_title(t))
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");

    FilenameAnalysis {
        raw: filename.to_string(),
        clean_title,
        tokens,
        year,
        season,
        episode,
        media_type,
        folder_hint: normalize_separators(parent),
    }
}

/// Remove a trailing container extension.
///
/// Only a 2-4 character alphanumeric suffix that is not purely numeric counts,
/// so `Movie.2019` keeps its year.
pub fn strip_extension(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (2..=4).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
                && !ext.chars().all(|c| c.is_ascii_digit()) =>
        {
            stem
        }
        _ => filename,
    }
}

fn capture_u32(re: &Regex, text: &str, group: usize) -> Option<u32> {
    re.captures(text)
        .and_then(|c| c.get(group))
        .and_then(|m| m.as_str().parse().ok())
}

/// Season/episode extraction. `SxxEyy` beats `NxM`, which beats standalone
/// `S##`/`E##`, which beat spelled-out words.
fn extract_season_episode(text: &str) -> (Option<u32>, Option<u32>) {
    for re in [&*SXXEYY_RE, &*NXM_RE] {
        if let Some(caps) = re.captures(text) {
            let season = caps.get(1).and_then(|m| m.as_str().parse().ok());
            let episode = caps.get(2).and_then(|m| m.as_str().parse().ok());
            if season.is_some() && episode.is_some() {
                return (season, episode);
            }
        }
    }

    let season = capture_u32(&SEASON_RE, text, 1).or_else(|| capture_u32(&SEASON_WORD_RE, text, 1));
    let episode =
        capture_u32(&EPISODE_RE, text, 1).or_else(|| capture_u32(&EPISODE_WORD_RE, text, 1));
    (season, episode)
}
