//! Media candidates produced by filename analysis.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad classification of a media file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Show,
    Anime,
    Unmatched,
}

impl MediaType {
    /// Whether this type may carry season/episode numbers.
    pub fn is_episodic(self) -> bool {
        matches!(self, MediaType::Show | MediaType::Anime)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Movie => write!(f, "movie"),
            MediaType::Show => write!(f, "show"),
            MediaType::Anime => write!(f, "anime"),
            MediaType::Unmatched => write!(f, "unmatched"),
        }
    }
}

/// What the pipeline believes a file to be before any provider is consulted.
///
/// `season` and `episode` are only ever set on episodic types; the setters
/// promote a movie to a show rather than break that rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaCandidate {
    media_type: MediaType,
    pub query: String,
    pub year_hint: Option<i32>,
    season: Option<u32>,
    episode: Option<u32>,
}

impl MediaCandidate {
    pub fn new(media_type: MediaType, query: impl Into<String>) -> Self {
        Self {
            media_type,
            query: query.into(),
            year_hint: None,
            season: None,
            episode: None,
        }
    }

    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.year_hint = year;
        self
    }

    /// Attach season/episode numbers, promoting non-episodic types to `Show`.
    pub fn with_episode(mut self, season: Option<u32>, episode: Option<u32>) -> Self {
        self.set_episode(season, episode);
        self
    }

    /// Fill season/episode numbers, promoting non-episodic types to `Show`.
    pub fn set_episode(&mut self, season: Option<u32>, episode: Option<u32>) {
        if season.is_none() && episode.is_none() {
            return;
        }
        if !self.media_type.is_episodic() {
            self.media_type = MediaType::Show;
        }
        if season.is_some() {
            self.season = season;
        }
        if episode.is_some() {
            self.episode = episode;
        }
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn season(&self) -> Option<u32> {
        self.season
    }

    pub fn episode(&self) -> Option<u32> {
        self.episode
    }

    /// Whether the candidate carries any season/episode marker.
    pub fn has_episode_markers(&self) -> bool {
        self.season.is_some() || self.episode.is_some()
    }
}
