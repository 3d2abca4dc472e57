//! Token classes and regexes used by the filename analyzer.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Release, codec, source and audio tags that never belong to a title.
static RELEASE_TAGS: &[&str] = &[
    "aac", "ac3", "aim", "amzn", "atmos", "atvp", "avc", "bd", "bdrip", "blu", "bluray", "brrip",
    "bray", "cam", "collection", "complete", "criterion", "dd", "ddp", "dl", "dovi", "dsnp", "dts",
    "dubbed", "dvd", "dvdrip", "dz", "eac3", "eztv", "flac", "framestor", "gdrives", "h264",
    "h265", "hdr", "hdr10", "hdrip", "hdtv", "hevc", "hmax", "hulu", "imax", "internal", "limited",
    "multisubs", "netflix", "nf", "prime", "proper", "psa", "rartv", "remastered", "remux",
    "repack", "rip", "sd", "sub", "subs", "subfrench", "subita", "tgx", "truefrench", "truehd",
    "uhd", "unrated", "web", "webdl", "webrip", "x264", "x265", "xvid", "yify", "yts", "4k",
];

/// Language markers.
static LANGUAGE_TAGS: &[&str] = &[
    "eng", "english", "ita", "italian", "spa", "spanish", "lat", "latino", "rus", "russian",
    "jpn", "japanese", "kor", "korean", "fra", "french", "ger", "german", "multi", "dual",
];

/// Whole-token hints that a non-episodic file is anime.
static ANIME_HINTS: &[&str] = &["anime", "ova", "ona"];

/// Words that end the title portion of a filename.
static TITLE_TERMINATORS: &[&str] = &["season", "episode", "part", "disc"];

static STOPWORDS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| RELEASE_TAGS.iter().chain(LANGUAGE_TAGS).copied().collect());

/// `1080p`, `720p`, `2160p`, `1080i`.
static RESOLUTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\d{3,4}[pi]$").unwrap());

/// `10bit`, `6ch`.
static AUDIO_VIDEO_SHAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\d+(?:bit|ch)$").unwrap());

static YEAR_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:19|20|21)\d{2}$").unwrap());

static NUMERIC_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());

// Whole-token season/episode markers.
static SXXEYY_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^s\d{1,2}e\d{1,3}(?:e\d{1,3})*$").unwrap());
static NXM_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\d{1,2}x\d{2,3}$").unwrap());
static SEASON_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^s\d{1,2}$").unwrap());
static EPISODE_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:e|ep)\d{1,3}$").unwrap());

// Season/episode searches over separator-normalized text, in precedence order.
pub(crate) static SXXEYY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bs(\d{1,2})e(\d{1,3})(?:e\d{1,3})*\b").unwrap());
pub(crate) static NXM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})x(\d{2,3})\b").unwrap());
pub(crate) static SEASON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bs(\d{1,2})\b").unwrap());
pub(crate) static EPISODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:e|ep)(\d{1,3})\b").unwrap());
pub(crate) static SEASON_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bseason (\d{1,2})\b").unwrap());
pub(crate) static EPISODE_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bepisode (\d{1,3})\b").unwrap());

const SEPARATORS: &[char] = &['.', '_', '-', '(', ')', '[', ']', '{', '}'];

/// Replace separators with spaces and collapse runs of whitespace.
pub fn normalize_separators(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || SEPARATORS.contains(&c))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether a token is release noise.
pub fn is_stopword(token: &str) -> bool {
    let lower = token.to_lowercase();
    STOPWORDS.contains(lower.as_str())
        || RESOLUTION_RE.is_match(&lower)
        || AUDIO_VIDEO_SHAPE_RE.is_match(&lower)
}

pub fn is_anime_hint(token: &str) -> bool {
    let lower = token.to_lowercase();
    ANIME_HINTS.contains(&lower.as_str())
}

/// Parse a token as a year in the accepted range.
pub fn year_token(token: &str) -> Option<i32> {
    if YEAR_TOKEN_RE.is_match(token) {
        token.parse().ok()
    } else {
        None
    }
}

/// Whether a token is a season/episode designator such as `S01E02`, `1x02`, `S01` or `E02`.
pub fn is_episode_marker(token: &str) -> bool {
    SXXEYY_TOKEN_RE.is_match(token)
        || NXM_TOKEN_RE.is_match(token)
        || SEASON_TOKEN_RE.is_match(token)
        || EPISODE_TOKEN_RE.is_match(token)
}

/// Whether a token ends the title portion of a filename.
pub fn ends_title(token: &str) -> bool {
    let lower = token.to_lowercase();
    NUMERIC_TOKEN_RE.is_match(token)
        || year_token(token).is_some()
        || is_episode_marker(token)
        || TITLE_TERMINATORS.contains(&lower.as_str())
}
