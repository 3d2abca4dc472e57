//! Title similarity scoring.
//!
//! Scores are bounded to `[0, 100]`: a token-order-insensitive Levenshtein
//! ratio plus small bonuses for matching episode designators, years and the
//! parent folder name.

use crate::analyzer::normalize_separators;
use crate::config::MatchConfig;
use crate::models::{SimilarityVerdict, VerdictReason};
use regex::Regex;
use std::sync::LazyLock;
use strsim::normalized_levenshtein;

static DESIGNATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:s(\d{1,2})e(\d{1,3})|(\d{1,2})x(\d{2,3}))\b").unwrap()
});

/// Signals beyond the two titles that feed the bonuses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreContext<'a> {
    pub query_year: Option<i32>,
    pub candidate_year: Option<i32>,
    pub folder_hint: Option<&'a str>,
}

impl ScoreContext<'_> {
    fn year_matches(&self) -> bool {
        matches!((self.query_year, self.candidate_year), (Some(a), Some(b)) if a == b)
    }
}

/// Lowercase and collapse separators. Idempotent.
pub fn normalize(text: &str) -> String {
    normalize_separators(&text.to_lowercase())
}

/// Token-order-insensitive similarity in `[0, 100]`.
///
/// Both inputs are normalized, their tokens sorted, and the joined strings
/// compared by normalized Levenshtein similarity. An empty side scores 0.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    let a = sorted_tokens(&normalize(a));
    let b = sorted_tokens(&normalize(b));
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    normalized_levenshtein(&a, &b) * 100.0
}

fn sorted_tokens(normalized: &str) -> String {
    let mut tokens: Vec<&str> = normalized.split(' ').filter(|t| !t.is_empty()).collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Season/episode designator (`S01E02` or `1x02`) in already-normalized text.
fn designator(normalized: &str) -> Option<(u32, u32)> {
    let caps = DESIGNATOR_RE.captures(normalized)?;
    let season = caps.get(1).or_else(|| caps.get(3))?.as_str().parse().ok()?;
    let episode = caps.get(2).or_else(|| caps.get(4))?.as_str().parse().ok()?;
    Some((season, episode))
}

/// Score a candidate title against a query, bonuses included and capped at 100.
pub fn score(query: &str, candidate: &str, ctx: &ScoreContext<'_>) -> f64 {
    let query_norm = normalize(query);
    let candidate_norm = normalize(candidate);

    let mut total = token_sort_ratio(&query_norm, &candidate_norm);

    if let (Some(q), Some(c)) = (designator(&query_norm), designator(&candidate_norm)) {
        if q == c {
            total += MatchConfig::EPISODE_BONUS;
        }
    }

    if ctx.year_matches() {
        total += MatchConfig::YEAR_BONUS;
    }

    if let Some(hint) = ctx.folder_hint {
        let hint = normalize(hint);
        if !hint.is_empty() && candidate_norm.contains(&hint) {
            total += MatchConfig::FOLDER_HINT_BONUS;
        }
    }

    total.clamp(0.0, MatchConfig::MAX_SCORE)
}

/// Classify a bonus-inclusive score.
pub fn verdict(score: f64, year_match: bool) -> SimilarityVerdict {
    let (accepted, warn, reason) = if score >= MatchConfig::STRICT_ACCEPT_SCORE {
        (true, false, VerdictReason::StrictAccept)
    } else if score >= MatchConfig::LOOSE_ACCEPT_SCORE && year_match {
        (true, true, VerdictReason::LooseAcceptYearMatch)
    } else {
        (false, false, VerdictReason::Rejected)
    };
    SimilarityVerdict {
        score,
        accepted,
        warn,
        reason,
    }
}

/// Score and classify in one step.
pub fn evaluate(query: &str, candidate: &str, ctx: &ScoreContext<'_>) -> SimilarityVerdict {
    verdict(score(query, candidate, ctx), ctx.year_matches())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_titles() {
        assert_eq!(token_sort_ratio("The Matrix", "the.matrix"), 100.0);
    }

    #[test]
    fn test_token_order_insensitive() {
        assert_eq!(
            token_sort_ratio("Matrix The", "The Matrix"),
            token_sort_ratio("The Matrix", "The Matrix")
        );
    }

    #[test]
    fn test_empty_scores_zero() {
        assert_eq!(token_sort_ratio("", "The Matrix"), 0.0);
        assert_eq!(score("...", "The Matrix", &ScoreContext::default()), 0.0);
    }

    #[test]
    fn test_normalize_idempotent() {
        for s in ["The.Matrix_(1999)", "  Show - S01E02 ", "ÉCOLE [x]"] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_score_invariant_under_normalization() {
        let ctx = ScoreContext {
            query_year: Some(1999),
            candidate_year: Some(1999),
            folder_hint: Some("Matrix.Collection"),
        };
        let pairs = [
            ("The.Matrix", "The Matrix Reloaded"),
            ("Show_Name-S01E02", "show name s01e02"),
            ("Heat (1995)", "HEAT"),
        ];
        for (a, b) in pairs {
            assert_eq!(score(a, b, &ctx), score(&normalize(a), &normalize(b), &ctx));
        }
    }

    #[test]
    fn test_bonuses_capped() {
        let ctx = ScoreContext {
            query_year: Some(2010),
            candidate_year: Some(2010),
            folder_hint: Some("Show Name"),
        };
        let s = score("Show Name S01E02", "Show Name S01E02", &ctx);
        assert_eq!(s, 100.0);
    }

    #[test]
    fn test_episode_bonus_requires_both_sides() {
        let ctx = ScoreContext::default();
        let base = token_sort_ratio("Show 1x02", "Show S01E02");
        assert_eq!(score("Show 1x02", "Show S01E02", &ctx), base + 10.0);
        let base = token_sort_ratio("Show S01E02", "Show");
        assert_eq!(score("Show S01E02", "Show", &ctx), base);
    }

    #[test]
    fn test_verdicts() {
        assert_eq!(verdict(95.0, false).reason, VerdictReason::StrictAccept);
        let loose = verdict(85.0, true);
        assert!(loose.accepted && loose.warn);
        assert_eq!(loose.reason, VerdictReason::LooseAcceptYearMatch);
        assert_eq!(verdict(85.0, false).reason, VerdictReason::Rejected);
        assert!(!verdict(60.0, true).accepted);
    }

    #[test]
    fn test_low_base_rescued_only_by_threshold() {
        // Base below 80 plus the year bonus crosses the loose threshold.
        let ctx = ScoreContext {
            query_year: Some(2001),
            candidate_year: Some(2001),
            folder_hint: None,
        };
        let base = token_sort_ratio("Amelie", "Amelie Poulain");
        assert!(base < 80.0);
        let v = evaluate("Amelie", "Amelie Poulain", &ctx);
        assert_eq!(v.accepted, base + 10.0 >= 80.0);
    }

    #[test]
    fn test_scores_bounded() {
        let ctx = ScoreContext {
            query_year: Some(1),
            candidate_year: Some(1),
            folder_hint: Some("a"),
        };
        for (a, b) in [("a", "a"), ("a s01e01", "a 1x01"), ("x", "yyyyyy")] {
            let s = score(a, b, &ctx);
            assert!((0.0..=100.0).contains(&s));
        }
    }
}
