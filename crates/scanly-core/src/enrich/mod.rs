//! Optional filename enrichment.
//!
//! A [`HintProvider`] refines the analyzer's output. The enricher guards it
//! with a [`CapabilityBreaker`] so that a missing service costs one failed call
//! per process, and merges whatever comes back without overriding anything the
//! analyzer already determined.

mod breaker;
mod hint;
mod ollama;

pub use breaker::{BreakerStats, CapabilityBreaker, FailureKind};
pub use hint::FilenameHint;
pub use ollama::OllamaHintProvider;

use crate::analyzer::FilenameAnalysis;
use crate::error::Result;
use crate::models::MediaCandidate;
use async_trait::async_trait;
use tracing::debug;

/// Source of filename hints.
#[async_trait]
pub trait HintProvider: Send + Sync {
    async fn hint(&self, filename: &str, parent: &str) -> Result<FilenameHint>;
}

/// Hint provider guarded by a capability breaker.
pub struct HintEnricher {
    provider: Box<dyn HintProvider>,
    breaker: CapabilityBreaker,
}

impl HintEnricher {
    pub fn new(provider: Box<dyn HintProvider>) -> Self {
        Self {
            provider,
            breaker: CapabilityBreaker::new("filename hints"),
        }
    }

    pub fn breaker(&self) -> &CapabilityBreaker {
        &self.breaker
    }

    /// Ask for a hint. `None` means "no opinion".
    pub async fn enrich(&self, filename: &str, parent: &str) -> Option<FilenameHint> {
        if !self.breaker.is_available() {
            return None;
        }

        match self.provider.hint(filename, parent).await {
            Ok(hint) => {
                self.breaker.record_success();
                Some(hint)
            }
            Err(e) => {
                self.breaker
                    .record_failure(FailureKind::from_error(&e), e.to_string());
                None
            }
        }
    }
}

/// Merge an optional hint into the analyzer's candidate.
///
/// The hint fills only year, season and episode values the analyzer left
/// unset, and replaces the title only when the analyzer kept no title tokens.
/// Episode numbers added to a movie turn it into a show.
pub fn merge_hint(analysis: &FilenameAnalysis, hint: Option<&FilenameHint>) -> MediaCandidate {
    let mut candidate = analysis.to_candidate();
    let Some(hint) = hint else {
        return candidate;
    };

    if analysis.tokens.is_empty() {
        if let Some(title) = hint.title() {
            debug!("Using hinted title '{}' for {}", title, analysis.raw);
            candidate.query = title;
        }
    }

    if candidate.year_hint.is_none() {
        candidate.year_hint = hint.year();
    }

    let season = candidate.season().is_none().then_some(hint.season_hint).flatten();
    let episode = candidate.episode().is_none().then_some(hint.episode_hint).flatten();
    candidate.set_episode(season, episode);

    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::error::ScanlyError;
    use crate::models::MediaType;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct ScriptedProvider {
        calls: Arc<AtomicUsize>,
        outcome: fn() -> Result<FilenameHint>,
    }

    #[async_trait]
    impl HintProvider for ScriptedProvider {
        async fn hint(&self, _filename: &str, _parent: &str) -> Result<FilenameHint> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    fn enricher(outcome: fn() -> Result<FilenameHint>) -> (HintEnricher, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = ScriptedProvider {
            calls: calls.clone(),
            outcome,
        };
        (HintEnricher::new(Box::new(provider)), calls)
    }

    #[tokio::test]
    async fn test_unavailable_disables_further_calls() {
        let (enricher, calls) = enricher(|| {
            Err(ScanlyError::ProviderUnavailable {
                provider: "ollama".into(),
                message: "connection refused".into(),
            })
        });
        assert!(enricher.enrich("a.mkv", "").await.is_none());
        assert!(enricher.enrich("b.mkv", "").await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!enricher.breaker().is_available());
    }

    #[tokio::test]
    async fn test_timeout_only_skips_this_file() {
        let (enricher, calls) = enricher(|| {
            Err(ScanlyError::ProviderTimeout {
                provider: "ollama".into(),
                timeout: Duration::from_secs(15),
            })
        });
        assert!(enricher.enrich("a.mkv", "").await.is_none());
        assert!(enricher.enrich("b.mkv", "").await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(enricher.breaker().is_available());
    }

    #[tokio::test]
    async fn test_success_returns_hint() {
        let (enricher, _) = enricher(|| {
            Ok(FilenameHint {
                year_hint: Some(2001),
                ..Default::default()
            })
        });
        let hint = enricher.enrich("a.mkv", "").await.unwrap();
        assert_eq!(hint.year_hint, Some(2001));
        assert_eq!(enricher.breaker().stats().successes, 1);
    }

    #[test]
    fn test_merge_fills_only_unset_fields() {
        let analysis = analyze("The.Matrix.1999.mkv", "");
        let hint = FilenameHint {
            sanitized_title: "Matrix Reloaded".into(),
            year_hint: Some(2003),
            ..Default::default()
        };
        let candidate = merge_hint(&analysis, Some(&hint));
        assert_eq!(candidate.query, "The Matrix");
        assert_eq!(candidate.year_hint, Some(1999));
        assert_eq!(candidate.media_type(), MediaType::Movie);
    }

    #[test]
    fn test_merge_promotes_movie_to_show() {
        let analysis = analyze("Show.Name.mkv", "");
        let hint = FilenameHint {
            season_hint: Some(1),
            episode_hint: Some(4),
            ..Default::default()
        };
        let candidate = merge_hint(&analysis, Some(&hint));
        assert_eq!(candidate.media_type(), MediaType::Show);
        assert_eq!((candidate.season(), candidate.episode()), (Some(1), Some(4)));
    }

    #[test]
    fn test_merge_keeps_analyzer_episode() {
        let analysis = analyze("Show.S02E05.mkv", "");
        let hint = FilenameHint {
            season_hint: Some(9),
            episode_hint: Some(9),
            ..Default::default()
        };
        let candidate = merge_hint(&analysis, Some(&hint));
        assert_eq!((candidate.season(), candidate.episode()), (Some(2), Some(5)));
    }

    #[test]
    fn test_merge_replaces_title_without_tokens() {
        let analysis = analyze("1080p.BluRay.x264.mkv", "");
        assert!(analysis.tokens.is_empty());
        let hint = FilenameHint {
            sanitized_title: "Heat".into(),
            ..Default::default()
        };
        assert_eq!(merge_hint(&analysis, Some(&hint)).query, "Heat");
    }

    #[test]
    fn test_merge_keeps_year_only_title() {
        let analysis = analyze("2012.1080p.mkv", "");
        assert!(analysis.clean_title.is_empty());
        assert_eq!(analysis.tokens, vec!["2012".to_string()]);
        let hint = FilenameHint {
            sanitized_title: "Something Else".into(),
            ..Default::default()
        };
        assert_eq!(merge_hint(&analysis, Some(&hint)).query, "2012");
        assert_eq!(merge_hint(&analysis, None).query, "2012");
    }
}
