//! Candidate resolution across the local index and a remote catalog.

use super::similarity::{evaluate, ScoreContext};
use crate::config::MatchConfig;
use crate::error::Result;
use crate::models::{MediaCandidate, MetadataMatch, ScoredMatch};
use crate::providers::{RemoteCatalog, TitleCatalog};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of resolving one candidate.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Highest-ranked match, accepted or not.
    pub best: Option<ScoredMatch>,
    /// Every match that was scored, across all tiers.
    pub considered: Vec<ScoredMatch>,
}

impl Resolution {
    /// The best match if its verdict accepts it.
    pub fn accepted(&self) -> Option<&ScoredMatch> {
        self.best.as_ref().filter(|m| m.verdict.accepted)
    }
}

/// Ranks local matches first and falls back to a remote catalog.
#[derive(Clone, Default)]
pub struct CandidateResolver {
    local: Option<Arc<dyn TitleCatalog>>,
    remote: Option<Arc<dyn RemoteCatalog>>,
}

/// Order two scored matches: score descending, then closeness to the year
/// hint (or newest first without a hint), then provider popularity.
fn rank(a: &ScoredMatch, b: &ScoredMatch, year_hint: Option<i32>) -> Ordering {
    b.score()
        .partial_cmp(&a.score())
        .unwrap_or(Ordering::Equal)
        .then_with(|| match year_hint {
            Some(hint) => {
                let distance = |m: &ScoredMatch| {
                    m.matched.year.map(|y| (y - hint).abs()).unwrap_or(i32::MAX)
                };
                distance(a).cmp(&distance(b))
            }
            None => b.matched.year.cmp(&a.matched.year),
        })
        .then_with(|| {
            b.matched
                .popularity
                .unwrap_or(0.0)
                .partial_cmp(&a.matched.popularity.unwrap_or(0.0))
                .unwrap_or(Ordering::Equal)
        })
}

/// Score each match against the query, using whichever of its primary and
/// original titles scores better.
fn score_all(
    query: &str,
    year_hint: Option<i32>,
    folder_hint: Option<&str>,
    matches: Vec<MetadataMatch>,
) -> Vec<ScoredMatch> {
    let mut scored: Vec<ScoredMatch> = matches
        .into_iter()
        .map(|matched| {
            let ctx = ScoreContext {
                query_year: year_hint,
                candidate_year: matched.year,
                folder_hint,
            };
            let mut verdict = evaluate(query, &matched.title, &ctx);
            if let Some(original) = matched.original_title.as_deref() {
                let alt = evaluate(query, original, &ctx);
                if (alt.accepted, alt.score) > (verdict.accepted, verdict.score) {
                    verdict = alt;
                }
            }
            ScoredMatch { matched, verdict }
        })
        .collect();
    scored.sort_by(|a, b| rank(a, b, year_hint));
    scored
}

/// Treat call-scoped provider failures as an empty branch.
fn branch_or_empty(
    branch: &str,
    result: Result<Vec<MetadataMatch>>,
) -> Result<Vec<MetadataMatch>> {
    match result {
        Ok(matches) => Ok(matches),
        Err(e) if e.is_call_scoped() => {
            warn!("Remote {} search gave no result: {}", branch, e);
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

impl CandidateResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_local(mut self, local: Arc<dyn TitleCatalog>) -> Self {
        self.local = Some(local);
        self
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteCatalog>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Resolve a candidate to its best match.
    ///
    /// Remote failures other than timeouts and malformed responses are
    /// returned as errors so the file is retried on the next pass.
    pub async fn resolve(
        &self,
        candidate: &MediaCandidate,
        folder_hint: &str,
    ) -> Result<Resolution> {
        let query = candidate.query.as_str();
        let year = candidate.year_hint;
        let mut resolution = Resolution::default();

        if let Some(local) = &self.local {
            let hits = local.search(query, year, MatchConfig::LOCAL_SEARCH_LIMIT)?;
            let scored = score_all(query, year, None, hits);
            if let Some(top) = scored.first() {
                debug!(
                    "Local best for '{}': '{}' ({:?}) score {:.1}",
                    query,
                    top.matched.title,
                    top.matched.year,
                    top.score()
                );
                resolution.best = Some(top.clone());
            }
            resolution.considered.extend(scored);

            if resolution
                .best
                .as_ref()
                .is_some_and(|b| b.score() > MatchConfig::DIRECT_ACCEPT_SCORE)
            {
                return Ok(resolution);
            }
        }

        let Some(remote) = &self.remote else {
            return Ok(resolution);
        };

        let folder = Some(folder_hint).filter(|h| !h.trim().is_empty());
        let (movies, shows) = tokio::join!(
            remote.search_movies(query, year),
            remote.search_shows(query, year)
        );
        let movies = score_all(query, year, None, branch_or_empty("movie", movies)?);
        let shows = score_all(query, year, folder, branch_or_empty("show", shows)?);

        let remote_best = match (movies.first(), shows.first()) {
            (Some(m), Some(s)) if s.score() > m.score() => Some(s.clone()),
            (Some(m), _) => Some(m.clone()),
            (None, Some(s)) => Some(s.clone()),
            (None, None) => None,
        };

        if let Some(candidate_best) = remote_best {
            let beats_local = resolution
                .best
                .as_ref()
                .map_or(true, |local| candidate_best.score() > local.score());
            if beats_local {
                debug!(
                    "Remote best for '{}': '{}' ({:?}) score {:.1}",
                    query,
                    candidate_best.matched.title,
                    candidate_best.matched.year,
                    candidate_best.score()
                );
                resolution.best = Some(candidate_best);
            }
        }

        resolution.considered.extend(movies);
        resolution.considered.extend(shows);
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanlyError;
    use crate::models::{MatchSource, MediaType, TitleKind, VerdictReason};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::time::Duration;

    fn title(
        id: &str,
        name: &str,
        year: Option<i32>,
        kind: TitleKind,
        source: MatchSource,
    ) -> MetadataMatch {
        MetadataMatch {
            provider_id: id.into(),
            title: name.into(),
            original_title: None,
            year,
            kind,
            source,
            popularity: None,
        }
    }

    struct FixedLocal(Vec<MetadataMatch>);

    impl TitleCatalog for FixedLocal {
        fn search(&self, _t: &str, _y: Option<i32>, _l: usize) -> Result<Vec<MetadataMatch>> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct FixedRemote {
        movies: Vec<MetadataMatch>,
        shows: Vec<MetadataMatch>,
        fail_movies: Option<fn() -> ScanlyError>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RemoteCatalog for FixedRemote {
        async fn search_movies(&self, _q: &str, _y: Option<i32>) -> Result<Vec<MetadataMatch>> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            match self.fail_movies {
                Some(err) => Err(err()),
                None => Ok(self.movies.clone()),
            }
        }

        async fn search_shows(&self, _q: &str, _y: Option<i32>) -> Result<Vec<MetadataMatch>> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(self.shows.clone())
        }
    }

    fn movie_candidate(query: &str, year: Option<i32>) -> MediaCandidate {
        MediaCandidate::new(MediaType::Movie, query).with_year(year)
    }

    #[tokio::test]
    async fn test_local_hit_skips_remote() {
        let local = FixedLocal(vec![
            title("tt1", "Dune", Some(2021), TitleKind::Movie, MatchSource::LocalCache),
            title("tt2", "Dune", Some(1984), TitleKind::Movie, MatchSource::LocalCache),
        ]);
        let remote = Arc::new(FixedRemote::default());
        let resolver = CandidateResolver::new()
            .with_local(Arc::new(local))
            .with_remote(remote.clone());

        let resolution = resolver.resolve(&movie_candidate("Dune", Some(1984)), "").await.unwrap();
        let best = resolution.accepted().unwrap();
        assert_eq!(best.matched.provider_id, "tt2");
        assert_eq!(best.verdict.reason, VerdictReason::StrictAccept);
        assert_eq!(remote.calls.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_original_title_scores_the_match() {
        let mut spirited = title(
            "tt0245429",
            "Spirited Away",
            Some(2001),
            TitleKind::Movie,
            MatchSource::LocalCache,
        );
        spirited.original_title = Some("Sen to Chihiro no kamikakushi".into());
        let remote = Arc::new(FixedRemote::default());
        let resolver = CandidateResolver::new()
            .with_local(Arc::new(FixedLocal(vec![spirited])))
            .with_remote(remote.clone());

        let candidate = movie_candidate("Sen to Chihiro no Kamikakushi", Some(2001));
        let resolution = resolver.resolve(&candidate, "").await.unwrap();
        let best = resolution.accepted().unwrap();
        assert_eq!(best.matched.title, "Spirited Away");
        assert_eq!(best.verdict.reason, VerdictReason::StrictAccept);
        assert_eq!(remote.calls.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ties_without_year_prefer_newest() {
        let local = FixedLocal(vec![
            title("tt1", "Dune", Some(1984), TitleKind::Movie, MatchSource::LocalCache),
            title("tt2", "Dune", Some(2021), TitleKind::Movie, MatchSource::LocalCache),
        ]);
        let resolver = CandidateResolver::new().with_local(Arc::new(local));
        let resolution = resolver.resolve(&movie_candidate("Dune", None), "").await.unwrap();
        assert_eq!(resolution.best.unwrap().matched.provider_id, "tt2");
        assert_eq!(resolution.considered.len(), 2);
    }

    #[tokio::test]
    async fn test_weak_local_falls_through_to_remote() {
        let local = FixedLocal(vec![title(
            "tt9",
            "Completely Different",
            None,
            TitleKind::Movie,
            MatchSource::LocalCache,
        )]);
        let remote = FixedRemote {
            movies: vec![title(
                "m1",
                "Arrival",
                Some(2016),
                TitleKind::Movie,
                MatchSource::RemoteProvider,
            )],
            ..Default::default()
        };
        let resolver = CandidateResolver::new()
            .with_local(Arc::new(local))
            .with_remote(Arc::new(remote));

        let resolution = resolver
            .resolve(&movie_candidate("Arrival", Some(2016)), "")
            .await
            .unwrap();
        assert_eq!(resolution.accepted().unwrap().matched.provider_id, "m1");
        assert_eq!(resolution.considered.len(), 2);
    }

    #[tokio::test]
    async fn test_remote_tie_favors_movie() {
        let remote = FixedRemote {
            movies: vec![title(
                "m1",
                "Fargo",
                Some(1996),
                TitleKind::Movie,
                MatchSource::RemoteProvider,
            )],
            shows: vec![title(
                "s1",
                "Fargo",
                Some(1996),
                TitleKind::Show,
                MatchSource::RemoteProvider,
            )],
            ..Default::default()
        };
        let resolver = CandidateResolver::new().with_remote(Arc::new(remote));
        let resolution = resolver.resolve(&movie_candidate("Fargo", None), "").await.unwrap();
        assert_eq!(resolution.best.unwrap().matched.kind, TitleKind::Movie);
    }

    #[tokio::test]
    async fn test_folder_hint_tips_show_branch() {
        let remote = FixedRemote {
            movies: vec![title(
                "m1",
                "Fargo X",
                None,
                TitleKind::Movie,
                MatchSource::RemoteProvider,
            )],
            shows: vec![title("s1", "Fargo Y", None, TitleKind::Show, MatchSource::RemoteProvider)],
            ..Default::default()
        };
        let resolver = CandidateResolver::new().with_remote(Arc::new(remote));
        let candidate =
            MediaCandidate::new(MediaType::Show, "Fargo").with_episode(Some(1), Some(1));
        let resolution = resolver.resolve(&candidate, "Fargo").await.unwrap();
        assert_eq!(resolution.best.unwrap().matched.kind, TitleKind::Show);
    }

    #[tokio::test]
    async fn test_timeout_branch_is_empty() {
        let remote = FixedRemote {
            shows: vec![title("s1", "Fargo", None, TitleKind::Show, MatchSource::RemoteProvider)],
            fail_movies: Some(|| ScanlyError::ProviderTimeout {
                provider: "tmdb".into(),
                timeout: Duration::from_secs(10),
            }),
            ..Default::default()
        };
        let resolver = CandidateResolver::new().with_remote(Arc::new(remote));
        let resolution = resolver.resolve(&movie_candidate("Fargo", None), "").await.unwrap();
        assert_eq!(resolution.best.unwrap().matched.provider_id, "s1");
    }

    #[tokio::test]
    async fn test_connection_failure_propagates() {
        let remote = FixedRemote {
            fail_movies: Some(|| ScanlyError::ProviderUnavailable {
                provider: "tmdb".into(),
                message: "refused".into(),
            }),
            ..Default::default()
        };
        let resolver = CandidateResolver::new().with_remote(Arc::new(remote));
        let err = resolver.resolve(&movie_candidate("Fargo", None), "").await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_no_providers_yields_nothing() {
        let resolution = CandidateResolver::new()
            .resolve(&movie_candidate("Anything", None), "")
            .await
            .unwrap();
        assert!(resolution.best.is_none());
        assert!(resolution.accepted().is_none());
    }
}
