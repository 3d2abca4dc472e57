//! TMDB search client.
//!
//! Responses are memoized in a TTL cache keyed by [`RequestKey`], the
//! endpoint plus its sorted query parameters. The API key never enters the key.

use super::RemoteCatalog;
use crate::config::{AppConfig, NetworkConfig};
use crate::error::{Result, ScanlyError};
use crate::models::{MatchSource, MetadataMatch, TitleKind};
use async_trait::async_trait;
use mini_moka::sync::Cache;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const PROVIDER: &str = "tmdb";

/// Canonical identity of a search request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    endpoint: String,
    params: Vec<(String, String)>,
}

impl RequestKey {
    pub fn new<I, K, V>(endpoint: &str, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params: Vec<(String, String)> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        params.sort();
        Self {
            endpoint: endpoint.trim_matches('/').to_string(),
            params,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct MovieResult {
    id: u64,
    title: Option<String>,
    original_title: Option<String>,
    release_date: Option<String>,
    popularity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ShowResult {
    id: u64,
    name: Option<String>,
    original_name: Option<String>,
    first_air_date: Option<String>,
    popularity: Option<f64>,
}

/// Keep an original title only when it adds something to the display title.
fn distinct_original(original: Option<String>, title: &str) -> Option<String> {
    original.filter(|o| !o.trim().is_empty() && o != title)
}

/// Year from a `YYYY-MM-DD` date, tolerating empty strings.
fn year_from_date(date: Option<&str>) -> Option<i32> {
    date.and_then(|d| d.get(..4)).and_then(|y| y.parse().ok())
}

fn into_matches(kind: TitleKind, body: &str) -> Result<Vec<MetadataMatch>> {
    let malformed = |e: serde_json::Error| ScanlyError::MalformedResponse {
        provider: PROVIDER.to_string(),
        message: e.to_string(),
    };

    let matches = match kind {
        TitleKind::Movie => serde_json::from_str::<SearchResponse<MovieResult>>(body)
            .map_err(malformed)?
            .results
            .into_iter()
            .filter_map(|r| {
                let title = r.title.filter(|t| !t.is_empty())?;
                Some(MetadataMatch {
                    provider_id: format!("tmdb:movie:{}", r.id),
                    original_title: distinct_original(r.original_title, &title),
                    title,
                    year: year_from_date(r.release_date.as_deref()),
                    kind,
                    source: MatchSource::RemoteProvider,
                    popularity: r.popularity,
                })
            })
            .collect(),
        TitleKind::Show => serde_json::from_str::<SearchResponse<ShowResult>>(body)
            .map_err(malformed)?
            .results
            .into_iter()
            .filter_map(|r| {
                let title = r.name.filter(|t| !t.is_empty())?;
                Some(MetadataMatch {
                    provider_id: format!("tmdb:tv:{}", r.id),
                    original_title: distinct_original(r.original_name, &title),
                    title,
                    year: year_from_date(r.first_air_date.as_deref()),
                    kind,
                    source: MatchSource::RemoteProvider,
                    popularity: r.popularity,
                })
            })
            .collect(),
    };
    Ok(matches)
}

/// Map a transport error onto the provider failure tiers.
fn classify_error(err: reqwest::Error, timeout: Duration) -> ScanlyError {
    if err.is_timeout() {
        ScanlyError::ProviderTimeout {
            provider: PROVIDER.to_string(),
            timeout,
        }
    } else if err.is_connect() {
        ScanlyError::ProviderUnavailable {
            provider: PROVIDER.to_string(),
            message: err.to_string(),
        }
    } else if err.is_decode() {
        ScanlyError::MalformedResponse {
            provider: PROVIDER.to_string(),
            message: err.to_string(),
        }
    } else {
        err.into()
    }
}

/// TMDB search client with response memoization.
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
    cache: Cache<RequestKey, Arc<Vec<MetadataMatch>>>,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(api_key, base_url, NetworkConfig::TMDB_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(AppConfig::USER_AGENT)
            .build()
            .map_err(|e| ScanlyError::Network {
                message: format!("Failed to build HTTP client: {}", e),
                cause: None,
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
            cache: Cache::builder()
                .time_to_live(NetworkConfig::TMDB_CACHE_TTL)
                .max_capacity(NetworkConfig::TMDB_CACHE_CAPACITY)
                .build(),
        })
    }

    fn search_key(kind: TitleKind, query: &str, year: Option<i32>) -> RequestKey {
        let (endpoint, year_param) = match kind {
            TitleKind::Movie => ("search/movie", "year"),
            TitleKind::Show => ("search/tv", "first_air_date_year"),
        };
        let mut params = vec![
            ("query", query.trim().to_string()),
            ("include_adult", "false".to_string()),
            ("language", "en-US".to_string()),
            ("page", "1".to_string()),
        ];
        if let Some(year) = year {
            params.push((year_param, year.to_string()));
        }
        RequestKey::new(endpoint, params)
    }

    async fn search(
        &self,
        kind: TitleKind,
        query: &str,
        year: Option<i32>,
    ) -> Result<Vec<MetadataMatch>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let key = Self::search_key(kind, query, year);
        if let Some(cached) = self.cache.get(&key) {
            debug!("TMDB cache hit for {} '{}'", key.endpoint(), query);
            return Ok(cached.as_ref().clone());
        }

        let url = format!("{}/{}", self.base_url, key.endpoint());
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(key.params())
            .send()
            .await
            .map_err(|e| classify_error(e, self.timeout))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ScanlyError::ProviderUnavailable {
                provider: PROVIDER.to_string(),
                message: "API key rejected".to_string(),
            });
        }
        if !status.is_success() {
            warn!("TMDB {} returned {}", key.endpoint(), status);
            return Err(ScanlyError::Network {
                message: format!("TMDB {} returned {}", key.endpoint(), status),
                cause: None,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_error(e, self.timeout))?;
        let matches = into_matches(kind, &body)?;

        debug!(
            "TMDB {} '{}' returned {} results",
            key.endpoint(),
            query,
            matches.len()
        );
        self.cache.insert(key, Arc::new(matches.clone()));
        Ok(matches)
    }
}

#[async_trait]
impl RemoteCatalog for TmdbClient {
    async fn search_movies(&self, query: &str, year: Option<i32>) -> Result<Vec<MetadataMatch>> {
        self.search(TitleKind::Movie, query, year).await
    }

    async fn search_shows(&self, query: &str, year: Option<i32>) -> Result<Vec<MetadataMatch>> {
        self.search(TitleKind::Show, query, year).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_key_is_order_independent() {
        let a = RequestKey::new("search/movie", [("query", "heat"), ("year", "1995")]);
        let b = RequestKey::new("/search/movie/", [("year", "1995"), ("query", "heat")]);
        assert_eq!(a, b);
        assert_ne!(a, RequestKey::new("search/tv", [("query", "heat"), ("year", "1995")]));
    }

    #[test]
    fn test_search_key_excludes_api_key() {
        let key = TmdbClient::search_key(TitleKind::Show, " Show Name ", Some(2010));
        assert!(key.params().iter().all(|(k, _)| k != "api_key"));
        assert!(key
            .params()
            .contains(&("first_air_date_year".to_string(), "2010".to_string())));
        assert!(key.params().contains(&("query".to_string(), "Show Name".to_string())));
    }

    #[test]
    fn test_parse_movie_results() {
        let body = r#"{"page":1,"results":[
            {"id":603,"title":"The Matrix","release_date":"1999-03-30","popularity":80.5},
            {"id":1,"title":"","release_date":""},
            {"id":2,"title":"Undated","release_date":""}
        ]}"#;
        let matches = into_matches(TitleKind::Movie, body).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].provider_id, "tmdb:movie:603");
        assert_eq!(matches[0].year, Some(1999));
        assert_eq!(matches[1].year, None);
    }

    #[test]
    fn test_parse_show_results() {
        let body = r#"{"results":[
            {"id":1396,"name":"Breaking Bad","original_name":"Breaking Bad",
             "first_air_date":"2008-01-20"}
        ]}"#;
        let matches = into_matches(TitleKind::Show, body).unwrap();
        assert_eq!(matches[0].kind, TitleKind::Show);
        assert_eq!(matches[0].source, MatchSource::RemoteProvider);
        assert_eq!(matches[0].original_title, None);
    }

    #[test]
    fn test_parse_original_title() {
        let body = r#"{"results":[
            {"id":129,"title":"Spirited Away","original_title":"千と千尋の神隠し",
             "release_date":"2001-07-20"}
        ]}"#;
        let matches = into_matches(TitleKind::Movie, body).unwrap();
        assert_eq!(matches[0].title, "Spirited Away");
        assert_eq!(matches[0].original_title.as_deref(), Some("千と千尋の神隠し"));
    }

    #[test]
    fn test_parse_malformed() {
        let err = into_matches(TitleKind::Movie, "<html>").unwrap_err();
        assert!(matches!(err, ScanlyError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        let client = TmdbClient::with_timeout("key", "http://127.0.0.1:9", Duration::from_secs(2))
            .unwrap();
        let err = client.search_movies("Heat", None).await.unwrap_err();
        assert!(matches!(
            err,
            ScanlyError::ProviderUnavailable { .. } | ScanlyError::ProviderTimeout { .. }
        ));
    }

    #[tokio::test]
    async fn test_empty_query_skips_request() {
        let client = TmdbClient::new("key", "http://127.0.0.1:9").unwrap();
        assert!(client.search_shows("   ", None).await.unwrap().is_empty());
    }
}
