//! Metadata providers.
//!
//! Providers are read-only from the pipeline's point of view. The local index
//! is searched synchronously; remote catalogs are async and may fail per call.

pub mod local;
pub mod tmdb;

pub use local::{TitleIndex, TitleRecord};
pub use tmdb::{RequestKey, TmdbClient};

use crate::error::Result;
use crate::models::MetadataMatch;
use async_trait::async_trait;

/// A locally indexed title catalog.
pub trait TitleCatalog: Send + Sync {
    /// Search titles by prefix and substring, optionally ordered around a year.
    fn search(&self, title: &str, year: Option<i32>, limit: usize) -> Result<Vec<MetadataMatch>>;
}

/// A remote search provider with separate movie and show endpoints.
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    async fn search_movies(&self, query: &str, year: Option<i32>) -> Result<Vec<MetadataMatch>>;

    async fn search_shows(&self, query: &str, year: Option<i32>) -> Result<Vec<MetadataMatch>>;
}
