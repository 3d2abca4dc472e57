//! Builder that wires the scan loop's collaborators from configuration.

use crate::cancel::CancellationToken;
use crate::config::ScanConfig;
use crate::enrich::{HintEnricher, OllamaHintProvider};
use crate::error::Result;
use crate::matching::CandidateResolver;
use crate::providers::{TitleIndex, TmdbClient};
use crate::scan::{FfprobeProbe, FilePipeline, ScanLoop};
use std::sync::Arc;
use tracing::{info, warn};

/// Builder for a configured [`ScanLoop`].
///
/// # Example
///
/// ```rust,ignore
/// use scanly_core::{CancellationToken, ScanConfig, ScanlyBuilder};
///
/// let config = ScanConfig::from_env()?;
/// let mut scan = ScanlyBuilder::new(config)
///     .auto_create_dirs(true)
///     .build(CancellationToken::new())
///     .await?;
/// let summary = scan.run_pass().await?;
/// ```
pub struct ScanlyBuilder {
    config: ScanConfig,
    auto_create_dirs: bool,
    start_hint_service: bool,
}

impl ScanlyBuilder {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            auto_create_dirs: true,
            start_hint_service: true,
        }
    }

    /// Create destination roots and the state directory before building.
    ///
    /// Default: `true`
    pub fn auto_create_dirs(mut self, enable: bool) -> Self {
        self.auto_create_dirs = enable;
        self
    }

    /// Start `ollama serve` when hints are enabled and the endpoint is closed.
    ///
    /// Default: `true`
    pub fn start_hint_service(mut self, enable: bool) -> Self {
        self.start_hint_service = enable;
        self
    }

    /// Open the providers once and assemble the loop.
    pub async fn build(self, cancel: CancellationToken) -> Result<ScanLoop> {
        let config = self.config;
        if self.auto_create_dirs && !config.dry_run {
            config.ensure_directories()?;
        }

        let mut resolver = CandidateResolver::new();
        if let Some(db_path) = &config.imdb_db_path {
            let index = TitleIndex::open_read_only(db_path)?;
            info!("Local title index at {} ({} titles)", db_path.display(), index.count()?);
            resolver = resolver.with_local(Arc::new(index));
        }
        match &config.tmdb_api_key {
            Some(key) => {
                let client = TmdbClient::new(key.clone(), config.tmdb_api_base.clone())?;
                resolver = resolver.with_remote(Arc::new(client));
            }
            None => warn!("TMDB_API_KEY is not set, remote lookups are disabled"),
        }

        let mut pipeline = FilePipeline::new(&config, resolver);
        if !config.min_duration.is_zero() {
            pipeline = pipeline.with_probe(Box::new(FfprobeProbe::from_config(&config)));
        }

        if config.hint.enabled {
            let provider = OllamaHintProvider::new(&config.hint)?;
            let service = if self.start_hint_service {
                provider.ensure_service().await
            } else {
                Ok(())
            };
            let enricher = HintEnricher::new(Box::new(provider));
            if let Err(e) = service {
                enricher.breaker().disable(e.to_string());
            }
            pipeline = pipeline.with_enricher(enricher);
        }

        Ok(ScanLoop::new(config, pipeline, cancel))
    }
}
