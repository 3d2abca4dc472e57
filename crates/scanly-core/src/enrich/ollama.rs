//! Filename hints from a local Ollama instance.
//!
//! Uses the non-streaming `POST /api/generate` endpoint with `format: "json"`
//! and parses the model's `response` string as a [`FilenameHint`].

use super::{FilenameHint, HintProvider};
use crate::config::{AppConfig, HintConfig, NetworkConfig};
use crate::error::{Result, ScanlyError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};
use url::Url;

const PROVIDER: &str = "ollama";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    format: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

fn build_prompt(filename: &str, parent: &str) -> String {
    format!(
        r#"You are a filename sanitiser/parser.
You must not decide whether a file is a movie or a TV show.
Extract only helpful tokens and hints. Remove junk tags (resolution, codec, release group, site).
Output strictly valid JSON matching this schema:
{{
  "raw": "...",
  "sanitised_guess": "...",
  "title_tokens": ["..."],
  "year_hint": <int or null>,
  "season_hint": <int or null>,
  "episode_hint": <int or null>,
  "possible_alt_titles": ["..."],
  "removed_tags": ["..."],
  "confidence": 0.0
}}
Rules:
- Do not invent data.
- Use null or [] if unknown.
- Output JSON only, no prose or markdown.
Filename: {filename}
Parent folder: {parent}"#
    )
}

fn malformed(message: impl Into<String>) -> ScanlyError {
    ScanlyError::MalformedResponse {
        provider: PROVIDER.to_string(),
        message: message.into(),
    }
}

fn unavailable(message: impl Into<String>) -> ScanlyError {
    ScanlyError::ProviderUnavailable {
        provider: PROVIDER.to_string(),
        message: message.into(),
    }
}

/// Client for the Ollama generate endpoint.
pub struct OllamaHintProvider {
    client: Client,
    endpoint: Url,
    model: String,
    timeout: Duration,
    binary: Option<PathBuf>,
}

impl OllamaHintProvider {
    pub fn new(config: &HintConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(AppConfig::USER_AGENT)
            .build()
            .map_err(|e| ScanlyError::Network {
                message: format!("Failed to build HTTP client: {}", e),
                cause: None,
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            timeout: config.timeout,
            binary: config.binary.clone(),
        })
    }

    fn socket_addr(&self) -> Result<(String, u16)> {
        let host = self
            .endpoint
            .host_str()
            .ok_or_else(|| ScanlyError::config("OLLAMA_URL has no host"))?
            .to_string();
        let port = self
            .endpoint
            .port_or_known_default()
            .ok_or_else(|| ScanlyError::config("OLLAMA_URL has no port"))?;
        Ok((host, port))
    }

    async fn is_listening(&self) -> bool {
        let Ok((host, port)) = self.socket_addr() else {
            return false;
        };
        matches!(
            tokio::time::timeout(
                NetworkConfig::HINT_CONNECT_PROBE_TIMEOUT,
                TcpStream::connect((host.as_str(), port)),
            )
            .await,
            Ok(Ok(_))
        )
    }

    /// Make sure the service is reachable, starting `ollama serve` if needed.
    pub async fn ensure_service(&self) -> Result<()> {
        if self.is_listening().await {
            debug!("Ollama already listening at {}", self.endpoint);
            return Ok(());
        }

        let binary = self
            .binary
            .clone()
            .unwrap_or_else(|| PathBuf::from("ollama"));
        info!("Starting {} serve", binary.display());
        tokio::process::Command::new(&binary)
            .arg("serve")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| unavailable(format!("failed to start {}: {}", binary.display(), e)))?;

        for attempt in 1..=NetworkConfig::HINT_SERVICE_START_ATTEMPTS {
            tokio::time::sleep(NetworkConfig::HINT_SERVICE_START_INTERVAL).await;
            if self.is_listening().await {
                info!("Ollama is up after {} attempt(s)", attempt);
                return Ok(());
            }
        }

        warn!("Ollama did not come up at {}", self.endpoint);
        Err(unavailable("service did not start"))
    }
}

#[async_trait]
impl HintProvider for OllamaHintProvider {
    async fn hint(&self, filename: &str, parent: &str) -> Result<FilenameHint> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: build_prompt(filename, parent),
            format: "json",
            stream: false,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ScanlyError::ProviderTimeout {
                        provider: PROVIDER.to_string(),
                        timeout: self.timeout,
                    }
                } else {
                    unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("HTTP {}", status)));
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ScanlyError::ProviderTimeout {
                    provider: PROVIDER.to_string(),
                    timeout: self.timeout,
                }
            } else {
                malformed(e.to_string())
            }
        })?;

        let raw = body.response.trim();
        if raw.is_empty() {
            return Err(malformed("empty response"));
        }

        let mut hint = FilenameHint::from_json(raw).map_err(|e| malformed(e.to_string()))?;
        if hint.raw.is_empty() {
            hint.raw = filename.to_string();
        }
        debug!(
            "Hint for '{}': title={:?} year={:?} season={:?} episode={:?}",
            filename,
            hint.title(),
            hint.year_hint,
            hint.season_hint,
            hint.episode_hint
        );
        Ok(hint)
    }
}
