//! Client adapter for the remote sanctions search service.
//!
//! Speaks the Watchman-style HTTP API: a primary `/search` endpoint returning
//! scored SDN candidates plus alternate-name cross-references, and lookup
//! endpoints that resolve an entity id to a full SDN record. The adapter
//! normalizes every response into a [`ScreenResult`] so the dispatcher never
//! sees wire shapes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::config::ScreenConfig;
use crate::error::{Result, ScreenError};

/// Immutable per-row search request: the subject plus a snapshot of the
/// batch configuration the service needs.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Name submitted to the service.
    pub subject: String,
    /// Zero-based index of the originating input row.
    pub row: usize,
    /// Maximum number of candidates requested.
    pub limit: u32,
    /// Score floor forwarded to the service.
    pub min_match: f64,
    /// Subject-type filter (e.g. "individual").
    pub sdn_type: String,
    /// Correlation id sent as X-Request-ID.
    pub request_id: String,
}

impl SearchQuery {
    /// Build a query for one subject, snapshotting the batch configuration.
    /// A fresh v4 UUID is used when no request id is configured.
    pub fn new(subject: String, row: usize, config: &ScreenConfig) -> Self {
        Self {
            subject,
            row,
            limit: config.limit,
            min_match: config.min_match,
            sdn_type: config.sdn_type.clone(),
            request_id: config
                .request_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
        }
    }
}

/// One scored match record returned by the service.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Candidate {
    #[serde(rename = "entityID")]
    pub entity_id: String,
    #[serde(rename = "sdnName")]
    pub name: String,
    #[serde(rename = "sdnType", default)]
    pub sdn_type: String,
    #[serde(default)]
    pub programs: Vec<String>,
    #[serde(rename = "match", default)]
    pub score: f64,
    #[serde(default)]
    pub remarks: String,
}

/// Alternate-name cross-reference; resolved to a full record by entity id.
#[derive(Debug, Clone, Deserialize)]
struct AltName {
    #[serde(rename = "entityID")]
    entity_id: String,
    #[serde(rename = "alternateName", default)]
    alternate_name: String,
    #[serde(rename = "match", default)]
    score: f64,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(rename = "SDNs", default)]
    sdns: Vec<Candidate>,
    #[serde(rename = "altNames", default)]
    alt_names: Vec<AltName>,
}

#[derive(Debug, Deserialize)]
struct EntityResponse {
    #[serde(default)]
    sdn: Option<Candidate>,
}

/// Normalized result of screening one subject.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenResult {
    /// Did any candidate resolve for this subject?
    pub is_set: bool,
    /// Match score of the resolved candidate, or `-1.0` when nothing was found.
    pub score: f64,
    /// The resolved candidate, when `is_set`.
    pub candidate: Option<Candidate>,
}

impl ScreenResult {
    /// The "no match" terminal case. Not an error.
    pub fn empty() -> Self {
        Self {
            is_set: false,
            score: -1.0,
            candidate: None,
        }
    }

    fn resolved(candidate: Candidate, score: f64) -> Self {
        Self {
            is_set: true,
            score,
            candidate: Some(candidate),
        }
    }
}

/// The seam between the dispatcher and the network: anything that can screen
/// one subject name.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Screener: Send + Sync {
    /// Screen one subject, returning its normalized result.
    async fn screen(&self, query: SearchQuery) -> Result<ScreenResult>;
}

/// HTTP implementation of [`Screener`] against a Watchman-style service.
pub struct WatchClient {
    http: Client,
    address: String,
    timeout: Duration,
}

impl WatchClient {
    /// Create a client for the configured service address.
    pub fn new(config: &ScreenConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            http,
            address: config.address.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
        })
    }

    /// Health-check the service before starting a batch.
    pub async fn ping(&self) -> Result<()> {
        let response = self.http.get(format!("{}/ping", self.address)).send().await?;
        if !response.status().is_success() {
            return Err(ScreenError::Api {
                subject: "ping".to_string(),
                status: response.status(),
            });
        }
        Ok(())
    }

    async fn search_once(&self, query: &SearchQuery) -> Result<SearchResponse> {
        let request = self
            .http
            .get(format!("{}/search", self.address))
            .header("X-Request-ID", &query.request_id)
            .query(&[
                ("name", query.subject.clone()),
                ("limit", query.limit.to_string()),
                ("minMatch", query.min_match.to_string()),
                ("sdnType", query.sdn_type.clone()),
            ]);

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| ScreenError::Timeout {
                subject: query.subject.clone(),
                timeout: self.timeout,
            })?
            .map_err(|e| ScreenError::Transport {
                subject: query.subject.clone(),
                source: e,
            })?;

        if !response.status().is_success() {
            return Err(ScreenError::Api {
                subject: query.subject.clone(),
                status: response.status(),
            });
        }

        response.json().await.map_err(|e| ScreenError::Transport {
            subject: query.subject.clone(),
            source: e,
        })
    }

    /// Resolve an entity id to a full record via one of the lookup endpoints.
    /// `None` only when the endpoint has no record under that id; any other
    /// failure is an error, never a silent "no match".
    async fn lookup_entity(
        &self,
        kind: &str,
        entity_id: &str,
        subject: &str,
    ) -> Result<Option<Candidate>> {
        let url = format!("{}/ofac/{}/{}", self.address, kind, entity_id);

        let response = tokio::time::timeout(self.timeout, self.http.get(url).send())
            .await
            .map_err(|_| ScreenError::Timeout {
                subject: subject.to_string(),
                timeout: self.timeout,
            })?
            .map_err(|e| ScreenError::Transport {
                subject: subject.to_string(),
                source: e,
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ScreenError::Api {
                subject: subject.to_string(),
                status: response.status(),
            });
        }

        let entity: EntityResponse =
            response.json().await.map_err(|e| ScreenError::Transport {
                subject: subject.to_string(),
                source: e,
            })?;

        Ok(entity.sdn)
    }
}

#[async_trait]
impl Screener for WatchClient {
    async fn screen(&self, query: SearchQuery) -> Result<ScreenResult> {
        if query.subject.trim().is_empty() {
            return Err(ScreenError::EmptySubject { row: query.row });
        }

        let response = self.search_once(&query).await?;
        debug!(
            subject = %query.subject,
            sdns = response.sdns.len(),
            alt_names = response.alt_names.len(),
            "search response"
        );

        // Prefer a direct candidate; the service returns them sorted by
        // descending score, so the first one is the best match.
        if let Some(best) = response.sdns.into_iter().next() {
            let score = best.score;
            return Ok(ScreenResult::resolved(best, score));
        }

        // No direct candidate: resolve the first alternate name through the
        // customer lookup, then the company lookup. A lookup whose record
        // does not echo the requested entity id is treated as no match.
        if let Some(alt) = response.alt_names.first() {
            debug!(
                alternate = %alt.alternate_name,
                entity_id = %alt.entity_id,
                "resolving alternate name"
            );
            for kind in ["customers", "companies"] {
                let record = self
                    .lookup_entity(kind, &alt.entity_id, &query.subject)
                    .await?;
                if let Some(mut candidate) = record {
                    if candidate.entity_id == alt.entity_id {
                        candidate.score = alt.score;
                        return Ok(ScreenResult::resolved(candidate, alt.score));
                    }
                }
            }
        }

        Ok(ScreenResult::empty())
    }
}
