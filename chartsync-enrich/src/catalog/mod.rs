//! Catalog API client
//!
//! Search and bulk-lookup access to the external music catalog, rate
//! limited to one request per configured interval. The [`CatalogApi`]
//! trait is the seam the pipeline is written against; tests substitute
//! in-memory providers.

pub mod types;

use crate::models::{ItemKind, SearchCandidate};
use chartsync_common::config::CatalogConfig;
use reqwest::header::HeaderMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use types::{
    AlbumRecord, AlbumsResponse, ArtistRecord, ArtistsResponse, SearchResponse, TrackRecord,
    TracksResponse,
};

const USER_AGENT: &str = concat!("chartsync/", env!("CARGO_PKG_VERSION"));

/// Catalog client errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Non-success status on a search call. Recoverable: the item is
    /// skipped and the run continues.
    #[error("Search request failed with HTTP {0}")]
    SearchFailed(u16),

    /// HTTP 429. Fatal to the run; no automatic backoff.
    #[error("Rate limited by catalog API")]
    RateLimited,

    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport-level failure (connect, timeout, TLS). Hydration retries
    /// these up to a bounded attempt count.
    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    #[error("Catalog API error {0}: {1}")]
    Api(u16, String),

    #[error("Response parse error: {0}")]
    Parse(String),
}

/// Access to the external catalog: one search call per list item during
/// resolution, one bulk call per ID chunk during hydration.
#[allow(async_fn_in_trait)]
pub trait CatalogApi {
    async fn search(
        &self,
        query: &str,
        kind: ItemKind,
    ) -> Result<Vec<SearchCandidate>, CatalogError>;

    async fn tracks(&self, ids: &[String]) -> Result<Vec<TrackRecord>, CatalogError>;

    async fn albums(&self, ids: &[String]) -> Result<Vec<AlbumRecord>, CatalogError>;

    async fn artists(&self, ids: &[String]) -> Result<Vec<ArtistRecord>, CatalogError>;
}

/// Minimum-interval rate limiter shared by all catalog calls
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with the rate limit
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Production catalog client over HTTP
pub struct CatalogClient {
    http: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
    market: String,
    search_limit: u32,
}

impl CatalogClient {
    /// Build a client with the authenticator's headers attached to every
    /// request.
    pub fn new(config: &CatalogConfig, auth_headers: HeaderMap) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(auth_headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CatalogError::TransientNetwork(e.to_string()))?;

        Ok(Self {
            http,
            rate_limiter: Arc::new(RateLimiter::new(config.rate_limit_ms)),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            market: config.market.clone(),
            search_limit: config.search_limit,
        })
    }

    /// Issue a bulk lookup for one ID chunk and map the status code to the
    /// error taxonomy shared by all three entity kinds.
    async fn bulk_lookup<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        ids: &[String],
        with_market: bool,
    ) -> Result<T, CatalogError> {
        self.rate_limiter.wait().await;

        let url = format!("{}/{}", self.base_url, endpoint);
        let joined = ids.join(",");
        let mut request = self.http.get(&url).query(&[("ids", joined.as_str())]);
        if with_market {
            request = request.query(&[("market", self.market.as_str())]);
        }

        tracing::debug!(endpoint, count = ids.len(), "Bulk catalog lookup");

        let response = request
            .send()
            .await
            .map_err(|e| CatalogError::TransientNetwork(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(CatalogError::RateLimited);
        }
        if status.as_u16() == 404 {
            return Err(CatalogError::NotFound(format!("{endpoint} bulk lookup")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))
    }
}

impl CatalogApi for CatalogClient {
    async fn search(
        &self,
        query: &str,
        kind: ItemKind,
    ) -> Result<Vec<SearchCandidate>, CatalogError> {
        self.rate_limiter.wait().await;

        let url = format!("{}/search", self.base_url);
        let limit = self.search_limit.to_string();
        let response = self
            .http
            .get(&url)
            .query(&[
                ("q", query),
                ("type", kind.as_search_type()),
                ("market", self.market.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| CatalogError::TransientNetwork(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(CatalogError::RateLimited);
        }
        if !status.is_success() {
            return Err(CatalogError::SearchFailed(status.as_u16()));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        let candidates: Vec<SearchCandidate> = match kind {
            ItemKind::Track => body
                .tracks
                .map(|page| page.items)
                .unwrap_or_default()
                .into_iter()
                .flatten()
                .map(SearchCandidate::from_track)
                .collect(),
            ItemKind::Album => body
                .albums
                .map(|page| page.items)
                .unwrap_or_default()
                .into_iter()
                .flatten()
                .map(SearchCandidate::from_album)
                .collect(),
        };

        tracing::debug!(
            query,
            kind = kind.as_search_type(),
            candidates = candidates.len(),
            "Catalog search complete"
        );

        Ok(candidates)
    }

    async fn tracks(&self, ids: &[String]) -> Result<Vec<TrackRecord>, CatalogError> {
        let response: TracksResponse = self.bulk_lookup("tracks", ids, true).await?;
        Ok(response.tracks.into_iter().flatten().collect())
    }

    async fn albums(&self, ids: &[String]) -> Result<Vec<AlbumRecord>, CatalogError> {
        let response: AlbumsResponse = self.bulk_lookup("albums", ids, true).await?;
        Ok(response.albums.into_iter().flatten().collect())
    }

    async fn artists(&self, ids: &[String]) -> Result<Vec<ArtistRecord>, CatalogError> {
        let response: ArtistsResponse = self.bulk_lookup("artists", ids, false).await?;
        Ok(response.artists.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limiter_interval_configured() {
        let limiter = RateLimiter::new(250);
        assert_eq!(limiter.min_interval, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(100);

        let start = Instant::now();
        limiter.wait().await;
        let first = start.elapsed();
        limiter.wait().await;
        let second = start.elapsed();

        assert!(first < Duration::from_millis(50));
        assert!(second >= Duration::from_millis(90));
    }

    #[test]
    fn client_creation_succeeds() {
        let config = chartsync_common::config::CatalogConfig::default();
        let client = CatalogClient::new(&config, HeaderMap::new());
        assert!(client.is_ok());
    }
}
