//! Run orchestration: Resolving -> Hydrating -> Done
//!
//! The resolution loop owns the index mutably; hydration only ever sees
//! a shared borrow of the finished index, so chunk boundaries are
//! computed from a stable view. There is no path into hydration that
//! skips resolution.
//!
//! Recoverable per-item failures (no candidates, non-200 search) are
//! logged and skipped. Fatal failures stop all further catalog calls but
//! the report keeps the index and every entity hydrated so far, so a
//! partial dataset can still be exported and inspected.

use crate::catalog::{CatalogApi, CatalogError};
use crate::hydrate::{HydrateError, Hydrator};
use crate::index::{IndexError, ReconciliationIndex};
use crate::matching::{normalize_query, select, MatchError};
use crate::models::{Album, Artist, RawListItem, Track};
use chartsync_common::config::{BatchConfig, RetryConfig};
use thiserror::Error;
use tracing::{info, warn};

/// Phase of an enrichment run, in order. Hydrating may start only after
/// all Resolving work completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Resolving,
    Hydrating,
    Done,
}

/// Fatal run-level errors
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Hydrate(#[from] HydrateError),

    /// Fatal failure during the resolution phase (rate limit)
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Everything a run produced, complete or not
#[derive(Debug, Default)]
pub struct RunReport {
    /// List items successfully resolved into the index
    pub resolved: usize,
    /// List items skipped on recoverable errors
    pub skipped: usize,
    /// The reconciliation index as of the end of the run
    pub index: ReconciliationIndex,
    pub tracks: Vec<Track>,
    pub albums: Vec<Album>,
    pub artists: Vec<Artist>,
    /// The fatal error that ended the run early, if any
    pub failure: Option<RunError>,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// Execute a full enrichment run over the curated list.
pub async fn run<C: CatalogApi>(
    catalog: &C,
    items: &[RawListItem],
    batch: BatchConfig,
    retry: RetryConfig,
) -> RunReport {
    let mut report = RunReport::default();
    let mut index = ReconciliationIndex::new();

    info!(phase = ?RunPhase::Resolving, items = items.len(), "Enrichment run started");

    for item in items {
        let query = normalize_query(&format!("{} {}", item.artist, item.title));
        info!(rank = item.rank, title = %item.title, artist = %item.artist, "Resolving list item");

        let candidates = match catalog.search(&query, item.kind).await {
            Ok(candidates) => candidates,
            Err(CatalogError::RateLimited) => {
                report.index = index;
                report.failure = Some(CatalogError::RateLimited.into());
                return report;
            }
            Err(e) => {
                warn!(rank = item.rank, error = %e, "Search failed, skipping item");
                report.skipped += 1;
                continue;
            }
        };

        let resolved = match select(&candidates, &query, item.kind) {
            Ok(resolved) => resolved,
            Err(MatchError::NoCandidates) => {
                warn!(rank = item.rank, query = %query, "No candidates, skipping item");
                report.skipped += 1;
                continue;
            }
        };

        if let Err(e) = index.record_resolution(&resolved, item.rank) {
            report.index = index;
            report.failure = Some(e.into());
            return report;
        }
        report.resolved += 1;
    }

    info!(
        phase = ?RunPhase::Hydrating,
        resolved = report.resolved,
        skipped = report.skipped,
        tracks = index.track_count(),
        albums = index.album_count(),
        artists = index.artist_count(),
        "Resolution complete"
    );

    let hydration = Hydrator::new(catalog, &index, batch, retry).run().await;
    report.tracks = hydration.tracks;
    report.albums = hydration.albums;
    report.artists = hydration.artists;
    report.failure = hydration.failure.map(RunError::from);
    report.index = index;

    if report.is_complete() {
        info!(phase = ?RunPhase::Done, "Enrichment run complete");
    } else {
        warn!(
            phase = ?RunPhase::Done,
            tracks = report.tracks.len(),
            albums = report.albums.len(),
            artists = report.artists.len(),
            "Enrichment run ended early; partial results retained"
        );
    }

    report
}
