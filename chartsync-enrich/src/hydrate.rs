//! Bulk hydration of indexed IDs into materialized entity records
//!
//! Drains the reconciliation index kind by kind, one bulk catalog call
//! per ID chunk. Rank and association data always come from the index
//! keyed by each RETURNED record's own ID; request order is never
//! trusted, since the provider may reorder or omit entries.

use crate::catalog::types::{AlbumRecord, ArtistRecord, TrackRecord};
use crate::catalog::{CatalogApi, CatalogError};
use crate::index::{EntityKind, ReconciliationIndex};
use crate::models::{Album, Artist, Track};
use chartsync_common::config::{BatchConfig, RetryConfig};
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Delay between transient-failure retries of a chunk
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Hydration errors. All variants are fatal to the run; entities
/// hydrated before the failure are retained in the report.
#[derive(Debug, Error)]
pub enum HydrateError {
    /// The provider returned a record whose ID was never indexed. Ranks
    /// are never fabricated for such records.
    #[error("Hydrated {kind} {id} is not present in the index")]
    UnindexedEntity { kind: &'static str, id: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Outcome of the hydration phase. `failure` is `None` on a clean run;
/// on failure the entity vectors hold everything hydrated up to that
/// point, for inspection or partial export.
#[derive(Debug, Default)]
pub struct HydrationReport {
    pub tracks: Vec<Track>,
    pub albums: Vec<Album>,
    pub artists: Vec<Artist>,
    pub failure: Option<HydrateError>,
}

/// Batch planner and hydrator over a frozen index
pub struct Hydrator<'a, C: CatalogApi> {
    catalog: &'a C,
    index: &'a ReconciliationIndex,
    batch: BatchConfig,
    transient_attempts: u32,
}

impl<'a, C: CatalogApi> Hydrator<'a, C> {
    pub fn new(
        catalog: &'a C,
        index: &'a ReconciliationIndex,
        batch: BatchConfig,
        retry: RetryConfig,
    ) -> Self {
        Self {
            catalog,
            index,
            batch,
            transient_attempts: retry.transient_attempts,
        }
    }

    /// Hydrate tracks, then albums, then artists. The first fatal error
    /// stops all further calls.
    pub async fn run(&self) -> HydrationReport {
        let mut report = HydrationReport::default();

        if let Err(e) = self.hydrate_tracks(&mut report.tracks).await {
            report.failure = Some(e);
            return report;
        }
        if let Err(e) = self.hydrate_albums(&mut report.albums).await {
            report.failure = Some(e);
            return report;
        }
        if let Err(e) = self.hydrate_artists(&mut report.artists).await {
            report.failure = Some(e);
            return report;
        }

        info!(
            tracks = report.tracks.len(),
            albums = report.albums.len(),
            artists = report.artists.len(),
            "Hydration complete"
        );
        report
    }

    async fn hydrate_tracks(&self, out: &mut Vec<Track>) -> Result<(), HydrateError> {
        let chunks = self.index.plan_batches(EntityKind::Tracks, self.batch.tracks);
        for chunk in chunks {
            info!(count = chunk.len(), "Fetching track chunk");
            let records = self
                .with_retry(|| self.catalog.tracks(&chunk))
                .await?;
            log_omitted(&chunk, records.iter().map(|r| r.id.as_str()), "track");

            // Materialize the whole chunk before committing it, so a
            // contract violation never leaves half a chunk behind.
            let mut hydrated = Vec::with_capacity(records.len());
            for record in records {
                hydrated.push(self.materialize_track(record)?);
            }
            out.extend(hydrated);
        }
        Ok(())
    }

    async fn hydrate_albums(&self, out: &mut Vec<Album>) -> Result<(), HydrateError> {
        let chunks = self.index.plan_batches(EntityKind::Albums, self.batch.albums);
        for chunk in chunks {
            info!(count = chunk.len(), "Fetching album chunk");
            let records = self
                .with_retry(|| self.catalog.albums(&chunk))
                .await?;
            log_omitted(&chunk, records.iter().map(|r| r.id.as_str()), "album");

            let mut hydrated = Vec::with_capacity(records.len());
            for record in records {
                hydrated.push(self.materialize_album(record)?);
            }
            out.extend(hydrated);
        }
        Ok(())
    }

    async fn hydrate_artists(&self, out: &mut Vec<Artist>) -> Result<(), HydrateError> {
        let chunks = self.index.plan_batches(EntityKind::Artists, self.batch.artists);
        for chunk in chunks {
            info!(count = chunk.len(), "Fetching artist chunk");
            let records = self
                .with_retry(|| self.catalog.artists(&chunk))
                .await?;
            log_omitted(&chunk, records.iter().map(|r| r.id.as_str()), "artist");

            let mut hydrated = Vec::with_capacity(records.len());
            for record in records {
                hydrated.push(self.materialize_artist(record)?);
            }
            out.extend(hydrated);
        }
        Ok(())
    }

    /// Retry a chunk call on transient network failures, up to the
    /// configured attempt budget. Every other error surfaces immediately;
    /// in particular a rate-limit response is never retried.
    async fn with_retry<T, F, Fut>(&self, mut call: F) -> Result<T, CatalogError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CatalogError>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Err(CatalogError::TransientNetwork(reason)) if attempt < self.transient_attempts => {
                    attempt += 1;
                    warn!(attempt, %reason, "Transient network failure, retrying chunk");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                other => return other,
            }
        }
    }

    fn materialize_track(&self, record: TrackRecord) -> Result<Track, HydrateError> {
        let rank = self.index.track_rank(&record.id).ok_or_else(|| {
            HydrateError::UnindexedEntity {
                kind: "track",
                id: record.id.clone(),
            }
        })?;

        Ok(Track {
            released_year: record.album.release_year(),
            track_id: record.id,
            track_name: record.name,
            artist_ids: record.artists.into_iter().map(|a| a.id).collect(),
            list_rank: rank,
            is_explicit: record.explicit,
            popularity: record.popularity,
            duration_ms: record.duration_ms,
            track_number_on_album: record.track_number,
            external_url: record.external_urls.spotify,
            uri: record.uri,
            album_id: record.album.id,
        })
    }

    fn materialize_album(&self, record: AlbumRecord) -> Result<Album, HydrateError> {
        let rank = self.index.album_rank(&record.id).ok_or_else(|| {
            HydrateError::UnindexedEntity {
                kind: "album",
                id: record.id.clone(),
            }
        })?;

        Ok(Album {
            released_year: record.release_year(),
            album_id: record.id,
            album_name: record.name,
            list_rank: rank.rank(),
            popularity: record.popularity,
            total_tracks: record.total_tracks,
            label: record.label,
            album_image: record.images.into_iter().next().map(|i| i.url).unwrap_or_default(),
            external_url: record.external_urls.spotify,
            uri: record.uri,
            artist_ids: record.artists.into_iter().map(|a| a.id).collect(),
        })
    }

    fn materialize_artist(&self, record: ArtistRecord) -> Result<Artist, HydrateError> {
        let albums = self.index.artist_albums(&record.id).ok_or_else(|| {
            HydrateError::UnindexedEntity {
                kind: "artist",
                id: record.id.clone(),
            }
        })?;

        // Closure between artist album-sets and the albums map is not
        // enforced eagerly; unknown references surface here as warnings.
        for album_id in albums {
            if !self.index.contains_album(album_id) {
                warn!(
                    artist = %record.id,
                    album = %album_id,
                    "Unknown album reference in artist album-set"
                );
            }
        }

        Ok(Artist {
            artist_id: record.id,
            artist_name: record.name,
            albums: albums.to_vec(),
            genres: record.genres,
            total_followers: record.followers.total,
            popularity: record.popularity,
            external_url: record.external_urls.spotify,
            uri: record.uri,
        })
    }
}

/// Log IDs the provider dropped from a bulk response
fn log_omitted<'r>(
    requested: &[String],
    returned: impl Iterator<Item = &'r str>,
    kind: &'static str,
) {
    let returned: HashSet<&str> = returned.collect();
    for id in requested {
        if !returned.contains(id.as_str()) {
            warn!(kind, id = %id, "Provider omitted requested entity from bulk response");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{AlbumRef, ExternalUrls, Followers};
    use crate::models::{ItemKind, ResolvedMatch, SearchCandidate};
    use std::sync::Mutex;

    fn track_record(id: &str, album: &str) -> TrackRecord {
        TrackRecord {
            id: id.to_string(),
            name: format!("name-{id}"),
            album: AlbumRef {
                id: album.to_string(),
                release_date: "1971-05-21".to_string(),
            },
            artists: vec![],
            duration_ms: 180_000,
            explicit: false,
            popularity: 70,
            track_number: 1,
            external_urls: ExternalUrls::default(),
            uri: format!("catalog:track:{id}"),
        }
    }

    fn artist_record(id: &str) -> ArtistRecord {
        ArtistRecord {
            id: id.to_string(),
            name: format!("name-{id}"),
            genres: vec!["soul".to_string()],
            followers: Followers { total: 10 },
            popularity: 60,
            external_urls: ExternalUrls::default(),
            uri: format!("catalog:artist:{id}"),
        }
    }

    /// Stub catalog: serves canned records, optionally failing the first
    /// N track calls with a transient error.
    struct StubCatalog {
        tracks: Vec<TrackRecord>,
        artists: Vec<ArtistRecord>,
        transient_failures: Mutex<u32>,
    }

    impl StubCatalog {
        fn new(tracks: Vec<TrackRecord>, artists: Vec<ArtistRecord>) -> Self {
            Self {
                tracks,
                artists,
                transient_failures: Mutex::new(0),
            }
        }

        fn failing_first(mut self, failures: u32) -> Self {
            self.transient_failures = Mutex::new(failures);
            self
        }
    }

    impl CatalogApi for StubCatalog {
        async fn search(
            &self,
            _query: &str,
            _kind: ItemKind,
        ) -> Result<Vec<SearchCandidate>, CatalogError> {
            unimplemented!("hydration tests never search")
        }

        async fn tracks(&self, ids: &[String]) -> Result<Vec<TrackRecord>, CatalogError> {
            let mut failures = self.transient_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(CatalogError::TransientNetwork("connection reset".into()));
            }
            Ok(self
                .tracks
                .iter()
                .filter(|t| ids.contains(&t.id))
                .cloned()
                .collect())
        }

        async fn albums(&self, _ids: &[String]) -> Result<Vec<AlbumRecord>, CatalogError> {
            // Albums hydrate empty in these tests unless a test injects a
            // failure through this path.
            Err(CatalogError::Api(500, "album endpoint down".into()))
        }

        async fn artists(&self, ids: &[String]) -> Result<Vec<ArtistRecord>, CatalogError> {
            Ok(self
                .artists
                .iter()
                .filter(|a| ids.contains(&a.id))
                .cloned()
                .collect())
        }
    }

    fn indexed(track: &str, album: &str, artist: &str) -> ReconciliationIndex {
        let mut index = ReconciliationIndex::new();
        index
            .record_resolution(
                &ResolvedMatch {
                    track_id: Some(track.to_string()),
                    album_id: album.to_string(),
                    artist_ids: vec![artist.to_string()],
                },
                1,
            )
            .unwrap();
        index
    }

    #[tokio::test]
    async fn unindexed_record_is_fatal_and_fabricates_nothing() {
        let index = indexed("T1", "A1", "AR1");
        // The provider returns a track that was never indexed.
        let catalog = StubCatalog::new(vec![track_record("T1", "A1"), track_record("T9", "A9")], vec![]);
        // Plan for T1 only; force the stub to return the rogue record too.
        struct Rogue(StubCatalog);
        impl CatalogApi for Rogue {
            async fn search(
                &self,
                q: &str,
                k: ItemKind,
            ) -> Result<Vec<SearchCandidate>, CatalogError> {
                self.0.search(q, k).await
            }
            async fn tracks(&self, _ids: &[String]) -> Result<Vec<TrackRecord>, CatalogError> {
                Ok(self.0.tracks.clone())
            }
            async fn albums(&self, ids: &[String]) -> Result<Vec<AlbumRecord>, CatalogError> {
                self.0.albums(ids).await
            }
            async fn artists(&self, ids: &[String]) -> Result<Vec<ArtistRecord>, CatalogError> {
                self.0.artists(ids).await
            }
        }

        let rogue = Rogue(catalog);
        let hydrator = Hydrator::new(
            &rogue,
            &index,
            BatchConfig::default(),
            RetryConfig::default(),
        );
        let report = hydrator.run().await;

        assert!(matches!(
            report.failure,
            Some(HydrateError::UnindexedEntity { kind: "track", .. })
        ));
        // The chunk containing the violation is not half-committed.
        assert!(report.tracks.is_empty());
    }

    #[tokio::test]
    async fn partial_success_retains_earlier_kinds() {
        let index = indexed("T1", "A1", "AR1");
        let catalog = StubCatalog::new(vec![track_record("T1", "A1")], vec![artist_record("AR1")]);

        let hydrator = Hydrator::new(
            &catalog,
            &index,
            BatchConfig::default(),
            RetryConfig::default(),
        );
        let report = hydrator.run().await;

        // Tracks hydrated before the album endpoint failed.
        assert_eq!(report.tracks.len(), 1);
        assert_eq!(report.tracks[0].list_rank, 1);
        assert!(matches!(
            report.failure,
            Some(HydrateError::Catalog(CatalogError::Api(500, _)))
        ));
        // No artist call was issued after the failure.
        assert!(report.artists.is_empty());
    }

    #[tokio::test]
    async fn transient_failures_are_retried_within_budget() {
        let index = indexed("T1", "A1", "AR1");
        let catalog =
            StubCatalog::new(vec![track_record("T1", "A1")], vec![]).failing_first(2);

        let hydrator = Hydrator::new(
            &catalog,
            &index,
            BatchConfig::default(),
            RetryConfig { transient_attempts: 2 },
        );

        let mut tracks = Vec::new();
        hydrator.hydrate_tracks(&mut tracks).await.unwrap();
        assert_eq!(tracks.len(), 1);
    }

    #[tokio::test]
    async fn transient_failures_beyond_budget_surface() {
        let index = indexed("T1", "A1", "AR1");
        let catalog =
            StubCatalog::new(vec![track_record("T1", "A1")], vec![]).failing_first(3);

        let hydrator = Hydrator::new(
            &catalog,
            &index,
            BatchConfig::default(),
            RetryConfig { transient_attempts: 2 },
        );

        let mut tracks = Vec::new();
        let result = hydrator.hydrate_tracks(&mut tracks).await;
        assert!(matches!(
            result,
            Err(HydrateError::Catalog(CatalogError::TransientNetwork(_)))
        ));
        assert!(tracks.is_empty());
    }

    #[test]
    fn album_rank_state_maps_to_optional_rank() {
        let mut index = ReconciliationIndex::new();
        index
            .record_resolution(
                &ResolvedMatch {
                    track_id: None,
                    album_id: "A1".to_string(),
                    artist_ids: vec![],
                },
                5,
            )
            .unwrap();
        index
            .record_resolution(
                &ResolvedMatch {
                    track_id: Some("T1".to_string()),
                    album_id: "A2".to_string(),
                    artist_ids: vec![],
                },
                6,
            )
            .unwrap();

        assert_eq!(index.album_rank("A1").unwrap().rank(), Some(5));
        assert_eq!(index.album_rank("A2").unwrap().rank(), None);
    }
}
