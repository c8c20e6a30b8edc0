//! End-to-end pipeline tests against an in-memory catalog stub

use std::collections::HashMap;

use chartsync_common::config::{BatchConfig, RetryConfig};
use chartsync_enrich::catalog::types::{
    AlbumRecord, AlbumRef, ArtistRecord, ArtistRef, ExternalUrls, Followers, Image, TrackRecord,
};
use chartsync_enrich::catalog::{CatalogApi, CatalogError};
use chartsync_enrich::index::AlbumRank;
use chartsync_enrich::models::{ItemKind, RawListItem, SearchCandidate};
use chartsync_enrich::pipeline;

/// In-memory catalog: canned search candidates keyed by query, canned
/// records keyed by ID, optional failure injection per endpoint.
#[derive(Default)]
struct FakeCatalog {
    searches: HashMap<String, Vec<SearchCandidate>>,
    tracks: HashMap<String, TrackRecord>,
    albums: HashMap<String, AlbumRecord>,
    artists: HashMap<String, ArtistRecord>,
    fail_albums: bool,
}

impl CatalogApi for FakeCatalog {
    async fn search(
        &self,
        query: &str,
        _kind: ItemKind,
    ) -> Result<Vec<SearchCandidate>, CatalogError> {
        Ok(self.searches.get(query).cloned().unwrap_or_default())
    }

    async fn tracks(&self, ids: &[String]) -> Result<Vec<TrackRecord>, CatalogError> {
        Ok(ids.iter().filter_map(|id| self.tracks.get(id).cloned()).collect())
    }

    async fn albums(&self, ids: &[String]) -> Result<Vec<AlbumRecord>, CatalogError> {
        if self.fail_albums {
            return Err(CatalogError::Api(500, "album endpoint down".into()));
        }
        Ok(ids.iter().filter_map(|id| self.albums.get(id).cloned()).collect())
    }

    async fn artists(&self, ids: &[String]) -> Result<Vec<ArtistRecord>, CatalogError> {
        Ok(ids.iter().filter_map(|id| self.artists.get(id).cloned()).collect())
    }
}

fn track_item(rank: u32, artist: &str, title: &str) -> RawListItem {
    serde_json::from_value(serde_json::json!({
        "rank": rank,
        "artist": artist,
        "title": title,
        "type": "track",
    }))
    .unwrap()
}

fn album_item(rank: u32, artist: &str, title: &str) -> RawListItem {
    serde_json::from_value(serde_json::json!({
        "rank": rank,
        "artist": artist,
        "title": title,
        "type": "album",
    }))
    .unwrap()
}

fn track_candidate(id: &str, name: &str, album: &str, artist: &str) -> SearchCandidate {
    SearchCandidate {
        id: id.to_string(),
        name: name.to_string(),
        album_id: Some(album.to_string()),
        artist_ids: vec![artist.to_string()],
    }
}

fn track_record(id: &str, name: &str, album: &str, artist: &str) -> TrackRecord {
    TrackRecord {
        id: id.to_string(),
        name: name.to_string(),
        album: AlbumRef {
            id: album.to_string(),
            release_date: "1975-10-31".to_string(),
        },
        artists: vec![ArtistRef {
            id: artist.to_string(),
        }],
        duration_ms: 355_000,
        explicit: false,
        popularity: 85,
        track_number: 11,
        external_urls: ExternalUrls {
            spotify: format!("https://example/track/{id}"),
        },
        uri: format!("catalog:track:{id}"),
    }
}

fn album_record(id: &str, name: &str, artist: &str) -> AlbumRecord {
    AlbumRecord {
        id: id.to_string(),
        name: name.to_string(),
        popularity: 72,
        total_tracks: 12,
        label: "EMI".to_string(),
        release_date: "1975-10-31".to_string(),
        images: vec![Image {
            url: format!("https://example/image/{id}"),
        }],
        external_urls: ExternalUrls {
            spotify: format!("https://example/album/{id}"),
        },
        uri: format!("catalog:album:{id}"),
        artists: vec![ArtistRef {
            id: artist.to_string(),
        }],
    }
}

fn artist_record(id: &str, name: &str) -> ArtistRecord {
    ArtistRecord {
        id: id.to_string(),
        name: name.to_string(),
        genres: vec!["rock".to_string()],
        followers: Followers { total: 1_000_000 },
        popularity: 90,
        external_urls: ExternalUrls {
            spotify: format!("https://example/artist/{id}"),
        },
        uri: format!("catalog:artist:{id}"),
    }
}

/// Catalog around the canonical single-track scenario: three candidates
/// where only the first is the exact title.
fn queen_catalog() -> FakeCatalog {
    let mut catalog = FakeCatalog::default();
    catalog.searches.insert(
        "Queen Bohemian Rhapsody".to_string(),
        vec![
            track_candidate("T1", "Bohemian Rhapsody", "A1", "AR1"),
            track_candidate("T2", "Bohemian Rhapsody - Remastered", "A2", "AR1"),
            track_candidate("T3", "Somebody to Love", "A3", "AR1"),
        ],
    );
    catalog.tracks.insert(
        "T1".to_string(),
        track_record("T1", "Bohemian Rhapsody", "A1", "AR1"),
    );
    catalog.albums.insert(
        "A1".to_string(),
        album_record("A1", "A Night at the Opera", "AR1"),
    );
    catalog
        .artists
        .insert("AR1".to_string(), artist_record("AR1", "Queen"));
    catalog
}

#[tokio::test]
async fn resolution_picks_exact_title_and_indexes_provenance() {
    let catalog = queen_catalog();
    let items = [track_item(1, "Queen", "Bohemian Rhapsody")];

    let report = pipeline::run(
        &catalog,
        &items,
        BatchConfig::default(),
        RetryConfig::default(),
    )
    .await;

    assert!(report.is_complete());
    assert_eq!(report.resolved, 1);
    assert_eq!(report.skipped, 0);

    // Exact-title candidate won over the remaster and the unrelated hit.
    assert_eq!(report.index.track_rank("T1"), Some(1));
    assert_eq!(report.index.track_rank("T2"), None);
    // The parent album is indexed but carries no rank.
    assert_eq!(report.index.album_rank("A1"), Some(AlbumRank::Unranked));
    // The artist is associated with the parent album.
    assert_eq!(
        report.index.artist_albums("AR1"),
        Some(&["A1".to_string()][..])
    );
}

#[tokio::test]
async fn full_run_hydrates_all_three_entity_kinds() {
    let catalog = queen_catalog();
    let items = [track_item(1, "Queen", "Bohemian Rhapsody")];

    let report = pipeline::run(
        &catalog,
        &items,
        BatchConfig::default(),
        RetryConfig::default(),
    )
    .await;

    assert!(report.is_complete());

    assert_eq!(report.tracks.len(), 1);
    let track = &report.tracks[0];
    assert_eq!(track.track_id, "T1");
    assert_eq!(track.list_rank, 1);
    assert_eq!(track.album_id, "A1");
    assert_eq!(track.released_year, Some(1975));

    assert_eq!(report.albums.len(), 1);
    let album = &report.albums[0];
    assert_eq!(album.album_id, "A1");
    assert_eq!(album.list_rank, None);
    assert_eq!(album.label, "EMI");

    assert_eq!(report.artists.len(), 1);
    let artist = &report.artists[0];
    assert_eq!(artist.artist_id, "AR1");
    assert_eq!(artist.albums, vec!["A1".to_string()]);
}

#[tokio::test]
async fn album_type_resolution_ranks_album_already_seen_as_parent() {
    let mut catalog = queen_catalog();
    // The same album later appears as a ranked album-type list item.
    catalog.searches.insert(
        "Queen A Night at the Opera".to_string(),
        vec![SearchCandidate {
            id: "A1".to_string(),
            name: "A Night at the Opera".to_string(),
            album_id: None,
            artist_ids: vec!["AR1".to_string()],
        }],
    );

    let items = [
        track_item(1, "Queen", "Bohemian Rhapsody"),
        album_item(2, "Queen", "A Night at the Opera"),
    ];

    let report = pipeline::run(
        &catalog,
        &items,
        BatchConfig::default(),
        RetryConfig::default(),
    )
    .await;

    assert!(report.is_complete());
    assert_eq!(report.index.album_rank("A1"), Some(AlbumRank::Ranked(2)));
    // Hydrated album carries the authoritative rank.
    assert_eq!(report.albums[0].list_rank, Some(2));
}

#[tokio::test]
async fn later_parent_reference_keeps_album_rank() {
    let mut catalog = queen_catalog();
    catalog.searches.insert(
        "Queen A Night at the Opera".to_string(),
        vec![SearchCandidate {
            id: "A1".to_string(),
            name: "A Night at the Opera".to_string(),
            album_id: None,
            artist_ids: vec!["AR1".to_string()],
        }],
    );
    // Another track from the same album, resolved after the album itself.
    catalog.searches.insert(
        "Queen Love of My Life".to_string(),
        vec![track_candidate("T4", "Love of My Life", "A1", "AR1")],
    );
    catalog.tracks.insert(
        "T4".to_string(),
        track_record("T4", "Love of My Life", "A1", "AR1"),
    );

    let items = [
        album_item(1, "Queen", "A Night at the Opera"),
        track_item(2, "Queen", "Love of My Life"),
    ];

    let report = pipeline::run(
        &catalog,
        &items,
        BatchConfig::default(),
        RetryConfig::default(),
    )
    .await;

    assert!(report.is_complete());
    // The track-parent reference did not clear the album's rank.
    assert_eq!(report.index.album_rank("A1"), Some(AlbumRank::Ranked(1)));
    assert_eq!(report.index.track_rank("T4"), Some(2));
}

#[tokio::test]
async fn unmatched_items_skip_but_rest_of_run_completes() {
    let catalog = queen_catalog();
    let items = [
        track_item(1, "Nobody", "Unknown Song"),
        track_item(2, "Queen", "Bohemian Rhapsody"),
    ];

    let report = pipeline::run(
        &catalog,
        &items,
        BatchConfig::default(),
        RetryConfig::default(),
    )
    .await;

    assert!(report.is_complete());
    assert_eq!(report.skipped, 1);
    assert_eq!(report.resolved, 1);
    assert_eq!(report.tracks.len(), 1);
    assert_eq!(report.tracks[0].list_rank, 2);
}

#[tokio::test]
async fn hydration_failure_retains_earlier_entities() {
    let mut catalog = queen_catalog();
    catalog.fail_albums = true;

    let items = [track_item(1, "Queen", "Bohemian Rhapsody")];

    let report = pipeline::run(
        &catalog,
        &items,
        BatchConfig::default(),
        RetryConfig::default(),
    )
    .await;

    assert!(!report.is_complete());
    // Tracks hydrated before the album endpoint failed are retained for
    // partial export; nothing after the failure was fetched.
    assert_eq!(report.tracks.len(), 1);
    assert!(report.albums.is_empty());
    assert!(report.artists.is_empty());
    // The index survives for inspection.
    assert_eq!(report.index.track_rank("T1"), Some(1));
}

#[tokio::test]
async fn same_artist_across_items_accumulates_albums_without_duplicates() {
    let mut catalog = queen_catalog();
    catalog.searches.insert(
        "Queen Love of My Life".to_string(),
        vec![track_candidate("T4", "Love of My Life", "A1", "AR1")],
    );
    catalog.tracks.insert(
        "T4".to_string(),
        track_record("T4", "Love of My Life", "A1", "AR1"),
    );

    let items = [
        track_item(1, "Queen", "Bohemian Rhapsody"),
        track_item(2, "Queen", "Love of My Life"),
    ];

    let report = pipeline::run(
        &catalog,
        &items,
        BatchConfig::default(),
        RetryConfig::default(),
    )
    .await;

    assert!(report.is_complete());
    // Both tracks share the album; the artist's set holds it once.
    assert_eq!(
        report.index.artist_albums("AR1"),
        Some(&["A1".to_string()][..])
    );
    assert_eq!(report.artists.len(), 1);
    assert_eq!(report.artists[0].albums, vec!["A1".to_string()]);
}
