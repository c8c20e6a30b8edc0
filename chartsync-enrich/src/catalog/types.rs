//! Wire types for the catalog API's search and bulk-lookup responses

use crate::models::SearchCandidate;
use serde::Deserialize;

/// Search response; the provider populates the page matching the
/// requested type and omits the other.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub tracks: Option<Page<Option<TrackRecord>>>,
    pub albums: Option<Page<Option<AlbumSummary>>>,
}

/// One page of search results. Entries can be null; callers drop them.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub items: Vec<T>,
}

/// Full track object, returned by search and by the bulk `/tracks` lookup
#[derive(Debug, Clone, Deserialize)]
pub struct TrackRecord {
    pub id: String,
    pub name: String,
    pub album: AlbumRef,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub explicit: bool,
    #[serde(default)]
    pub popularity: u32,
    #[serde(default)]
    pub track_number: u32,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub uri: String,
}

/// Album reference nested inside a track
#[derive(Debug, Clone, Deserialize)]
pub struct AlbumRef {
    pub id: String,
    #[serde(default)]
    pub release_date: String,
}

impl AlbumRef {
    pub fn release_year(&self) -> Option<i32> {
        release_year(&self.release_date)
    }
}

/// Simplified album object as returned by album search
#[derive(Debug, Clone, Deserialize)]
pub struct AlbumSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
}

/// Full album object from the bulk `/albums` lookup
#[derive(Debug, Clone, Deserialize)]
pub struct AlbumRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub popularity: u32,
    #[serde(default)]
    pub total_tracks: u32,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
}

impl AlbumRecord {
    pub fn release_year(&self) -> Option<i32> {
        release_year(&self.release_date)
    }
}

/// Full artist object from the bulk `/artists` lookup
#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub followers: Followers,
    #[serde(default)]
    pub popularity: u32,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRef {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Followers {
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: String,
}

/// Bulk `/tracks` response; the provider may return null for unknown ids
#[derive(Debug, Clone, Deserialize)]
pub struct TracksResponse {
    pub tracks: Vec<Option<TrackRecord>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumsResponse {
    pub albums: Vec<Option<AlbumRecord>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistsResponse {
    pub artists: Vec<Option<ArtistRecord>>,
}

impl SearchCandidate {
    pub fn from_track(record: TrackRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            album_id: Some(record.album.id),
            artist_ids: record.artists.into_iter().map(|a| a.id).collect(),
        }
    }

    pub fn from_album(summary: AlbumSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            album_id: None,
            artist_ids: summary.artists.into_iter().map(|a| a.id).collect(),
        }
    }
}

/// First four characters of a `YYYY-MM-DD`-style release date
fn release_year(release_date: &str) -> Option<i32> {
    release_date.get(..4).and_then(|y| y.parse().ok())
}
