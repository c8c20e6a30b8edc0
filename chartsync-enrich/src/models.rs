//! Input list items, resolution output, and hydrated entity records

use chartsync_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Whether a curated list entry names a song or a whole album
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Track,
    Album,
}

impl ItemKind {
    /// Search type string understood by the catalog API
    pub fn as_search_type(&self) -> &'static str {
        match self {
            ItemKind::Track => "track",
            ItemKind::Album => "album",
        }
    }
}

/// One entry of the curated input list. Immutable once loaded.
///
/// The free-text annotations (description, writers, released year) are
/// carried through unchanged; the pipeline never interprets them.
#[derive(Debug, Clone, Deserialize)]
pub struct RawListItem {
    /// 1-based list position, unique across the list
    pub rank: u32,
    pub title: String,
    pub artist: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub writers: String,
    #[serde(default)]
    pub released_year: Option<i32>,
}

/// A provider search-result entry as seen by the match selector.
///
/// Ephemeral: exists only during match selection. For track candidates
/// `album_id` names the parent album; for album candidates `id` itself is
/// the album ID and `album_id` is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCandidate {
    pub id: String,
    pub name: String,
    pub album_id: Option<String>,
    pub artist_ids: Vec<String>,
}

/// Output of match selection for one list item.
///
/// `track_id` is `None` when the item resolved as an album; it is never an
/// empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMatch {
    pub track_id: Option<String>,
    pub album_id: String,
    pub artist_ids: Vec<String>,
}

/// Load the curated list from a JSON file.
///
/// Ranks must be unique and positive; duplicates are a load error since
/// rank is the merge key for everything downstream.
pub fn load_list(path: &Path) -> Result<Vec<RawListItem>> {
    let content = std::fs::read_to_string(path)?;
    let items: Vec<RawListItem> = serde_json::from_str(&content)
        .map_err(|e| Error::InvalidInput(format!("Parse {} failed: {}", path.display(), e)))?;

    let mut seen = HashSet::new();
    for item in &items {
        if item.rank == 0 {
            return Err(Error::InvalidInput(format!(
                "Rank 0 for \"{}\" (ranks are 1-based)",
                item.title
            )));
        }
        if !seen.insert(item.rank) {
            return Err(Error::InvalidInput(format!(
                "Duplicate rank {} in input list",
                item.rank
            )));
        }
    }

    Ok(items)
}

/// Fully materialized track record. Created once per hydration response
/// item, never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Track {
    pub track_id: String,
    pub track_name: String,
    pub artist_ids: Vec<String>,
    pub list_rank: u32,
    pub is_explicit: bool,
    pub popularity: u32,
    pub duration_ms: u64,
    pub track_number_on_album: u32,
    pub external_url: String,
    pub uri: String,
    pub released_year: Option<i32>,
    pub album_id: String,
}

/// Fully materialized album record.
///
/// `list_rank` is `None` for albums only ever referenced as a track's
/// parent (never themselves a ranked list entry).
#[derive(Debug, Clone, Serialize)]
pub struct Album {
    pub album_id: String,
    pub album_name: String,
    pub list_rank: Option<u32>,
    pub popularity: u32,
    pub total_tracks: u32,
    pub label: String,
    pub released_year: Option<i32>,
    pub album_image: String,
    pub external_url: String,
    pub uri: String,
    pub artist_ids: Vec<String>,
}

/// Fully materialized artist record with the albums the list associated
/// with the artist.
#[derive(Debug, Clone, Serialize)]
pub struct Artist {
    pub artist_id: String,
    pub artist_name: String,
    pub albums: Vec<String>,
    pub genres: Vec<String>,
    pub total_followers: u64,
    pub popularity: u32,
    pub external_url: String,
    pub uri: String,
}
