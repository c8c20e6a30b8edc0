//! Reconciliation index: deduplicated catalog IDs discovered during
//! resolution, with merge-on-rediscovery semantics
//!
//! The index is the only mutable state of the resolution phase. It is
//! owned mutably while list items resolve and borrowed read-only during
//! hydration, so chunk boundaries are computed from a fully populated,
//! frozen view.

use crate::models::ResolvedMatch;
use std::collections::HashMap;
use thiserror::Error;

/// Index contract violations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    /// A resolution arrived without an album ID. This is an upstream
    /// resolver bug and aborts the run rather than being swallowed.
    #[error("Resolution for rank {rank} carries no album id")]
    InvalidResolution { rank: u32 },
}

/// Which of the three ID collections a batch plan draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Tracks,
    Albums,
    Artists,
}

/// Rank state of an indexed album.
///
/// `Unranked` marks albums only ever seen as a track's parent. Once a
/// ranked album-type resolution supplies a rank it never reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlbumRank {
    Unranked,
    Ranked(u32),
}

impl AlbumRank {
    pub fn rank(&self) -> Option<u32> {
        match self {
            AlbumRank::Unranked => None,
            AlbumRank::Ranked(rank) => Some(*rank),
        }
    }
}

/// HashMap with a key vector preserving first-insertion order.
///
/// Batch chunk contents must be reproducible across runs for the same
/// input list, so iteration order cannot be left to the hasher.
#[derive(Debug)]
struct OrderedMap<V> {
    keys: Vec<String>,
    entries: HashMap<String, V>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            entries: HashMap::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    /// Insert or overwrite; the key keeps its original position.
    fn insert(&mut self, key: &str, value: V) {
        if !self.entries.contains_key(key) {
            self.keys.push(key.to_string());
        }
        self.entries.insert(key.to_string(), value);
    }

    fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn len(&self) -> usize {
        self.keys.len()
    }

    /// Keys in first-insertion order
    fn keys(&self) -> &[String] {
        &self.keys
    }
}

/// In-memory store of discovered entity IDs and their provenance
#[derive(Debug, Default)]
pub struct ReconciliationIndex {
    /// track ID -> list rank (last write wins)
    tracks: OrderedMap<u32>,
    /// album ID -> rank state
    albums: OrderedMap<AlbumRank>,
    /// artist ID -> associated album IDs, deduplicated, insertion order
    artists: OrderedMap<Vec<String>>,
}

impl ReconciliationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one resolved list item into the index.
    ///
    /// Track ranks refresh on rediscovery (last write wins). Album ranks
    /// only ever flow from album-type resolutions; a track's parent album
    /// is indexed unranked. Artist album-sets accumulate with set
    /// semantics, so recording the same pair twice is a no-op.
    pub fn record_resolution(
        &mut self,
        resolved: &ResolvedMatch,
        rank: u32,
    ) -> Result<(), IndexError> {
        if resolved.album_id.is_empty() {
            return Err(IndexError::InvalidResolution { rank });
        }

        if let Some(track_id) = &resolved.track_id {
            self.tracks.insert(track_id, rank);
        }

        let authoritative = resolved.track_id.is_none();
        self.attach_rank_if_authoritative(&resolved.album_id, rank, authoritative);

        for artist_id in &resolved.artist_ids {
            match self.artists.get_mut(artist_id) {
                Some(albums) => {
                    if !albums.contains(&resolved.album_id) {
                        albums.push(resolved.album_id.clone());
                    }
                }
                None => {
                    self.artists.insert(artist_id, vec![resolved.album_id.clone()]);
                }
            }
        }

        Ok(())
    }

    /// The album-rank merge rule, named because it is order-sensitive:
    /// a rank attaches only when the resolution itself was a ranked
    /// album-type item (`authoritative`); parent-album references insert
    /// the unranked sentinel and never overwrite an existing rank.
    fn attach_rank_if_authoritative(&mut self, album_id: &str, rank: u32, authoritative: bool) {
        if authoritative {
            self.albums.insert(album_id, AlbumRank::Ranked(rank));
        } else if !self.albums.contains(album_id) {
            self.albums.insert(album_id, AlbumRank::Unranked);
        }
    }

    /// Split one collection's IDs into consecutive chunks of at most
    /// `max_batch_size`, preserving insertion order.
    pub fn plan_batches(&self, kind: EntityKind, max_batch_size: usize) -> Vec<Vec<String>> {
        debug_assert!(max_batch_size > 0, "batch size must be positive");
        let keys = match kind {
            EntityKind::Tracks => self.tracks.keys(),
            EntityKind::Albums => self.albums.keys(),
            EntityKind::Artists => self.artists.keys(),
        };
        keys.chunks(max_batch_size.max(1))
            .map(|chunk| chunk.to_vec())
            .collect()
    }

    pub fn track_rank(&self, track_id: &str) -> Option<u32> {
        self.tracks.get(track_id).copied()
    }

    pub fn album_rank(&self, album_id: &str) -> Option<AlbumRank> {
        self.albums.get(album_id).copied()
    }

    pub fn contains_album(&self, album_id: &str) -> bool {
        self.albums.contains(album_id)
    }

    pub fn artist_albums(&self, artist_id: &str) -> Option<&[String]> {
        self.artists.get(artist_id).map(Vec::as_slice)
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn album_count(&self) -> usize {
        self.albums.len()
    }

    pub fn artist_count(&self) -> usize {
        self.artists.len()
    }
}
