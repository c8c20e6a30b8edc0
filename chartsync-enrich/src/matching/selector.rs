//! Best-candidate selection over a provider search result

use crate::matching::similarity::score;
use crate::models::{ItemKind, ResolvedMatch, SearchCandidate};
use thiserror::Error;

/// Match selection errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchError {
    /// The search returned no candidates. Recoverable: the caller skips
    /// the item and continues the run.
    #[error("No candidates returned for query")]
    NoCandidates,
}

/// Pick the best candidate for `query` and extract its IDs.
///
/// A single candidate is selected without scoring. With several, every
/// candidate is scored and the FIRST one achieving the maximum score
/// wins; ties break to provider order, never to the last occurrence.
pub fn select(
    candidates: &[SearchCandidate],
    query: &str,
    kind: ItemKind,
) -> Result<ResolvedMatch, MatchError> {
    let selected = match candidates {
        [] => return Err(MatchError::NoCandidates),
        [only] => only,
        _ => best_scoring(candidates, query),
    };

    Ok(extract(selected, kind))
}

/// First candidate achieving the maximum score, in provider order
fn best_scoring<'a>(candidates: &'a [SearchCandidate], query: &str) -> &'a SearchCandidate {
    let mut best = &candidates[0];
    let mut best_score = score(&best.name, query);

    for candidate in &candidates[1..] {
        let candidate_score = score(&candidate.name, query);
        if candidate_score > best_score {
            best = candidate;
            best_score = candidate_score;
        }
    }

    best
}

fn extract(candidate: &SearchCandidate, kind: ItemKind) -> ResolvedMatch {
    match kind {
        ItemKind::Track => ResolvedMatch {
            track_id: Some(candidate.id.clone()),
            // A track candidate without a parent album is malformed; the
            // empty ID is rejected by the index rather than papered over.
            album_id: candidate.album_id.clone().unwrap_or_default(),
            artist_ids: candidate.artist_ids.clone(),
        },
        ItemKind::Album => ResolvedMatch {
            track_id: None,
            album_id: candidate.id.clone(),
            artist_ids: candidate.artist_ids.clone(),
        },
    }
}
