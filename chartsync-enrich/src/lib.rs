//! chartsync-enrich library interface
//!
//! Enriches a hand-curated ranked list of songs/albums with canonical
//! metadata from an external music catalog, producing a deduplicated,
//! cross-referenced dataset of tracks, albums, and artists.
//!
//! Exposed as a library so integration tests can drive the pipeline
//! against stub catalog providers.

pub mod auth;
pub mod catalog;
pub mod export;
pub mod hydrate;
pub mod index;
pub mod matching;
pub mod models;
pub mod pipeline;

pub use crate::index::ReconciliationIndex;
pub use crate::models::{ItemKind, RawListItem, ResolvedMatch};
pub use crate::pipeline::{run, RunReport};
