//! Export writers for the hydrated dataset
//!
//! Every entity type declares its export surface as a static field list
//! plus a value row; the writers never reflect over the structs. JSON is
//! lossless. CSV and SQL are lossless for scalar fields; list-typed
//! fields are rendered as a set-like literal (`{a,b}`) with duplicates
//! collapsed and member order normalized — a deliberate, documented
//! lossy transform applied only to those two sinks.
//!
//! JSON and CSV files are written even for empty datasets (an empty
//! array, a header-only file); the SQL writer skips empty datasets since
//! an `INSERT` with zero rows is not valid syntax.

pub mod csv;
pub mod json;
pub mod sql;

use crate::models::{Album, Artist, Track};
use chartsync_common::Result;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

/// One exported cell
pub enum ExportValue {
    Text(String),
    Int(i64),
    OptInt(Option<i64>),
    Bool(bool),
    List(Vec<String>),
}

/// Statically declared export surface of an entity type
pub trait ExportRecord {
    /// Table name and output file stem
    const TABLE: &'static str;

    fn fields() -> &'static [&'static str];

    /// Values in the same order as [`fields`](ExportRecord::fields)
    fn values(&self) -> Vec<ExportValue>;
}

/// Render a list field as the set-like export literal
pub(crate) fn set_literal(items: &[String]) -> String {
    let unique: BTreeSet<&str> = items.iter().map(String::as_str).collect();
    let mut out = String::from("{");
    for (i, item) in unique.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(item);
    }
    out.push('}');
    out
}

impl ExportRecord for Track {
    const TABLE: &'static str = "tracks";

    fn fields() -> &'static [&'static str] {
        &[
            "track_id",
            "track_name",
            "artist_ids",
            "list_rank",
            "is_explicit",
            "popularity",
            "duration_ms",
            "track_number_on_album",
            "external_url",
            "uri",
            "released_year",
            "album_id",
        ]
    }

    fn values(&self) -> Vec<ExportValue> {
        vec![
            ExportValue::Text(self.track_id.clone()),
            ExportValue::Text(self.track_name.clone()),
            ExportValue::List(self.artist_ids.clone()),
            ExportValue::Int(self.list_rank as i64),
            ExportValue::Bool(self.is_explicit),
            ExportValue::Int(self.popularity as i64),
            ExportValue::Int(self.duration_ms as i64),
            ExportValue::Int(self.track_number_on_album as i64),
            ExportValue::Text(self.external_url.clone()),
            ExportValue::Text(self.uri.clone()),
            ExportValue::OptInt(self.released_year.map(i64::from)),
            ExportValue::Text(self.album_id.clone()),
        ]
    }
}

impl ExportRecord for Album {
    const TABLE: &'static str = "albums";

    fn fields() -> &'static [&'static str] {
        &[
            "album_id",
            "album_name",
            "list_rank",
            "popularity",
            "total_tracks",
            "label",
            "released_year",
            "album_image",
            "external_url",
            "uri",
            "artist_ids",
        ]
    }

    fn values(&self) -> Vec<ExportValue> {
        vec![
            ExportValue::Text(self.album_id.clone()),
            ExportValue::Text(self.album_name.clone()),
            ExportValue::OptInt(self.list_rank.map(i64::from)),
            ExportValue::Int(self.popularity as i64),
            ExportValue::Int(self.total_tracks as i64),
            ExportValue::Text(self.label.clone()),
            ExportValue::OptInt(self.released_year.map(i64::from)),
            ExportValue::Text(self.album_image.clone()),
            ExportValue::Text(self.external_url.clone()),
            ExportValue::Text(self.uri.clone()),
            ExportValue::List(self.artist_ids.clone()),
        ]
    }
}

impl ExportRecord for Artist {
    const TABLE: &'static str = "artists";

    fn fields() -> &'static [&'static str] {
        &[
            "artist_id",
            "artist_name",
            "albums",
            "genres",
            "total_followers",
            "popularity",
            "external_url",
            "uri",
        ]
    }

    fn values(&self) -> Vec<ExportValue> {
        vec![
            ExportValue::Text(self.artist_id.clone()),
            ExportValue::Text(self.artist_name.clone()),
            ExportValue::List(self.albums.clone()),
            ExportValue::List(self.genres.clone()),
            ExportValue::Int(self.total_followers as i64),
            ExportValue::Int(self.popularity as i64),
            ExportValue::Text(self.external_url.clone()),
            ExportValue::Text(self.uri.clone()),
        ]
    }
}

/// Write one entity collection in all three formats under `out_dir`.
fn export_entity<R: ExportRecord + serde::Serialize>(
    records: &[R],
    out_dir: &Path,
    sql_schema: &str,
) -> Result<()> {
    json::write_json(records, &out_dir.join(format!("{}.json", R::TABLE)))?;
    csv::write_csv(records, &out_dir.join(format!("{}.csv", R::TABLE)))?;
    sql::write_sql(records, sql_schema, &out_dir.join(format!("{}.sql", R::TABLE)))?;
    Ok(())
}

/// Export the full dataset (or whatever a partial run accumulated).
pub fn export_dataset(
    tracks: &[Track],
    albums: &[Album],
    artists: &[Artist],
    out_dir: &Path,
    sql_schema: &str,
) -> Result<()> {
    std::fs::create_dir_all(out_dir)?;

    export_entity(tracks, out_dir, sql_schema)?;
    export_entity(albums, out_dir, sql_schema)?;
    export_entity(artists, out_dir, sql_schema)?;

    info!(
        dir = %out_dir.display(),
        tracks = tracks.len(),
        albums = albums.len(),
        artists = artists.len(),
        "Dataset exported"
    );
    Ok(())
}
