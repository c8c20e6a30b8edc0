//! JSON writer; the only fully lossless export path

use chartsync_common::{Error, Result};
use serde::Serialize;
use std::path::Path;

pub fn write_json<T: Serialize>(records: &[T], path: &Path) -> Result<()> {
    let serialized = serde_json::to_string_pretty(records)
        .map_err(|e| Error::Internal(format!("JSON serialize failed: {e}")))?;
    std::fs::write(path, serialized)?;
    Ok(())
}
