//! SQL insert-script writer over the static export field lists

use crate::export::{set_literal, ExportRecord, ExportValue};
use chartsync_common::Result;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Write one `INSERT INTO <schema>.<table> (...) VALUES` statement with a
/// tuple row per record. An empty dataset produces no file (zero-row
/// inserts are not valid syntax).
pub fn write_sql<R: ExportRecord>(records: &[R], schema: &str, path: &Path) -> Result<()> {
    if records.is_empty() {
        debug!(table = R::TABLE, "No records, skipping SQL export");
        return Ok(());
    }

    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(
        writer,
        "INSERT INTO {}.{} ({}) VALUES",
        schema,
        R::TABLE,
        R::fields().join(", ")
    )?;

    for (i, record) in records.iter().enumerate() {
        let row: Vec<String> = record.values().iter().map(render).collect();
        let terminator = if i + 1 == records.len() { ";" } else { "," };
        writeln!(writer, "({}){}", row.join(", "), terminator)?;
    }

    writer.flush()?;
    Ok(())
}

fn render(value: &ExportValue) -> String {
    match value {
        ExportValue::Text(text) => quote(text),
        ExportValue::Int(n) => n.to_string(),
        ExportValue::OptInt(Some(n)) => n.to_string(),
        ExportValue::OptInt(None) => "NULL".to_string(),
        ExportValue::Bool(true) => "TRUE".to_string(),
        ExportValue::Bool(false) => "FALSE".to_string(),
        ExportValue::List(items) => quote(&set_literal(items)),
    }
}

/// Single-quote a string literal, doubling embedded quotes. Content is
/// preserved verbatim; nothing is stripped.
fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
