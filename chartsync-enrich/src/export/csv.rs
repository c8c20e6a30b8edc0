//! CSV writer over the static export field lists

use crate::export::{set_literal, ExportRecord, ExportValue};
use chartsync_common::Result;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write one header line plus one line per record. Empty datasets still
/// get the header.
pub fn write_csv<R: ExportRecord>(records: &[R], path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "{}", R::fields().join(","))?;

    for record in records {
        let row: Vec<String> = record.values().iter().map(render).collect();
        writeln!(writer, "{}", row.join(","))?;
    }

    writer.flush()?;
    Ok(())
}

fn render(value: &ExportValue) -> String {
    match value {
        ExportValue::Text(text) => escape(text),
        ExportValue::Int(n) => n.to_string(),
        ExportValue::OptInt(Some(n)) => n.to_string(),
        ExportValue::OptInt(None) => String::new(),
        ExportValue::Bool(b) => b.to_string(),
        ExportValue::List(items) => escape(&set_literal(items)),
    }
}

/// Quote a field when it contains a delimiter, quote, or newline;
/// embedded quotes double.
fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
