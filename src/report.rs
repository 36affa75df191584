// ABOUTME: Rendering of the catalog result for standard output
// ABOUTME: Produces the single labelled line in text or JSON form

use crate::postgres::cursor::{ResultSet, Row};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::io::Write;

/// Label printed before the rendered rows
pub const REPORT_LABEL: &str = "Available extensions";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// `Available extensions: [("13428", "plpgsql", ...), ...]`
    #[default]
    Text,
    /// One JSON object with one entry per row
    Json,
}

/// Render the result set as one line, without the trailing newline
pub fn render(result: &ResultSet, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Text => Ok(render_text(result)),
        OutputFormat::Json => serde_json::to_string(&JsonReport {
            label: REPORT_LABEL,
            extensions: result,
        }),
    }
}

/// Write the rendered line to `out`
pub fn report<W: Write>(out: &mut W, result: &ResultSet, format: OutputFormat) -> std::io::Result<()> {
    let line = render(result, format).map_err(std::io::Error::other)?;
    writeln!(out, "{}", line)?;
    out.flush()
}

fn render_text(result: &ResultSet) -> String {
    let rows: Vec<String> = result.rows().iter().map(render_row).collect();
    format!("{}: [{}]", REPORT_LABEL, rows.join(", "))
}

fn render_row(row: &Row) -> String {
    let mut out = String::from("(");
    for (i, value) in row.values().iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        match value {
            // Debug quoting escapes embedded quotes and newlines, keeping output on one line
            Some(text) => out.push_str(&format!("{:?}", text)),
            None => out.push_str("NULL"),
        }
    }
    out.push(')');
    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    label: &'a str,
    #[serde(serialize_with = "serialize_rows")]
    extensions: &'a ResultSet,
}

/// Rows as objects keyed by column name, in server column order
fn serialize_rows<S: Serializer>(result: &&ResultSet, serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(result.len()))?;
    for row in result.rows() {
        seq.serialize_element(&JsonRow {
            columns: result.columns(),
            row,
        })?;
    }
    seq.end()
}

struct JsonRow<'a> {
    columns: &'a [String],
    row: &'a Row,
}

impl Serialize for JsonRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.row.len()))?;
        for (column, value) in self.columns.iter().zip(self.row.values()) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}
