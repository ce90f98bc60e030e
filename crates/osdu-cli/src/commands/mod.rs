//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod config;
pub mod entitlements;
pub mod health;
pub mod ingest;
pub mod legal;
pub mod schema;
pub mod search;
pub mod status;
pub mod unit;
pub mod verify;
pub mod version;
pub mod workflow;

use crate::error::Result;
use clap::ValueEnum;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use serde::Serialize;
use serde_json::Value;

/// How command results are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
}

/// A table column: header and JSON pointer into each row
pub(crate) type Column = (&'static str, &'static str);

pub(crate) fn new_table(headers: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(headers);
    table
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Render a service listing
///
/// JSON output is the response as received. Table output takes the array at
/// `rows_at` and one cell per column, sorted by the first column.
pub(crate) fn render_listing(
    response: &Value,
    rows_at: &str,
    columns: &[Column],
    output: OutputFormat,
) -> Result<String> {
    if output == OutputFormat::Json {
        return to_json(response);
    }

    let mut rows: Vec<Vec<String>> = response
        .pointer(rows_at)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .map(|row| columns.iter().map(|(_, at)| cell(row, at)).collect())
        .collect();
    rows.sort();

    let mut table = new_table(columns.iter().map(|(header, _)| *header).collect());
    for row in rows {
        table.add_row(row);
    }
    Ok(table.to_string())
}

fn cell(row: &Value, pointer: &str) -> String {
    match row.pointer(pointer) {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
