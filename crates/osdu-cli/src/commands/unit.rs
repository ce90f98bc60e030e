//! `osdu unit` command implementation

use super::{render_listing, Column, OutputFormat};
use crate::api::{endpoints, OsduClient, Service};
use crate::config::CliConfig;
use crate::error::Result;
use serde_json::Value;

const UNIT_COLUMNS: &[Column] = &[
    ("Symbol", "/displaySymbol"),
    ("Name", "/name"),
    ("Source", "/source"),
];

pub async fn list(client: &OsduClient) -> Result<Value> {
    client
        .get_json(Service::Unit, &endpoints::unit_list_path())
        .await
}

/// List the unit catalog
pub async fn run_list(config: &CliConfig, output: OutputFormat) -> Result<()> {
    let client = OsduClient::new(config)?;
    let response = list(&client).await?;
    println!("{}", render_list(&response, output)?);
    Ok(())
}

pub fn render_list(response: &Value, output: OutputFormat) -> Result<String> {
    render_listing(response, "/units", UNIT_COLUMNS, output)
}
