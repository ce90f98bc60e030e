//! `osdu legal` command implementation

use super::{render_listing, Column, OutputFormat};
use crate::api::{endpoints, OsduClient, Service};
use crate::config::CliConfig;
use crate::error::Result;
use serde_json::Value;

const LEGAL_TAG_COLUMNS: &[Column] = &[
    ("Name", "/name"),
    ("Description", "/description"),
    ("Classification", "/properties/securityClassification"),
    ("Personal Data", "/properties/personalData"),
    ("Export", "/properties/exportClassification"),
    ("Origin", "/properties/originator"),
];

pub async fn list_tags(client: &OsduClient) -> Result<Value> {
    client
        .get_json(Service::Legal, endpoints::legal_tags_path())
        .await
}

/// List the legal tags of the partition
pub async fn run_list_tags(config: &CliConfig, output: OutputFormat) -> Result<()> {
    let client = OsduClient::new(config)?;
    let response = list_tags(&client).await?;
    println!("{}", render_tags(&response, output)?);
    Ok(())
}

pub fn render_tags(response: &Value, output: OutputFormat) -> Result<String> {
    render_listing(response, "/legalTags", LEGAL_TAG_COLUMNS, output)
}
