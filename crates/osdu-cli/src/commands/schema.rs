//! `osdu schema` command implementation

use super::{render_listing, to_json, Column, OutputFormat};
use crate::api::{endpoints, OsduClient, SchemaIdentity, SchemaInfo, SchemaRegistration, Service};
use crate::config::CliConfig;
use crate::dataload::find_manifest_files;
use crate::error::{CliError, Result};
use serde_json::Value;
use std::path::Path;
use tracing::info;

/// Status given to schemas registered without one
pub const DEFAULT_SCHEMA_STATUS: &str = "DEVELOPMENT";

const SCHEMA_COLUMNS: &[Column] = &[
    ("Id", "/schemaIdentity/id"),
    ("Authority", "/schemaIdentity/authority"),
    ("Source", "/schemaIdentity/source"),
    ("Entity", "/schemaIdentity/entityType"),
    ("Major", "/schemaIdentity/schemaVersionMajor"),
    ("Minor", "/schemaIdentity/schemaVersionMinor"),
    ("Patch", "/schemaIdentity/schemaVersionPatch"),
    ("Status", "/status"),
];

/// Filters of a schema listing
#[derive(Debug, Clone, Default)]
pub struct SchemaFilter {
    pub authority: Option<String>,
    pub entity: Option<String>,
    pub source: Option<String>,
}

pub async fn list(client: &OsduClient, filter: &SchemaFilter) -> Result<Value> {
    let path = endpoints::schema_list_path(
        filter.authority.as_deref(),
        filter.entity.as_deref(),
        filter.source.as_deref(),
    );
    client.get_json(Service::Schema, &path).await
}

pub async fn get(client: &OsduClient, kind: &str) -> Result<Value> {
    client
        .get_json(Service::Schema, &endpoints::schema_path(kind))
        .await
}

/// Register every JSON schema under `path` as `kind`
///
/// Returns the service response for each file, in file order.
pub async fn add(client: &OsduClient, path: &Path, kind: &str, status: &str) -> Result<Vec<Value>> {
    let identity = SchemaIdentity::from_kind(kind).ok_or_else(|| {
        CliError::invalid_argument(format!(
            "Kind '{}' is not in the correct format 'authority:source:entity:major.minor.patch'",
            kind
        ))
    })?;

    let mut responses = Vec::new();
    for file in find_manifest_files(path)? {
        let text = std::fs::read_to_string(&file)?;
        let schema: Value = serde_json::from_str(&text).map_err(|e| {
            CliError::invalid_argument(format!("{} is not valid JSON: {}", file.display(), e))
        })?;
        info!(path = %file.display(), kind, "Registering schema");

        let registration = SchemaRegistration {
            schema_info: SchemaInfo {
                schema_identity: identity.clone(),
                status: status.to_string(),
            },
            schema,
        };
        let response = client
            .post_json_accepting(
                Service::Schema,
                endpoints::schemas_path(),
                &registration,
                &[200, 201],
            )
            .await?;
        responses.push(response);
    }

    Ok(responses)
}

pub async fn run_list(config: &CliConfig, filter: &SchemaFilter, output: OutputFormat) -> Result<()> {
    let client = OsduClient::new(config)?;
    let response = list(&client, filter).await?;
    println!("{}", render_list(&response, output)?);
    Ok(())
}

pub async fn run_get(config: &CliConfig, kind: &str) -> Result<()> {
    let client = OsduClient::new(config)?;
    println!("{}", to_json(&get(&client, kind).await?)?);
    Ok(())
}

pub async fn run_add(config: &CliConfig, path: &Path, kind: &str, status: &str) -> Result<()> {
    let client = OsduClient::new(config)?;
    let responses = add(&client, path, kind, status).await?;
    println!("{}", to_json(&responses)?);
    Ok(())
}

pub fn render_list(response: &Value, output: OutputFormat) -> Result<String> {
    render_listing(response, "/schemaInfos", SCHEMA_COLUMNS, output)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_schema_table() {
        let response = json!({"schemaInfos": [{
            "schemaIdentity": {
                "id": "osdu:wks:master-data--Well:1.0.0",
                "authority": "osdu",
                "source": "wks",
                "entityType": "master-data--Well",
                "schemaVersionMajor": 1,
                "schemaVersionMinor": 0,
                "schemaVersionPatch": 0
            },
            "status": "PUBLISHED"
        }]});

        let rendered = render_list(&response, OutputFormat::Table).unwrap();
        assert!(rendered.contains("osdu:wks:master-data--Well:1.0.0"));
        assert!(rendered.contains("PUBLISHED"));
    }
}
