//! `osdu search` and `osdu list records` command implementations

use super::{render_listing, to_json, Column, OutputFormat};
use crate::api::{endpoints, OsduClient, SearchRequest, Service};
use crate::config::CliConfig;
use crate::error::Result;
use serde_json::Value;

/// Kind pattern used when a search names none
pub const DEFAULT_SEARCH_KIND: &str = "*:*:*:*";

const RECORD_COUNT_COLUMNS: &[Column] = &[("Kind", "/key"), ("Count", "/count")];

/// Search for a single record id
pub async fn by_id(client: &OsduClient, id: &str) -> Result<Value> {
    client
        .post_json(Service::Search, endpoints::search_path(), &SearchRequest::by_id(id))
        .await
}

/// Run a search with a query string
pub async fn query(
    client: &OsduClient,
    kind: &str,
    query: Option<&str>,
    limit: Option<usize>,
) -> Result<Value> {
    let request = SearchRequest {
        kind: kind.to_string(),
        query: query.map(str::to_string),
        limit,
        ..Default::default()
    };
    client
        .post_json(Service::Search, endpoints::search_path(), &request)
        .await
}

/// Record counts per kind, as aggregated by search
pub async fn record_counts(client: &OsduClient) -> Result<Value> {
    client
        .post_json(
            Service::Search,
            endpoints::search_path(),
            &SearchRequest::count_by_kind(),
        )
        .await
}

pub async fn run_by_id(config: &CliConfig, id: &str) -> Result<()> {
    let client = OsduClient::new(config)?;
    println!("{}", to_json(&by_id(&client, id).await?)?);
    Ok(())
}

pub async fn run_query(
    config: &CliConfig,
    kind: &str,
    query_text: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let client = OsduClient::new(config)?;
    let response = query(&client, kind, query_text, limit).await?;
    println!("{}", to_json(&response)?);
    Ok(())
}

pub async fn run_record_counts(config: &CliConfig, output: OutputFormat) -> Result<()> {
    let client = OsduClient::new(config)?;
    let response = record_counts(&client).await?;
    println!("{}", render_record_counts(&response, output)?);
    Ok(())
}

pub fn render_record_counts(response: &Value, output: OutputFormat) -> Result<String> {
    render_listing(response, "/aggregations", RECORD_COUNT_COLUMNS, output)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_counts_table() {
        let response = json!({
            "aggregations": [
                {"key": "osdu:wks:master-data--Well:1.0.0", "count": 12},
                {"key": "osdu:wks:master-data--Field:1.0.0", "count": 3}
            ]
        });

        let rendered = render_record_counts(&response, OutputFormat::Table).unwrap();
        let field = rendered.find("master-data--Field").unwrap();
        let well = rendered.find("master-data--Well").unwrap();
        assert!(field < well);
        assert!(rendered.contains("12"));
    }
}
