//! Service command tests against a mock platform
//!
//! Covers search, schema, legal, entitlements, unit, workflow and health
//! commands, driving the library functions through a wiremock server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use osdu_cli::api::{MemberRole, OsduClient};
use osdu_cli::auth::{AuthProtocol, CredentialManager, TokenGrant};
use osdu_cli::commands::schema::SchemaFilter;
use osdu_cli::commands::{entitlements, health, legal, schema, search, unit, workflow};
use osdu_cli::commands::OutputFormat;
use osdu_cli::dataload::StatusPoller;
use osdu_cli::{CliConfig, CliError};
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct StaticToken;

#[async_trait]
impl AuthProtocol for StaticToken {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn acquire(&self) -> osdu_cli::Result<TokenGrant> {
        Ok(TokenGrant {
            access_token: "test-token".into(),
            id_token: None,
            refresh_token: None,
            expires_in: 3600,
        })
    }
}

fn service_env(server: &MockServer, services: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut env = vec![
        ("OSDU_CORE_SERVER".to_string(), server.uri()),
        ("OSDU_CORE_DATA_PARTITION_ID".to_string(), "opendes".to_string()),
    ];
    env.extend(
        services
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string())),
    );
    env
}

fn all_services(server: &MockServer) -> Vec<(String, String)> {
    service_env(
        server,
        &[
            ("OSDU_CORE_ENTITLEMENTS_URL", "/api/entitlements/v2/"),
            ("OSDU_CORE_FILE_URL", "/api/file/v2/"),
            ("OSDU_CORE_LEGAL_URL", "/api/legal/v1/"),
            ("OSDU_CORE_SCHEMA_URL", "/api/schema-service/v1/"),
            ("OSDU_CORE_SEARCH_URL", "/api/search/v2/"),
            ("OSDU_CORE_STORAGE_URL", "/api/storage/v2/"),
            ("OSDU_CORE_UNIT_URL", "/api/unit/v3/"),
            ("OSDU_CORE_WORKFLOW_URL", "/api/workflow/v1/"),
        ],
    )
}

fn client_with(env: Vec<(String, String)>, dir: &TempDir) -> OsduClient {
    let config = CliConfig::with_env(dir.path(), env).expect("Failed to build config");
    OsduClient::with_credentials(
        &config,
        reqwest::Client::new(),
        CredentialManager::new(Box::new(StaticToken)),
    )
    .expect("Failed to build client")
}

fn test_client(server: &MockServer, dir: &TempDir) -> OsduClient {
    client_with(all_services(server), dir)
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn test_search_by_id_queries_every_kind() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/search/v2/query"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("data-partition-id", "opendes"))
        .and(body_json(json!({
            "kind": "*:*:*:*",
            "query": "id:(\"opendes:master-data--Well:1\")"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "id": "opendes:master-data--Well:1" }],
            "totalCount": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = test_client(&server, &dir);

    let response = search::by_id(&client, "opendes:master-data--Well:1")
        .await
        .unwrap();
    assert_eq!(response["totalCount"], 1);
}

#[tokio::test]
async fn test_search_query_sends_limit_only_when_given() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/search/v2/query"))
        .and(body_json(json!({
            "kind": "osdu:wks:master-data--Well:1.0.0",
            "query": "data.FacilityName:\"A-1\"",
            "limit": 5
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/search/v2/query"))
        .and(body_json(json!({ "kind": "*:*:*:*" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = test_client(&server, &dir);

    search::query(
        &client,
        "osdu:wks:master-data--Well:1.0.0",
        Some("data.FacilityName:\"A-1\""),
        Some(5),
    )
    .await
    .unwrap();
    search::query(&client, search::DEFAULT_SEARCH_KIND, None, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_record_counts_aggregate_by_kind() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/search/v2/query"))
        .and(body_partial_json(json!({ "aggregateBy": "kind", "limit": 1 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "aggregations": [
                { "key": "osdu:wks:master-data--Well:1.0.0", "count": 12 },
                { "key": "osdu:wks:dataset--File.Generic:1.0.0", "count": 3 }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = test_client(&server, &dir);

    let response = search::record_counts(&client).await.unwrap();
    let table = search::render_record_counts(&response, OutputFormat::Table).unwrap();
    assert!(table.contains("master-data--Well"));
    assert!(table.contains("12"));
}

// ============================================================================
// Schema
// ============================================================================

#[tokio::test]
async fn test_schema_list_passes_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/schema-service/v1/schema"))
        .and(query_param("limit", "10000"))
        .and(query_param("authority", "osdu"))
        .and(query_param("entity", "master-data--Well"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "schemaInfos": [{
                "schemaIdentity": { "id": "osdu:wks:master-data--Well:1.0.0" },
                "status": "PUBLISHED"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = test_client(&server, &dir);
    let filter = SchemaFilter {
        authority: Some("osdu".into()),
        entity: Some("master-data--Well".into()),
        source: None,
    };

    let response = schema::list(&client, &filter).await.unwrap();
    assert_eq!(response["schemaInfos"][0]["status"], "PUBLISHED");
}

#[tokio::test]
async fn test_schema_add_registers_each_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/schema-service/v1/schema"))
        .and(body_partial_json(json!({
            "schemaInfo": {
                "schemaIdentity": {
                    "authority": "test",
                    "source": "wks",
                    "entityType": "Thing",
                    "schemaVersionMajor": "1",
                    "schemaVersionMinor": "0",
                    "schemaVersionPatch": "2"
                },
                "status": "DEVELOPMENT"
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "test:wks:Thing:1.0.2" })))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let schemas = dir.path().join("schemas");
    fs::create_dir(&schemas).unwrap();
    fs::write(schemas.join("a.json"), r#"{"type": "object"}"#).unwrap();
    fs::write(schemas.join("b.json"), r#"{"type": "object", "title": "b"}"#).unwrap();
    let client = test_client(&server, &dir);

    let responses = schema::add(
        &client,
        &schemas,
        "test:wks:Thing:1.0.2",
        schema::DEFAULT_SCHEMA_STATUS,
    )
    .await
    .unwrap();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["id"], "test:wks:Thing:1.0.2");
}

#[tokio::test]
async fn test_schema_add_rejects_malformed_kind() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = dir.path().join("schema.json");
    fs::write(&file, "{}").unwrap();
    let client = test_client(&server, &dir);

    let err = schema::add(&client, &file, "test:wks:Thing", "DEVELOPMENT")
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_schema_get_encodes_kind() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/schema-service/v1/schema/osdu%3Awks%3AThing%3A1.0.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "type": "object" })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = test_client(&server, &dir);

    let response = schema::get(&client, "osdu:wks:Thing:1.0.0").await.unwrap();
    assert_eq!(response["type"], "object");
}

// ============================================================================
// Legal and unit
// ============================================================================

#[tokio::test]
async fn test_legal_tags_render_as_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/legal/v1/legaltags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "legalTags": [{
                "name": "opendes-public",
                "description": "Public data",
                "properties": {
                    "securityClassification": "Public",
                    "personalData": "No Personal Data",
                    "exportClassification": "EAR99",
                    "originator": "Example"
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = test_client(&server, &dir);

    let response = legal::list_tags(&client).await.unwrap();
    let table = legal::render_tags(&response, OutputFormat::Table).unwrap();
    assert!(table.contains("opendes-public"));
    assert!(table.contains("EAR99"));

    let json_output = legal::render_tags(&response, OutputFormat::Json).unwrap();
    let parsed: Value = serde_json::from_str(&json_output).unwrap();
    assert_eq!(parsed, response);
}

#[tokio::test]
async fn test_unit_list_uses_listing_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/unit/v3/unit"))
        .and(query_param("limit", "10000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "units": [{ "displaySymbol": "m", "name": "metre", "source": "Energistics" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = test_client(&server, &dir);

    let response = unit::list(&client).await.unwrap();
    let table = unit::render_list(&response, OutputFormat::Table).unwrap();
    assert!(table.contains("metre"));
}

#[tokio::test]
async fn test_unconfigured_service_names_missing_key() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let client = client_with(service_env(&server, &[]), &dir);

    let err = unit::list(&client).await.unwrap_err();
    match err {
        CliError::ConfigurationMissing { key, .. } => assert_eq!(key, "unit_url"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ============================================================================
// Entitlements
// ============================================================================

#[tokio::test]
async fn test_entitlements_membership_changes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/entitlements/v2/groups/users%40opendes.example.com/members"))
        .and(body_json(json!({ "email": "jane@example.com", "role": "OWNER" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "email": "jane@example.com",
            "role": "OWNER"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(
            "/api/entitlements/v2/groups/users%40opendes.example.com/members/jane%40example.com",
        ))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = test_client(&server, &dir);

    let added = entitlements::add_member(
        &client,
        "users@opendes.example.com",
        "jane@example.com",
        MemberRole::Owner,
    )
    .await
    .unwrap();
    assert_eq!(added["role"], "OWNER");

    entitlements::remove_member(&client, "users@opendes.example.com", "jane@example.com")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_entitlements_lists_groups_and_members() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/entitlements/v2/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "groups": [{ "name": "users", "email": "users@opendes.example.com" }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/entitlements/v2/groups/users%40opendes.example.com/members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "members": [{ "email": "jane@example.com", "role": "MEMBER" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = test_client(&server, &dir);

    let groups = entitlements::my_groups(&client).await.unwrap();
    assert_eq!(groups["groups"][0]["name"], "users");

    let members = entitlements::members(&client, "users@opendes.example.com")
        .await
        .unwrap();
    assert_eq!(members["members"][0]["role"], "MEMBER");
}

#[tokio::test]
async fn test_remove_member_rejects_unexpected_status() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such member"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = test_client(&server, &dir);

    let err = entitlements::remove_member(&client, "users@opendes.example.com", "x@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::HttpStatus { status: 404, .. }));
}

// ============================================================================
// Workflow
// ============================================================================

#[tokio::test]
async fn test_workflow_register_list_unregister() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/workflow/v1/workflow"))
        .and(body_json(json!({
            "workflowName": "my_dag",
            "description": "Test DAG",
            "registrationInstructions": {}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "workflowName": "my_dag" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/workflow/v1/workflow"))
        .and(query_param("prefix", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "workflowName": "my_dag", "description": "Test DAG", "createdBy": "jane" },
            { "workflowName": "Osdu_ingest", "description": "Ingest", "createdBy": "admin" }
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/workflow/v1/workflow/my_dag"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = test_client(&server, &dir);

    let registered = workflow::register(&client, "my_dag", "Test DAG").await.unwrap();
    assert_eq!(registered["workflowName"], "my_dag");

    let listed = workflow::list(&client).await.unwrap();
    let table = workflow::render_list(&listed, OutputFormat::Table).unwrap();
    assert!(table.contains("Osdu_ingest"));
    assert!(table.contains("jane"));

    workflow::unregister(&client, "my_dag").await.unwrap();
}

#[tokio::test]
async fn test_run_status_lookup_encodes_run_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/workflow/v1/workflow/Osdu_ingest/workflowRun/a%2Fb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "finished" })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = test_client(&server, &dir);

    let records = StatusPoller::new(&client)
        .check(&["a/b".to_string()])
        .await
        .unwrap();
    assert_eq!(records[0].run_id, "a/b");
    assert!(!records[0].is_running());
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_reports_every_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search/v2/health/readiness_check"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/workflow/readiness_check"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let env = service_env(
        &server,
        &[
            ("OSDU_CORE_SEARCH_URL", "/api/search/v2/"),
            ("OSDU_CORE_WORKFLOW_URL", "/api/workflow/v1/"),
        ],
    );
    let client = client_with(env, &dir);

    let results = health::check_services(&client).await.unwrap();
    assert_eq!(results.len(), 7);

    let by_name = |name: &str| {
        results
            .iter()
            .find(|h| h.name == name)
            .unwrap_or_else(|| panic!("missing {name}"))
            .clone()
    };
    assert_eq!(by_name("Search service").status, Some(200));
    assert_eq!(by_name("Workflow service").status, Some(503));
    assert_eq!(by_name("Workflow service").reason, "Service Unavailable");

    let unit = by_name("Unit service");
    assert_eq!(unit.status, None);
    assert!(unit.reason.contains("unit_url"));
}
