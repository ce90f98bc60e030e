//! API request and response types
//!
//! Field names follow the platform's wire format.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Application key sent with every ingestion request
pub const APP_KEY: &str = "osdu-cli";

/// Kind of the manifest wrapper submitted to the ingestion workflow
pub const MANIFEST_KIND: &str = "osdu:wks:Manifest:1.0.0";

/// Body of a workflow run submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRunRequest {
    pub execution_context: ExecutionContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    #[serde(rename = "Payload")]
    pub payload: IngestPayload,

    pub manifest: ManifestEnvelope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestPayload {
    #[serde(rename = "AppKey")]
    pub app_key: String,

    #[serde(rename = "data-partition-id")]
    pub data_partition_id: String,
}

/// Manifest wrapper holding one record group keyed by its data type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEnvelope {
    pub kind: String,

    #[serde(flatten)]
    pub groups: Map<String, Value>,
}

impl WorkflowRunRequest {
    /// Wrap `data` as the `data_type` group of an ingestion manifest
    pub fn new(data_partition_id: &str, data_type: &str, data: Value) -> Self {
        let mut groups = Map::new();
        groups.insert(data_type.to_string(), data);

        Self {
            execution_context: ExecutionContext {
                payload: IngestPayload {
                    app_key: APP_KEY.to_string(),
                    data_partition_id: data_partition_id.to_string(),
                },
                manifest: ManifestEnvelope {
                    kind: MANIFEST_KIND.to_string(),
                    groups,
                },
            },
        }
    }
}

/// Response to a workflow run submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRunResponse {
    pub run_id: String,
}

/// Status document of one workflow run
///
/// Timestamps are epoch milliseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRunStatusResponse {
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub start_time_stamp: Option<i64>,

    #[serde(default)]
    pub end_time_stamp: Option<i64>,
}

/// Search service query body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub kind: String,
    pub limit: usize,
    pub returned_fields: Vec<String>,
    pub offset: usize,
    pub query: String,
}

/// Search service response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchHit>,

    #[serde(rename = "totalCount", default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub id: Option<String>,
}

/// Free-form search body; unset fields are left to the service defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub kind: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate_by: Option<String>,
}

impl SearchRequest {
    /// Exact match on one record id across every kind
    pub fn by_id(id: &str) -> Self {
        Self {
            kind: "*:*:*:*".to_string(),
            query: Some(format!("id:(\"{}\")", id)),
            ..Default::default()
        }
    }

    /// Record counts per kind
    pub fn count_by_kind() -> Self {
        Self {
            kind: "*:*:*:*".to_string(),
            query: Some("*".to_string()),
            limit: Some(1),
            aggregate_by: Some("kind".to_string()),
        }
    }
}

/// Registration of a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRegistration {
    pub workflow_name: String,
    pub description: String,
    pub registration_instructions: Map<String, Value>,
}

/// Schema identity parsed from a kind `authority:source:entity:major.minor.patch`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaIdentity {
    pub authority: String,
    pub source: String,
    pub entity_type: String,
    pub schema_version_major: String,
    pub schema_version_minor: String,
    pub schema_version_patch: String,
}

impl SchemaIdentity {
    /// Split a kind into its identity, `None` if it is not well formed
    pub fn from_kind(kind: &str) -> Option<Self> {
        let parts: Vec<&str> = kind.split(':').collect();
        let [authority, source, entity, version] = parts.as_slice() else {
            return None;
        };
        let versions: Vec<&str> = version.split('.').collect();
        let [major, minor, patch] = versions.as_slice() else {
            return None;
        };

        Some(Self {
            authority: authority.to_string(),
            source: source.to_string(),
            entity_type: entity.to_string(),
            schema_version_major: major.to_string(),
            schema_version_minor: minor.to_string(),
            schema_version_patch: patch.to_string(),
        })
    }
}

/// Body registering a schema
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaRegistration {
    pub schema_info: SchemaInfo,
    pub schema: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaInfo {
    pub schema_identity: SchemaIdentity,
    pub status: String,
}

/// Role of a group member
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberRole {
    #[default]
    Member,
    Owner,
}

/// Body adding a member to a group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMember {
    pub email: String,
    pub role: MemberRole,
}

/// Response of the file service upload URL request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadUrlResponse {
    #[serde(rename = "Location")]
    pub location: UploadLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadLocation {
    #[serde(rename = "SignedURL")]
    pub signed_url: String,

    #[serde(rename = "FileSource")]
    pub file_source: String,
}
