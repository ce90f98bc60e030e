//! Service-relative endpoint paths
//!
//! Paths are appended to the resolved service URL, see
//! [`OsduClient::url`](crate::api::OsduClient::url). Segments taken from user
//! input are percent-encoded.

use urlencoding::encode;

/// Workflow that ingests manifests
pub const INGEST_WORKFLOW: &str = "Osdu_ingest";

/// Maximum records returned by one search query
pub const SEARCH_LIMIT: usize = 10_000;

/// Maximum entries returned by schema and unit listings
pub const LISTING_LIMIT: usize = 10_000;

// ============================================================================
// Workflow
// ============================================================================

/// Registered workflows
pub fn workflows_path() -> &'static str {
    "workflow"
}

/// Every registered workflow, unfiltered
pub fn workflow_list_path() -> &'static str {
    "workflow?prefix="
}

/// A single registered workflow
pub fn workflow_path(name: &str) -> String {
    format!("workflow/{}", encode(name))
}

/// Trigger a run of the ingestion workflow
pub fn workflow_run_path() -> String {
    format!("workflow/{}/workflowRun", INGEST_WORKFLOW)
}

/// Status of a single ingestion workflow run
pub fn workflow_run_status_path(run_id: &str) -> String {
    format!("{}/{}", workflow_run_path(), encode(run_id))
}

// ============================================================================
// Search
// ============================================================================

/// Search query endpoint
pub fn search_query_path() -> String {
    format!("query?limit={}", SEARCH_LIMIT)
}

/// Search query endpoint with the limit left to the request body
pub fn search_path() -> &'static str {
    "query"
}

// ============================================================================
// Schema
// ============================================================================

/// Schema listing, optionally filtered
pub fn schema_list_path(
    authority: Option<&str>,
    entity: Option<&str>,
    source: Option<&str>,
) -> String {
    let mut path = format!("schema?limit={}", LISTING_LIMIT);
    for (name, value) in [("authority", authority), ("entity", entity), ("source", source)] {
        if let Some(value) = value {
            path.push_str(&format!("&{}={}", name, encode(value)));
        }
    }
    path
}

/// A single schema by kind
pub fn schema_path(kind: &str) -> String {
    format!("schema/{}", encode(kind))
}

/// Schema registration
pub fn schemas_path() -> &'static str {
    "schema"
}

// ============================================================================
// Legal, entitlements, unit and file
// ============================================================================

/// Legal tags of the partition
pub fn legal_tags_path() -> &'static str {
    "legaltags"
}

/// Groups of the calling user
pub fn my_groups_path() -> &'static str {
    "groups"
}

/// Members of a group
pub fn group_members_path(group: &str) -> String {
    format!("groups/{}/members", encode(group))
}

/// One member of a group
pub fn group_member_path(group: &str, member: &str) -> String {
    format!("{}/{}", group_members_path(group), encode(member))
}

/// Unit catalog listing
pub fn unit_list_path() -> String {
    format!("unit?limit={}", LISTING_LIMIT)
}

/// Request a signed upload location from the file service
pub fn upload_url_path() -> &'static str {
    "files/uploadURL"
}
