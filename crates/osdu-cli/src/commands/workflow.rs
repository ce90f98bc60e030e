//! `osdu workflow` command implementation
//!
//! Lists, registers and unregisters workflows.

use super::{render_listing, to_json, Column, OutputFormat};
use crate::api::{endpoints, OsduClient, Service, WorkflowRegistration};
use crate::config::CliConfig;
use crate::error::Result;
use serde_json::{Map, Value};
use tracing::info;

const WORKFLOW_COLUMNS: &[Column] = &[
    ("Name", "/workflowName"),
    ("Description", "/description"),
    ("Created By", "/createdBy"),
];

pub async fn list(client: &OsduClient) -> Result<Value> {
    client
        .get_json(Service::Workflow, endpoints::workflow_list_path())
        .await
}

pub async fn register(client: &OsduClient, name: &str, description: &str) -> Result<Value> {
    let registration = WorkflowRegistration {
        workflow_name: name.to_string(),
        description: description.to_string(),
        registration_instructions: Map::new(),
    };
    let response = client
        .post_json(Service::Workflow, endpoints::workflows_path(), &registration)
        .await?;
    info!(name, "Workflow registered");
    Ok(response)
}

pub async fn unregister(client: &OsduClient, name: &str) -> Result<()> {
    client
        .delete(Service::Workflow, &endpoints::workflow_path(name), &[204])
        .await?;
    info!(name, "Workflow unregistered");
    Ok(())
}

pub async fn run_list(config: &CliConfig, output: OutputFormat) -> Result<()> {
    let client = OsduClient::new(config)?;
    let response = list(&client).await?;
    println!("{}", render_list(&response, output)?);
    Ok(())
}

/// The workflow listing is a top-level array
pub fn render_list(response: &Value, output: OutputFormat) -> Result<String> {
    render_listing(response, "", WORKFLOW_COLUMNS, output)
}

pub async fn run_register(config: &CliConfig, name: &str, description: &str) -> Result<()> {
    let client = OsduClient::new(config)?;
    let response = register(&client, name, description).await?;
    println!("{}", to_json(&response)?);
    Ok(())
}

pub async fn run_unregister(config: &CliConfig, name: &str) -> Result<()> {
    let client = OsduClient::new(config)?;
    unregister(&client, name).await?;
    println!("Unregistered workflow {}", name);
    Ok(())
}
