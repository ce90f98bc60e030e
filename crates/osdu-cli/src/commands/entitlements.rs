//! `osdu entitlements` command implementation
//!
//! Groups of the calling user and membership of a group.

use super::{render_listing, to_json, Column, OutputFormat};
use crate::api::{endpoints, GroupMember, MemberRole, OsduClient, Service};
use crate::config::CliConfig;
use crate::error::Result;
use serde_json::Value;
use tracing::info;

const GROUP_COLUMNS: &[Column] = &[
    ("Name", "/name"),
    ("Email", "/email"),
    ("Description", "/description"),
];

const MEMBER_COLUMNS: &[Column] = &[("Email", "/email"), ("Role", "/role")];

pub async fn my_groups(client: &OsduClient) -> Result<Value> {
    client
        .get_json(Service::Entitlements, endpoints::my_groups_path())
        .await
}

pub async fn members(client: &OsduClient, group: &str) -> Result<Value> {
    client
        .get_json(Service::Entitlements, &endpoints::group_members_path(group))
        .await
}

pub async fn add_member(
    client: &OsduClient,
    group: &str,
    member: &str,
    role: MemberRole,
) -> Result<Value> {
    let body = GroupMember {
        email: member.to_string(),
        role,
    };
    let response = client
        .post_json(
            Service::Entitlements,
            &endpoints::group_members_path(group),
            &body,
        )
        .await?;
    info!(group, member, ?role, "Member added");
    Ok(response)
}

pub async fn remove_member(client: &OsduClient, group: &str, member: &str) -> Result<()> {
    client
        .delete(
            Service::Entitlements,
            &endpoints::group_member_path(group, member),
            &[204],
        )
        .await?;
    info!(group, member, "Member removed");
    Ok(())
}

pub async fn run_my_groups(config: &CliConfig, output: OutputFormat) -> Result<()> {
    let client = OsduClient::new(config)?;
    let response = my_groups(&client).await?;
    println!("{}", render_listing(&response, "/groups", GROUP_COLUMNS, output)?);
    Ok(())
}

pub async fn run_members(config: &CliConfig, group: &str, output: OutputFormat) -> Result<()> {
    let client = OsduClient::new(config)?;
    let response = members(&client, group).await?;
    println!("{}", render_listing(&response, "/members", MEMBER_COLUMNS, output)?);
    Ok(())
}

pub async fn run_add_member(
    config: &CliConfig,
    group: &str,
    member: &str,
    role: MemberRole,
) -> Result<()> {
    let client = OsduClient::new(config)?;
    let response = add_member(&client, group, member, role).await?;
    println!("{}", to_json(&response)?);
    Ok(())
}

pub async fn run_remove_member(config: &CliConfig, group: &str, member: &str) -> Result<()> {
    let client = OsduClient::new(config)?;
    remove_member(&client, group, member).await?;
    println!("Removed {} from {}", member, group);
    Ok(())
}
