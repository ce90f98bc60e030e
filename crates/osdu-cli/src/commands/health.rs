//! `osdu health` command implementation
//!
//! Calls the readiness endpoint of each platform service.

use super::new_table;
use crate::api::{OsduClient, Service};
use crate::config::CliConfig;
use crate::error::{CliError, Result};
use tracing::warn;

/// Service name, service and readiness path relative to the service URL
const READINESS_CHECKS: &[(&str, Service, &str)] = &[
    ("File service", Service::File, "readiness_check"),
    ("Legal service", Service::Legal, "_ah/readiness_check"),
    ("Schema service", Service::Schema, "schema?limit=1"),
    ("Search service", Service::Search, "health/readiness_check"),
    ("Storage service", Service::Storage, "health"),
    ("Unit service", Service::Unit, "../_ah/readiness_check"),
    ("Workflow service", Service::Workflow, "../readiness_check"),
];

/// Outcome of one readiness check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceHealth {
    pub name: &'static str,
    /// HTTP status, or `None` when no answer was received
    pub status: Option<u16>,
    pub reason: String,
}

/// Check every service in turn
///
/// An unreachable or unconfigured service is reported, not fatal. Failing to
/// authenticate stops the checks.
pub async fn check_services(client: &OsduClient) -> Result<Vec<ServiceHealth>> {
    let mut results = Vec::with_capacity(READINESS_CHECKS.len());

    for &(name, service, path) in READINESS_CHECKS {
        let health = match client.service_status(service, path).await {
            Ok(status) => ServiceHealth {
                name,
                status: Some(status.code),
                reason: status.reason,
            },
            Err(e @ (CliError::Http(_) | CliError::ConfigurationMissing { .. })) => {
                warn!(service = name, error = %e, "Readiness check failed");
                ServiceHealth {
                    name,
                    status: None,
                    reason: e.to_string(),
                }
            }
            Err(e) => return Err(e),
        };
        results.push(health);
    }

    Ok(results)
}

pub async fn run(config: &CliConfig) -> Result<()> {
    let client = OsduClient::new(config)?;
    let results = check_services(&client).await?;
    println!("{}", render(&results));
    Ok(())
}

pub fn render(results: &[ServiceHealth]) -> String {
    let mut table = new_table(vec!["Service", "Status", "Reason"]);
    for health in results {
        table.add_row(vec![
            health.name.to_string(),
            health
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
            health.reason.clone(),
        ]);
    }
    table.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_render_marks_missing_status() {
        let rendered = render(&[
            ServiceHealth {
                name: "Search service",
                status: Some(200),
                reason: "OK".into(),
            },
            ServiceHealth {
                name: "Unit service",
                status: None,
                reason: "not configured".into(),
            },
        ]);
        assert!(rendered.contains("Search service"));
        assert!(rendered.contains("200"));
        assert!(rendered.contains("not configured"));
    }
}
