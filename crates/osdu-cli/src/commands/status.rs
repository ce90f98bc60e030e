//! `osdu status` command implementation
//!
//! Shows the state of ingestion workflow runs, optionally waiting for them.

use super::{new_table, OutputFormat};
use crate::api::OsduClient;
use crate::config::CliConfig;
use crate::dataload::{read_run_ids, RunRecord, RunStatus, StatusPoller};
use crate::error::{CliError, Result};
use crate::progress::create_spinner;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;

/// Which runs to look up
#[derive(Debug, Clone)]
pub enum RunSelection {
    Single(String),
    Log(PathBuf),
}

impl RunSelection {
    pub fn from_args(run_id: Option<String>, runid_log: Option<PathBuf>) -> Result<Self> {
        match (run_id, runid_log) {
            (Some(run_id), _) => Ok(RunSelection::Single(run_id)),
            (None, Some(path)) => Ok(RunSelection::Log(path)),
            (None, None) => Err(CliError::invalid_argument(
                "Specify either --runid or --runid-log",
            )),
        }
    }

    pub fn run_ids(&self) -> Result<Vec<String>> {
        match self {
            RunSelection::Single(run_id) => Ok(vec![run_id.clone()]),
            RunSelection::Log(path) => read_run_ids(path),
        }
    }
}

/// Show status of workflow runs
pub async fn run(
    config: &CliConfig,
    selection: RunSelection,
    wait: bool,
    poll_interval: Duration,
    output: OutputFormat,
) -> Result<()> {
    let run_ids = selection.run_ids()?;
    if run_ids.is_empty() {
        println!("No run ids to check.");
        return Ok(());
    }

    let client = OsduClient::new(config)?;
    let poller = StatusPoller::new(&client).with_poll_interval(poll_interval);

    let records = if wait {
        let spinner = create_spinner("Waiting for workflow runs");
        let records = poller
            .wait_with(&run_ids, |records| spinner.set_message(summarize(records)))
            .await;
        spinner.finish_and_clear();
        records?
    } else {
        poller.check(&run_ids).await?
    };

    println!("{}", render(&records, output)?);
    Ok(())
}

/// Render run records as JSON or a table
pub fn render(records: &[RunRecord], output: OutputFormat) -> Result<String> {
    match output {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(records)?),
        OutputFormat::Table => Ok(render_table(records)),
    }
}

fn render_table(records: &[RunRecord]) -> String {
    let mut table = new_table(vec!["Run ID", "Status", "Started", "Ended", "Time Taken (s)"]);

    for record in records {
        table.add_row(vec![
            record.run_id.clone(),
            record.status.to_string(),
            format_timestamp(record.start_time),
            format_timestamp(record.end_time),
            record
                .duration
                .map(|d| format!("{:.1}", d))
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }

    table.to_string()
}

fn format_timestamp(millis: Option<i64>) -> String {
    millis
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn summarize(records: &[RunRecord]) -> String {
    let count = |status: RunStatus| records.iter().filter(|r| r.status == status).count();
    format!(
        "Waiting for workflow runs: {} running, {} finished, {} failed, {} unknown",
        count(RunStatus::Running),
        count(RunStatus::Finished),
        count(RunStatus::Failed),
        count(RunStatus::Unknown)
    )
}
