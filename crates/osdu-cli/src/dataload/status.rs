//! Workflow run status lookup and waiting

use crate::api::{endpoints, OsduClient, Service, WorkflowRunStatusResponse};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Seconds between status rounds when waiting
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// State of one workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
    Unknown,
}

impl RunStatus {
    /// Map a server status string; anything unrecognised is `Unknown`
    pub fn parse(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "running" => RunStatus::Running,
            "finished" => RunStatus::Finished,
            "failed" => RunStatus::Failed,
            _ => RunStatus::Unknown,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Finished | RunStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Finished => "finished",
            RunStatus::Failed => "failed",
            RunStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest known state of a submitted run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    #[serde(rename = "runId")]
    pub run_id: String,

    pub status: RunStatus,

    /// Epoch milliseconds
    #[serde(rename = "startTimeStamp", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,

    /// Epoch milliseconds
    #[serde(rename = "endTimeStamp", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,

    /// Seconds between start and end of a terminal run
    #[serde(rename = "timeTaken", skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl RunRecord {
    pub fn unknown(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            status: RunStatus::Unknown,
            start_time: None,
            end_time: None,
            duration: None,
        }
    }

    pub fn from_response(run_id: impl Into<String>, response: WorkflowRunStatusResponse) -> Self {
        let status = response
            .status
            .as_deref()
            .map(RunStatus::parse)
            .unwrap_or(RunStatus::Unknown);

        let duration = match (status.is_terminal(), response.start_time_stamp, response.end_time_stamp) {
            (true, Some(start), Some(end)) => Some((end - start) as f64 / 1000.0),
            _ => None,
        };

        Self {
            run_id: run_id.into(),
            status,
            start_time: response.start_time_stamp,
            end_time: response.end_time_stamp,
            duration,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }
}

/// Fetches run status from the workflow service
pub struct StatusPoller<'a> {
    client: &'a OsduClient,
    poll_interval: Duration,
}

impl<'a> StatusPoller<'a> {
    pub fn new(client: &'a OsduClient) -> Self {
        Self {
            client,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Fetch the status of every run once
    pub async fn check(&self, run_ids: &[String]) -> Result<Vec<RunRecord>> {
        debug!(count = run_ids.len(), "Checking run status");
        let mut records = Vec::with_capacity(run_ids.len());
        for run_id in run_ids {
            records.push(self.fetch(run_id).await?);
        }
        Ok(records)
    }

    /// Fetch every run again except those already terminal
    pub async fn refresh(&self, records: Vec<RunRecord>) -> Result<Vec<RunRecord>> {
        let mut refreshed = Vec::with_capacity(records.len());
        for record in records {
            if record.status.is_terminal() {
                refreshed.push(record);
            } else {
                refreshed.push(self.fetch(&record.run_id).await?);
            }
        }
        Ok(refreshed)
    }

    /// Poll until no run is `running`
    pub async fn wait(&self, run_ids: &[String]) -> Result<Vec<RunRecord>> {
        self.wait_with(run_ids, |_| {}).await
    }

    /// Poll until no run is `running`, calling `on_round` after every round
    pub async fn wait_with<F>(&self, run_ids: &[String], mut on_round: F) -> Result<Vec<RunRecord>>
    where
        F: FnMut(&[RunRecord]),
    {
        let mut records = self.check(run_ids).await?;
        on_round(&records);

        while let Some(running) = records.iter().find(|r| r.is_running()) {
            info!(
                run_id = %running.run_id,
                interval_secs = self.poll_interval.as_secs(),
                "Not all runs finished, checking again"
            );
            tokio::time::sleep(self.poll_interval).await;
            records = self.refresh(records).await?;
            on_round(&records);
        }

        Ok(records)
    }

    async fn fetch(&self, run_id: &str) -> Result<RunRecord> {
        let path = endpoints::workflow_run_status_path(run_id);
        match self
            .client
            .get_json::<WorkflowRunStatusResponse>(Service::Workflow, &path)
            .await
        {
            Ok(response) => {
                let record = RunRecord::from_response(run_id, response);
                debug!(run_id, status = %record.status, "Fetched run status");
                Ok(record)
            }
            Err(e) if e.is_remote_failure() => {
                warn!(run_id, error = %e, "Unable to fetch run status");
                Ok(RunRecord::unknown(run_id))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn response(status: &str, start: Option<i64>, end: Option<i64>) -> WorkflowRunStatusResponse {
        WorkflowRunStatusResponse {
            status: Some(status.to_string()),
            start_time_stamp: start,
            end_time_stamp: end,
        }
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(RunStatus::parse("running"), RunStatus::Running);
        assert_eq!(RunStatus::parse("FINISHED"), RunStatus::Finished);
        assert_eq!(RunStatus::parse("failed"), RunStatus::Failed);
        assert_eq!(RunStatus::parse("queued"), RunStatus::Unknown);
    }

    #[test]
    fn test_duration_in_seconds_for_terminal_runs() {
        let record = RunRecord::from_response(
            "r1",
            response("finished", Some(1_600_000_000_000), Some(1_600_000_012_500)),
        );
        assert_eq!(record.duration, Some(12.5));

        let running = RunRecord::from_response("r2", response("running", Some(1), None));
        assert_eq!(running.duration, None);
        assert!(running.is_running());
    }

    #[test]
    fn test_missing_status_is_unknown() {
        let record = RunRecord::from_response("r1", WorkflowRunStatusResponse::default());
        assert_eq!(record.status, RunStatus::Unknown);
        assert!(!record.is_running());
    }

    #[test]
    fn test_record_serialises_wire_names() {
        let record = RunRecord::from_response("r1", response("failed", Some(1000), Some(3000)));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "runId": "r1",
                "status": "failed",
                "startTimeStamp": 1000,
                "endTimeStamp": 3000,
                "timeTaken": 2.0
            })
        );

        let unknown = serde_json::to_value(RunRecord::unknown("r2")).unwrap();
        assert_eq!(unknown, serde_json::json!({"runId": "r2", "status": "unknown"}));
    }
}
