//! Batched submission of records to the ingestion workflow

use super::manifest::DataType;
use crate::api::{endpoints, OsduClient, Service, WorkflowRunRequest, WorkflowRunResponse};
use crate::error::{CliError, Result};
use indicatif::ProgressBar;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Splits records into bounded batches and submits each as a workflow run
///
/// Without a client the submitter simulates: batches are built and logged but
/// nothing is sent and no run ids are returned.
pub struct BatchSubmitter<'a> {
    client: Option<&'a OsduClient>,
    data_partition_id: String,
    run_log: Option<RunIdLog>,
    progress: Option<ProgressBar>,
}

impl<'a> BatchSubmitter<'a> {
    pub fn new(client: &'a OsduClient) -> Self {
        Self {
            client: Some(client),
            data_partition_id: client.data_partition_id().to_string(),
            run_log: None,
            progress: None,
        }
    }

    /// Submitter that makes no network calls
    pub fn simulate(data_partition_id: impl Into<String>) -> Self {
        Self {
            client: None,
            data_partition_id: data_partition_id.into(),
            run_log: None,
            progress: None,
        }
    }

    /// Append every returned run id to `log`
    pub fn with_run_log(mut self, log: RunIdLog) -> Self {
        self.run_log = Some(log);
        self
    }

    /// Advance `progress` by the number of records in each submitted batch
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn is_simulating(&self) -> bool {
        self.client.is_none()
    }

    /// Submit `records` in order and return the run ids in submission order
    ///
    /// `batch_size` of `None` sends the whole group at once. Work-product
    /// composites are always sent one per run.
    pub async fn submit(
        &mut self,
        records: &[Value],
        data_type: DataType,
        batch_size: Option<usize>,
    ) -> Result<Vec<String>> {
        if batch_size == Some(0) {
            return Err(CliError::invalid_argument("batch size must be at least 1"));
        }
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let size = match data_type {
            DataType::Data => 1,
            _ => batch_size.unwrap_or(records.len()),
        };

        let mut run_ids = Vec::new();
        for (index, chunk) in records.chunks(size).enumerate() {
            let data = match data_type {
                DataType::Data => chunk[0].clone(),
                _ => Value::Array(chunk.to_vec()),
            };
            let request = WorkflowRunRequest::new(&self.data_partition_id, data_type.as_str(), data);

            match self.client {
                None => {
                    info!(batch = index + 1, size = chunk.len(), %data_type, "Simulated batch, not sent");
                    debug!(request = %serde_json::to_string(&request)?, "Simulated request");
                }
                Some(client) => {
                    info!(batch = index + 1, size = chunk.len(), %data_type, "Sending batch");
                    let response: WorkflowRunResponse = client
                        .post_json(Service::Workflow, &endpoints::workflow_run_path(), &request)
                        .await?;
                    info!(run_id = %response.run_id, "Workflow run submitted");

                    if let Some(log) = self.run_log.as_mut() {
                        log.append(&response.run_id)?;
                    }
                    run_ids.push(response.run_id);
                }
            }

            if let Some(progress) = &self.progress {
                progress.inc(chunk.len() as u64);
            }
        }

        Ok(run_ids)
    }
}

/// File receiving one run id per line as runs are submitted
#[derive(Debug)]
pub struct RunIdLog {
    path: PathBuf,
    file: File,
}

impl RunIdLog {
    /// Create the log, truncating any previous content
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, run_id: &str) -> Result<()> {
        writeln!(self.file, "{}", run_id)?;
        self.file.flush()?;
        Ok(())
    }
}

/// Read run ids back from a log, trimmed, skipping blank lines
pub fn read_run_ids(path: &Path) -> Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut run_ids = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let run_id = line.trim();
        if !run_id.is_empty() {
            run_ids.push(run_id.to_string());
        }
    }
    Ok(run_ids)
}
