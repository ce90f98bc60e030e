//! `osdu ingest` command implementation
//!
//! Reads manifests, stamps legal and ACL metadata, uploads work-product files,
//! and submits the records to the ingestion workflow in batches.

use super::OutputFormat;
use crate::api::OsduClient;
use crate::config::{CliConfig, CONFIG_DATA_PARTITION_ID, CORE_SECTION};
use crate::dataload::manifest::record_ids;
use crate::dataload::upload::upload_work_product_files;
use crate::dataload::{
    find_manifest_files, read_manifest, BatchSubmitter, DataType, ExistenceVerifier, RecordStamp,
    RunIdLog, StatusPoller,
};
use crate::error::Result;
use crate::progress::{create_progress_bar, create_spinner};
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Options of one ingest invocation
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Manifest file or directory
    pub path: PathBuf,
    /// Directory holding files referenced by work-product datasets
    pub files: Option<PathBuf>,
    /// Records per workflow run; `None` sends each manifest in one run
    pub batch_size: Option<usize>,
    pub runid_log: Option<PathBuf>,
    pub wait: bool,
    pub poll_interval: Duration,
    /// Only submit records search cannot find yet
    pub skip_existing: bool,
    /// Ids per search query when skipping existing records
    pub verify_batch_size: usize,
    pub simulate: bool,
}

/// Ingest manifests and print the run ids
pub async fn run(config: &CliConfig, options: IngestOptions) -> Result<()> {
    let needs_client = !options.simulate || options.skip_existing;
    let client = if needs_client {
        Some(OsduClient::new(config)?)
    } else {
        None
    };

    let run_ids = ingest(config, client.as_ref(), &options).await?;
    println!("{}", serde_json::to_string_pretty(&run_ids)?);

    if options.wait && !run_ids.is_empty() {
        if let Some(client) = client.as_ref() {
            let spinner = create_spinner("Waiting for workflow runs");
            let records = StatusPoller::new(client)
                .with_poll_interval(options.poll_interval)
                .wait(&run_ids)
                .await;
            spinner.finish_and_clear();
            println!("{}", super::status::render(&records?, OutputFormat::Json)?);
        }
    }

    Ok(())
}

/// Ingest every manifest under `options.path`, returning run ids in submission order
///
/// Without a client, or with `options.simulate`, nothing is submitted.
pub async fn ingest(
    config: &CliConfig,
    client: Option<&OsduClient>,
    options: &IngestOptions,
) -> Result<Vec<String>> {
    let stamp = RecordStamp::from_config(config)?;
    let files = find_manifest_files(&options.path)?;
    info!(count = files.len(), "Files list");

    let progress = create_progress_bar(0, "Submitting records");
    let mut submitter = match client {
        Some(client) if !options.simulate => BatchSubmitter::new(client),
        _ => BatchSubmitter::simulate(config.get(CORE_SECTION, CONFIG_DATA_PARTITION_ID)?),
    }
    .with_progress(progress.clone());
    if let Some(path) = &options.runid_log {
        if submitter.is_simulating() {
            info!(path = %path.display(), "Simulated run, leaving run id log untouched");
        } else {
            submitter = submitter.with_run_log(RunIdLog::create(path)?);
        }
    }

    let mut run_ids = Vec::new();
    for file in &files {
        let Some(mut manifest) = read_manifest(file)? else {
            continue;
        };
        info!(path = %file.display(), data_type = %manifest.data_type, records = manifest.records.len(), "Processing file");
        stamp.apply_manifest(&mut manifest);

        if manifest.data_type == DataType::Data {
            if let Some(files_dir) = &options.files {
                match client {
                    Some(client) if !options.simulate => {
                        for composite in &mut manifest.records {
                            upload_work_product_files(client, composite, files_dir).await?;
                        }
                    }
                    _ => info!(path = %file.display(), "Simulated run, skipping file upload"),
                }
            }
        }

        if options.skip_existing && manifest.data_type.is_record_list() {
            if let Some(client) = client {
                manifest.records =
                    skip_existing(client, manifest.records, options.verify_batch_size).await?;
            }
        }

        progress.inc_length(manifest.records.len() as u64);
        let ids = submitter
            .submit(&manifest.records, manifest.data_type, options.batch_size)
            .await?;
        run_ids.extend(ids);
    }
    progress.finish_and_clear();

    if submitter.is_simulating() {
        warn!("Simulated run, nothing was submitted");
    }
    Ok(run_ids)
}

/// Keep the records search cannot find, plus any record without an id
pub async fn skip_existing(
    client: &OsduClient,
    records: Vec<Value>,
    batch_size: usize,
) -> Result<Vec<Value>> {
    let ids = record_ids(&records);
    if ids.is_empty() {
        return Ok(records);
    }

    let outcome = ExistenceVerifier::new(client, batch_size)?
        .verify(ids)
        .await?;
    let missing: HashSet<&str> = outcome.not_found.iter().map(String::as_str).collect();

    let before = records.len();
    let kept: Vec<Value> = records
        .into_iter()
        .filter(|record| match record.get("id").and_then(Value::as_str) {
            Some(id) => missing.contains(id),
            None => true,
        })
        .collect();

    info!(
        skipped = before - kept.len(),
        remaining = kept.len(),
        "Skipping records that already exist"
    );
    Ok(kept)
}
