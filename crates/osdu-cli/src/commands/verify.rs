//! `osdu verify` command implementation
//!
//! Checks that the records in manifest files can be found through search.
//! A found record may still be an older version of the manifest content.

use crate::api::OsduClient;
use crate::config::CliConfig;
use crate::dataload::{find_manifest_files, read_manifest, ExistenceVerifier, VerifyOutcome};
use crate::error::Result;
use crate::progress::create_progress_bar;
use colored::Colorize;
use std::path::Path;
use tracing::info;

/// Verify the records under `path` exist
pub async fn run(
    config: &CliConfig,
    path: &Path,
    batch_size: usize,
    batch_across_files: bool,
) -> Result<()> {
    let client = OsduClient::new(config)?;
    let outcome = verify_path(&client, path, batch_size, batch_across_files).await?;

    if outcome.not_found.is_empty() {
        println!(
            "{} All {} records exist.",
            "✓".green(),
            outcome.found.len()
        );
    } else {
        println!(
            "{} {} of {} records could not be found:",
            "✗".red(),
            outcome.not_found.len(),
            outcome.total()
        );
        println!("{}", serde_json::to_string_pretty(&outcome.not_found)?);
    }

    Ok(())
}

/// Check every record id in the manifests under `path`
///
/// Batches are flushed per file unless `batch_across_files` is set, in which
/// case only the final remainder is sent as a partial batch.
pub async fn verify_path(
    client: &OsduClient,
    path: &Path,
    batch_size: usize,
    batch_across_files: bool,
) -> Result<VerifyOutcome> {
    let files = find_manifest_files(path)?;
    let progress = create_progress_bar(0, "Verifying records");
    let mut verifier = ExistenceVerifier::new(client, batch_size)?.with_progress(progress.clone());

    for file in &files {
        let Some(manifest) = read_manifest(file)? else {
            continue;
        };
        if !manifest.data_type.is_record_list() {
            info!(path = %file.display(), "Skipping work-product manifest");
            continue;
        }

        info!(path = %file.display(), "Processing file");
        let queued = verifier.pending();
        verifier.push(manifest.record_ids());
        progress.inc_length((verifier.pending() - queued) as u64);
        verifier.process(!batch_across_files).await?;
    }

    if verifier.pending() > 0 {
        info!(remaining = verifier.pending(), "Searching remaining records");
    }
    verifier.process(true).await?;
    progress.finish_and_clear();

    Ok(verifier.finish())
}
