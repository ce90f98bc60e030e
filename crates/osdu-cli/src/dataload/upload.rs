//! Upload of files referenced by work-product datasets

use crate::api::{endpoints, OsduClient, Service, UploadUrlResponse};
use crate::error::{CliError, Result};
use serde_json::Value;
use std::path::Path;
use tracing::info;

const FILE_SOURCE_INFO: &str = "/data/DatasetProperties/FileSourceInfo";

/// Upload one local file and return the file source the platform assigned
pub async fn upload_file(client: &OsduClient, path: &Path) -> Result<String> {
    let response: UploadUrlResponse = client
        .get_json(Service::File, endpoints::upload_url_path())
        .await?;

    client
        .upload_file(&response.location.signed_url, path)
        .await?;
    info!(path = %path.display(), file_source = %response.location.file_source, "File uploaded");

    Ok(response.location.file_source)
}

/// Upload the file of every dataset whose `FileSource` is not yet set
///
/// Files are looked up by the dataset's `FileSourceInfo.Name` under `files_dir`.
/// Returns the number of files uploaded.
pub async fn upload_work_product_files(
    client: &OsduClient,
    composite: &mut Value,
    files_dir: &Path,
) -> Result<usize> {
    let Some(datasets) = composite.get_mut("Datasets").and_then(Value::as_array_mut) else {
        return Ok(0);
    };

    let mut uploaded = 0;
    for dataset in datasets {
        let Some(source_info) = dataset.pointer_mut(FILE_SOURCE_INFO) else {
            continue;
        };
        let name = source_info
            .get("Name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if !needs_upload(source_info) {
            info!(name = %name, "FileSource already specified, skipping");
            continue;
        }
        if name.is_empty() {
            return Err(CliError::invalid_manifest(
                files_dir.display().to_string(),
                "dataset FileSourceInfo has no Name to upload",
            ));
        }

        let file_source = upload_file(client, &files_dir.join(&name)).await?;
        source_info["FileSource"] = Value::String(file_source);
        uploaded += 1;
    }

    Ok(uploaded)
}

fn needs_upload(info: &Value) -> bool {
    match info.get("FileSource") {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}
