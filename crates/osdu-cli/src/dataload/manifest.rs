//! Manifest discovery, parsing and metadata stamping
//!
//! A manifest file holds exactly one record group: `ReferenceData`,
//! `MasterData`, or a `Data` work-product composite.

use crate::config::{CliConfig, CONFIG_ACL_OWNER, CONFIG_ACL_VIEWER, CONFIG_LEGAL_TAG, CORE_SECTION};
use crate::error::{CliError, Result};
use serde_json::{json, Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use walkdir::WalkDir;

/// Countries stamped on every ingested record's legal block
pub const DEFAULT_RELEVANT_COUNTRIES: &[&str] = &["US"];

/// Record group held by a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    ReferenceData,
    MasterData,
    Data,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::ReferenceData => "ReferenceData",
            DataType::MasterData => "MasterData",
            DataType::Data => "Data",
        }
    }

    /// Whether records of this type carry ids that search can find
    pub fn is_record_list(self) -> bool {
        !matches!(self, DataType::Data)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records read from one manifest file
///
/// For [`DataType::Data`] `records` holds the single work-product composite.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub path: PathBuf,
    pub data_type: DataType,
    pub records: Vec<Value>,
}

impl Manifest {
    /// Ids of the records that declare one, in order
    pub fn record_ids(&self) -> Vec<String> {
        if !self.data_type.is_record_list() {
            return Vec::new();
        }
        record_ids(&self.records)
    }
}

/// Ids declared by `records`, in order
pub fn record_ids(records: &[Value]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.get("id").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

/// List manifest files under `path`
///
/// A file is returned as is. A directory is walked recursively and its
/// `.json` files are returned sorted by path.
pub fn find_manifest_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.exists() {
        return Err(CliError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(true) {
        let entry = entry.map_err(|e| CliError::Other(e.into()))?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|e| e.to_str()) == Some("json")
        {
            files.push(entry.into_path());
        }
    }
    files.sort();
    debug!(count = files.len(), root = %path.display(), "Found manifest files");
    Ok(files)
}

/// Read one manifest file
///
/// Returns `Ok(None)` for a manifest without records, after logging it.
pub fn read_manifest(path: &Path) -> Result<Option<Manifest>> {
    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)
        .map_err(|e| CliError::invalid_manifest(path.display().to_string(), e.to_string()))?;
    parse_manifest(path, value)
}

/// Interpret a parsed manifest document
pub fn parse_manifest(path: &Path, value: Value) -> Result<Option<Manifest>> {
    let shown = path.display().to_string();

    let mut object = match value {
        Value::Object(object) if object.is_empty() => {
            error!(path = %shown, "Error with file. File is empty.");
            return Ok(None);
        }
        Value::Null => {
            error!(path = %shown, "Error with file. File is empty.");
            return Ok(None);
        }
        Value::Object(object) => object,
        _ => return Err(CliError::invalid_manifest(shown, "expected a JSON object")),
    };

    for data_type in [DataType::ReferenceData, DataType::MasterData] {
        if let Some(group) = object.remove(data_type.as_str()) {
            let records = match group {
                Value::Array(records) => records,
                _ => {
                    return Err(CliError::invalid_manifest(
                        shown,
                        format!("'{}' must be an array", data_type),
                    ))
                }
            };
            if records.is_empty() {
                error!(path = %shown, %data_type, "Error with file. File is empty.");
                return Ok(None);
            }
            return Ok(Some(Manifest {
                path: path.to_path_buf(),
                data_type,
                records,
            }));
        }
    }

    match object.remove(DataType::Data.as_str()) {
        Some(composite @ Value::Object(_)) => Ok(Some(Manifest {
            path: path.to_path_buf(),
            data_type: DataType::Data,
            records: vec![composite],
        })),
        Some(_) => Err(CliError::invalid_manifest(shown, "'Data' must be an object")),
        None => Err(CliError::invalid_manifest(
            shown,
            "expected one of 'ReferenceData', 'MasterData' or 'Data'",
        )),
    }
}

/// Legal and ACL values stamped on every ingested record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStamp {
    pub legal_tag: String,
    pub acl_viewer: String,
    pub acl_owner: String,
}

impl RecordStamp {
    pub fn from_config(config: &CliConfig) -> Result<Self> {
        Ok(Self {
            legal_tag: config.get(CORE_SECTION, CONFIG_LEGAL_TAG)?,
            acl_viewer: config.get(CORE_SECTION, CONFIG_ACL_VIEWER)?,
            acl_owner: config.get(CORE_SECTION, CONFIG_ACL_OWNER)?,
        })
    }

    /// Overwrite the legal tags, countries, viewers and owners of one record
    pub fn apply(&self, record: &mut Value) {
        let Some(record) = record.as_object_mut() else {
            return;
        };

        merge_object(
            record,
            "legal",
            [
                ("legaltags", json!([self.legal_tag])),
                ("otherRelevantDataCountries", json!(DEFAULT_RELEVANT_COUNTRIES)),
            ],
        );
        merge_object(
            record,
            "acl",
            [
                ("viewers", json!([self.acl_viewer])),
                ("owners", json!([self.acl_owner])),
            ],
        );
    }

    pub fn apply_all(&self, records: &mut [Value]) {
        for record in records {
            self.apply(record);
        }
    }

    /// Stamp every part of a work-product composite
    pub fn apply_work_product(&self, composite: &mut Value) {
        if let Some(work_product) = composite.get_mut("WorkProduct") {
            self.apply(work_product);
        }
        for group in ["WorkProductComponents", "Datasets"] {
            if let Some(parts) = composite.get_mut(group).and_then(Value::as_array_mut) {
                self.apply_all(parts);
            }
        }
    }

    /// Stamp a manifest's records according to its data type
    pub fn apply_manifest(&self, manifest: &mut Manifest) {
        match manifest.data_type {
            DataType::Data => {
                for composite in &mut manifest.records {
                    self.apply_work_product(composite);
                }
            }
            _ => self.apply_all(&mut manifest.records),
        }
    }
}

/// Set `fields` on the object under `key`, replacing it if absent or not an object
fn merge_object<const N: usize>(
    parent: &mut Map<String, Value>,
    key: &str,
    fields: [(&str, Value); N],
) {
    let mut child = match parent.remove(key) {
        Some(Value::Object(child)) => child,
        _ => Map::new(),
    };
    for (name, value) in fields {
        child.insert(name.to_string(), value);
    }
    parent.insert(key.to_string(), Value::Object(child));
}
