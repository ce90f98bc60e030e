//! Data loading: manifests, batched ingestion, run status and verification
//!
//! Manifests are parsed into record groups, optionally filtered against
//! what search already finds, submitted in bounded batches, and tracked
//! until their workflow runs complete.

pub mod batch;
pub mod manifest;
pub mod status;
pub mod upload;
pub mod verify;

pub use batch::{read_run_ids, BatchSubmitter, RunIdLog};
pub use manifest::{find_manifest_files, read_manifest, DataType, Manifest, RecordStamp};
pub use status::{RunRecord, RunStatus, StatusPoller};
pub use verify::{ExistenceVerifier, VerifyOutcome};
