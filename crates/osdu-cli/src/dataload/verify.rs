//! Record existence checks against the search service

use crate::api::{endpoints, OsduClient, SearchQuery, SearchResponse, Service};
use crate::error::{CliError, Result};
use indicatif::ProgressBar;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

/// Kind pattern matching every record
pub const ANY_KIND: &str = "*:*:*:*.*.*";

/// Default number of ids per search query
pub const DEFAULT_VERIFY_BATCH_SIZE: usize = 20;

/// Search body matching any of `record_ids` exactly
pub fn build_search_query(record_ids: &[String]) -> SearchQuery {
    let query = record_ids
        .iter()
        .map(|id| format!("\"{}\"", id))
        .collect::<Vec<_>>()
        .join(" OR ");

    SearchQuery {
        kind: ANY_KIND.to_string(),
        limit: endpoints::SEARCH_LIMIT,
        returned_fields: vec!["id".to_string()],
        offset: 0,
        query,
    }
}

/// Ids split by whether search found them, each in input order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyOutcome {
    pub found: Vec<String>,
    pub not_found: Vec<String>,
}

impl VerifyOutcome {
    pub fn total(&self) -> usize {
        self.found.len() + self.not_found.len()
    }

    fn extend(&mut self, other: VerifyOutcome) {
        self.found.extend(other.found);
        self.not_found.extend(other.not_found);
    }
}

/// Queues record ids and checks them in fixed-size search batches
///
/// Full batches are sent by [`process`](Self::process); the final partial
/// batch only when `flush_all` is set.
pub struct ExistenceVerifier<'a> {
    client: &'a OsduClient,
    batch_size: usize,
    queue: Vec<String>,
    seen: HashSet<String>,
    outcome: VerifyOutcome,
    progress: Option<ProgressBar>,
}

impl<'a> ExistenceVerifier<'a> {
    pub fn new(client: &'a OsduClient, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(CliError::invalid_argument("batch size must be at least 1"));
        }
        Ok(Self {
            client,
            batch_size,
            queue: Vec::new(),
            seen: HashSet::new(),
            outcome: VerifyOutcome::default(),
            progress: None,
        })
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Queue ids, ignoring any already queued or checked
    pub fn push<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        for id in ids {
            if self.seen.insert(id.clone()) {
                self.queue.push(id);
            }
        }
    }

    /// Number of ids queued but not yet checked
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Send every full batch, and the remainder too when `flush_all` is set
    pub async fn process(&mut self, flush_all: bool) -> Result<()> {
        while self.queue.len() >= self.batch_size || (flush_all && !self.queue.is_empty()) {
            let take = self.batch_size.min(self.queue.len());
            let chunk: Vec<String> = self.queue.drain(..take).collect();
            info!(
                batch_size = chunk.len(),
                remaining = self.queue.len(),
                "Processing verify batch"
            );

            let outcome = self.verify_chunk(&chunk).await?;
            if let Some(progress) = &self.progress {
                progress.inc(chunk.len() as u64);
            }
            self.outcome.extend(outcome);
        }
        Ok(())
    }

    /// Check `ids` and everything still queued, returning the full outcome
    pub async fn verify(mut self, ids: Vec<String>) -> Result<VerifyOutcome> {
        self.push(ids);
        self.process(true).await?;
        Ok(self.finish())
    }

    /// Outcome of every batch sent so far
    pub fn finish(self) -> VerifyOutcome {
        if !self.queue.is_empty() {
            debug!(pending = self.queue.len(), "Finishing with unchecked ids");
        }
        self.outcome
    }

    async fn verify_chunk(&self, chunk: &[String]) -> Result<VerifyOutcome> {
        let query = build_search_query(chunk);
        debug!(query = %query.query, "Search query");

        let response: SearchResponse = self
            .client
            .post_json(Service::Search, &endpoints::search_query_path(), &query)
            .await?;

        let present: HashSet<&str> = response
            .results
            .iter()
            .filter_map(|hit| hit.id.as_deref())
            .collect();

        let (found, not_found): (Vec<String>, Vec<String>) = chunk
            .iter()
            .cloned()
            .partition(|id| present.contains(id.as_str()));

        if !not_found.is_empty() {
            info!(count = not_found.len(), ids = ?not_found, "Records not found");
        }
        Ok(VerifyOutcome { found, not_found })
    }
}
