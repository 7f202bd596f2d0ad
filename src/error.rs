// src/error.rs
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failures raised while turning a source into candidate items.
///
/// `Fetch` and `Parse` are absorbed at the pipeline boundary and recorded on
/// the source; they never stop other sources from being processed.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("parse failed: {0}")]
    Parse(String),

    /// Retryable; the next scheduled cycle is the retry.
    #[error("rate limited until {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    /// Provider credentials invalid or expired. Terminal for the source
    /// until it is reconfigured externally.
    #[error("provider auth rejected: {0}")]
    Auth(String),
}

/// Failures from the persistence boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The (source_id, external_id) uniqueness constraint fired. Second line
    /// of defense behind the dedup ledger; absorbed per item.
    #[error("alert already exists for this (source, external id) pair")]
    DuplicateAlert,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("storage backend: {0}")]
    Backend(String),
}
