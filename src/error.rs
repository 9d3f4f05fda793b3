//! Error taxonomy for the export pipeline.
//!
//! Only two failure classes ever reach a caller: descriptor acquisition
//! ([`FetchError`]) and sink writes ([`ExportError`]). Cell conversion
//! failures degrade to null inside the materializer and are never surfaced.

use std::path::PathBuf;

use thiserror::Error;

/// Remote descriptor acquisition failure.
///
/// Cloneable because concurrent callers of the single-flight cache all
/// observe the same stored failure.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The endpoint answered with a non-success status.
    #[error("descriptor fetch returned HTTP {status} {reason} for {url}: {body}")]
    Status {
        url: String,
        status: u16,
        reason: String,
        body: String,
    },

    /// The request never produced a response (DNS, connect, timeout, ...).
    #[error("descriptor fetch failed for {url}: {message}")]
    Transport { url: String, message: String },

    /// The shared in-flight fetch task was torn down before completing.
    #[error("descriptor fetch aborted for {url}")]
    Aborted { url: String },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Status { url, .. }
            | FetchError::Transport { url, .. }
            | FetchError::Aborted { url } => url,
        }
    }
}

/// Export-side failure: the destination sink or an operator cancellation.
///
/// Writer failures are retryable; the caller may pick another destination.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot write export destination {path:?}: {source}")]
    Writer {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("delimited output error: {0}")]
    Delimited(#[from] csv::Error),

    #[error("export cancelled")]
    Cancelled,
}
