//! Catalog error types

use thiserror::Error;

/// Errors surfaced by the catalog core
///
/// Manifest and README failures never show up here: those fetchers
/// degrade to `None` and the caller falls back to index data.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// No resolution strategy matched the requested path
    #[error("Package not found: {path}")]
    NotFound { path: String },

    /// Transport-level failure while fetching a document
    #[error("Failed to fetch {url}")]
    Fetch {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    /// The server answered with a non-success status
    #[error("Failed to fetch {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    /// The index body is not a valid package index document
    #[error("Failed to parse package index from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CatalogError {
    /// Whether retrying the same request could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, CatalogError::Fetch { .. } | CatalogError::Status { .. })
    }
}
