//! Error type shared by the retrieval engine and the metrics layer.

use std::time::Duration;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A timestamp matched neither `YYYY-MM-DD` nor an ISO-8601 instant.
    #[error("malformed timestamp '{value}'")]
    MalformedTimestamp { value: String },

    /// Non-success status or transport failure while fetching a listing page.
    #[error("failed to fetch issue page {page}: {reason}")]
    PageFetch { page: u32, reason: String },

    /// Non-success status or transport failure while fetching one pull request.
    #[error("failed to fetch pull request #{number}: {reason}")]
    DetailFetch { number: u64, reason: String },

    #[error("failed to decode {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// A page pointed at a next page without telling us where the listing ends.
    #[error("page {page} has a next relation but no parseable last relation")]
    PaginationMetadataMissing { page: u32 },

    #[error("page {page} links to next page {next} which does not advance within last page {last}")]
    PaginationInconsistent { page: u32, next: u32, last: u32 },

    #[error("collection stopped after reaching the limit of {limit} pages")]
    PageLimitExceeded { limit: u32 },

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    #[error("failed to build GitHub client: {0}")]
    Client(#[from] octocrab::Error),
}

impl Error {
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }
}
