use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum PreviewError {
    /// Required configuration is missing. Raised synchronously at the start
    /// of an orchestration run and aborts the whole trigger; it signals a
    /// caller programming error, not a runtime condition.
    #[error("Missing required configuration: {0}")]
    Configuration(String),

    /// A candidate link could not be encoded into a cache key. The
    /// orchestrator skips the offending link and keeps processing siblings.
    #[error("Failed to encode preview key: {0}")]
    Encoding(String),

    /// A key could not be decoded back into its URL.
    #[error("Failed to decode preview key: {0}")]
    Decode(String),

    /// The injected metadata fetcher failed. The key stays out of the cache,
    /// leaves the pending set, and the link is omitted from the result.
    #[error("Failed to fetch metadata: {0}")]
    Fetch(String),
}

impl PreviewError {
    pub fn log(&self) {
        match self {
            PreviewError::Configuration(e) => {
                error!(error = %e, "Orchestrator misconfigured");
            }
            PreviewError::Encoding(e) => {
                warn!(error = %e, "Key encoding failed");
            }
            PreviewError::Decode(e) => {
                warn!(error = %e, "Key decoding failed");
            }
            PreviewError::Fetch(e) => {
                error!(error = %e, "Metadata fetch failed");
            }
        }
    }
}
