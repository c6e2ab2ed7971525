use thiserror::Error;

/// Errors that can occur while talking to a provider stock API.
#[derive(Debug, Error)]
pub enum FeedError {
    /// An error during an API request (e.g., network failure, timeout, bad JSON).
    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("API error ({status}): {body}")]
    Api {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Response body, or a placeholder when it could not be read.
        body: String,
    },

    /// The provider is not configured well enough to be queried.
    #[error("Invalid provider configuration: {0}")]
    Config(String),
}
