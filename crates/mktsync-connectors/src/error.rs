use thiserror::Error;

/// Errors returned by the vendor API clients.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body could not be deserialized into the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The vendor answered 2xx but its envelope reported a failure.
    #[error("{vendor} API error {code}: {message}")]
    Api {
        vendor: &'static str,
        code: String,
        message: String,
    },

    #[error("rate limited by {context} (retry after {retry_after_secs}s)")]
    RateLimited {
        context: String,
        retry_after_secs: u64,
    },

    #[error("unexpected HTTP status {status} from {context}")]
    UnexpectedStatus { status: u16, context: String },

    #[error("{vendor} is missing {what}")]
    MissingCredential {
        vendor: &'static str,
        what: &'static str,
    },

    #[error("invalid base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// A caller-side contract was violated before any request was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ConnectorError {
    /// Builds an [`ConnectorError::Api`] from a vendor envelope.
    pub(crate) fn api(
        vendor: &'static str,
        code: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        Self::Api {
            vendor,
            code: code.to_string(),
            message: message.into(),
        }
    }
}
