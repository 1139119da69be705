use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid API base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid API path '{path}': {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: url::ParseError,
    },
    /// Non-2xx response; `body` is the raw response text.
    #[error("API {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Request(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
