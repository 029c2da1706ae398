use thiserror::Error;

/// Failures raised while talking to the auth server.
///
/// These never escape an action; [`HttpFetch`](crate::HttpFetch) folds them
/// into the `error` half of a [`FetchResponse`](crate::FetchResponse).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The base URL or endpoint path could not be parsed
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The request could not be sent or its body could not be read
    #[error("request failed: {0}")]
    Transport(String),

    /// The response body was not valid JSON
    #[error("invalid response body: {0}")]
    InvalidBody(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}
