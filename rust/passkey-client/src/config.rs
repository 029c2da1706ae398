use crate::error::ClientError;
use url::Url;

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api/auth";

/// Configuration for [`HttpFetch`](crate::HttpFetch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the auth server; endpoint paths are appended to it.
    pub base_url: String,

    /// Optional timeout for requests in seconds
    pub timeout_seconds: Option<u64>,

    /// Headers sent with every request
    pub headers: Vec<(String, String)>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: None,
            headers: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration for the auth server at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Add a custom header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Authenticate every request with a bearer token
    pub fn with_bearer(self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref());
        self.with_header("authorization", value)
    }

    /// Resolve an endpoint path such as `/passkey/verify-registration`
    /// against the base URL.
    ///
    /// The base URL's own path is kept, so `/api/auth` plus
    /// `/passkey/verify-registration` yields `/api/auth/passkey/verify-registration`.
    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        let base = format!("{}/", self.base_url.trim_end_matches('/'));
        let base = Url::parse(&base).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        base.join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))
    }
}
