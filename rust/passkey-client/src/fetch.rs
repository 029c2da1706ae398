//! The `{data, error}` fetch surface actions talk to the auth server through.
//!
//! A [`Fetch`] never fails outright: transport problems, non-2xx statuses and
//! malformed bodies all arrive as a [`FetchResponse`] whose `error` is set.
//! Actions hand such responses back to their caller unchanged.

use crate::config::ClientConfig;
use crate::error::ClientError;
use passkey_common::{ConditionalSend, ConditionalSync};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// HTTP method of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// Per-call options supplied by the caller of an action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Extra headers, applied after the configured ones.
    pub headers: Vec<(String, String)>,
}

impl FetchOptions {
    /// Add a header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

/// One request to an auth server endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    /// The HTTP method.
    pub method: Method,
    /// Query parameters, in order.
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Caller-supplied options.
    pub options: FetchOptions,
}

impl FetchRequest {
    /// A `GET` request without query or body.
    pub fn get() -> Self {
        Self {
            method: Method::Get,
            query: Vec::new(),
            body: None,
            options: FetchOptions::default(),
        }
    }

    /// A `POST` request with a JSON body.
    pub fn post(body: Value) -> Self {
        Self {
            method: Method::Post,
            query: Vec::new(),
            body: Some(body),
            options: FetchOptions::default(),
        }
    }

    /// Append a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attach caller-supplied options.
    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }
}

/// The error half of a [`FetchResponse`].
///
/// Every field is optional because servers and transports fill in different
/// subsets of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchError {
    /// Machine-readable code, such as `AUTH_CANCELLED`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// HTTP status, absent for transport failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// HTTP status text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
}

impl From<ClientError> for FetchError {
    fn from(error: ClientError) -> Self {
        Self {
            message: Some(error.to_string()),
            ..Self::default()
        }
    }
}

/// A `{data, error}` pair.
///
/// `data` is `None` whenever the call failed or the server answered with an
/// empty body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResponse<T = Value> {
    /// The decoded body of a successful response.
    pub data: Option<T>,
    /// What went wrong, if anything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FetchError>,
}

impl<T> FetchResponse<T> {
    /// A successful response carrying `data`.
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    /// A failed response.
    pub fn failure(error: FetchError) -> Self {
        Self {
            data: None,
            error: Some(error),
        }
    }
}

/// Issues requests against auth server endpoints.
pub trait Fetch: ConditionalSync {
    /// Send `request` to the endpoint at `path`, e.g.
    /// `/passkey/generate-register-options`.
    fn fetch(
        &self,
        path: &str,
        request: FetchRequest,
    ) -> impl Future<Output = FetchResponse> + ConditionalSend;
}

impl<F> Fetch for Arc<F>
where
    F: Fetch,
{
    fn fetch(
        &self,
        path: &str,
        request: FetchRequest,
    ) -> impl Future<Output = FetchResponse> + ConditionalSend {
        (**self).fetch(path, request)
    }
}

/// [`Fetch`] over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetch {
    config: ClientConfig,
    client: Client,
}

impl HttpFetch {
    /// Create a fetcher for the given configuration
    pub fn new(config: ClientConfig) -> Self {
        #[cfg_attr(target_arch = "wasm32", allow(unused_mut))]
        let mut client_builder = Client::builder();

        #[cfg(not(target_arch = "wasm32"))]
        if let Some(timeout) = config.timeout_seconds {
            client_builder = client_builder.timeout(std::time::Duration::from_secs(timeout));
        }

        let client = client_builder.build().unwrap_or_else(|_| Client::new());

        Self { config, client }
    }

    /// The configuration this fetcher was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build a request with configured and per-call headers
    fn build_request(
        &self,
        path: &str,
        request: &FetchRequest,
    ) -> Result<reqwest::RequestBuilder, ClientError> {
        let mut url = self.config.endpoint(path)?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };

        for (key, value) in self.config.headers.iter().chain(&request.options.headers) {
            builder = builder.header(key, value);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        Ok(builder)
    }

    async fn send(&self, path: &str, request: FetchRequest) -> Result<FetchResponse, ClientError> {
        let response = self.build_request(path, &request)?.send().await?;
        let status = response.status();
        let text = response.text().await?;

        read_response(status, text)
    }
}

/// Map a status and raw body onto the `{data, error}` shape.
///
/// A 2xx with an empty or `null` body carries no data. Any other status
/// becomes an error built from the body's `code` and `message`, falling back
/// to a plain-text body and then to the status reason.
fn read_response(status: StatusCode, text: String) -> Result<FetchResponse, ClientError> {
    let body = if text.trim().is_empty() {
        Value::Null
    } else {
        match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => Value::String(text),
            Err(error) => return Err(ClientError::InvalidBody(error.to_string())),
        }
    };

    if status.is_success() {
        return Ok(FetchResponse {
            data: (!body.is_null()).then_some(body),
            error: None,
        });
    }

    let field = |name: &str| body.get(name).and_then(Value::as_str).map(str::to_owned);
    let status_text = status.canonical_reason().map(str::to_owned);
    Ok(FetchResponse::failure(FetchError {
        code: field("code"),
        message: field("message")
            .or_else(|| body.as_str().map(str::to_owned))
            .or_else(|| status_text.clone()),
        status: Some(status.as_u16()),
        status_text,
    }))
}

impl Fetch for HttpFetch {
    async fn fetch(&self, path: &str, request: FetchRequest) -> FetchResponse {
        let method = request.method;
        match self.send(path, request).await {
            Ok(response) => {
                if let Some(error) = &response.error {
                    tracing::debug!(%method, path, status = ?error.status, "auth server returned an error");
                }
                response
            }
            Err(error) => {
                tracing::debug!(%method, path, %error, "request failed");
                FetchResponse::failure(error.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use testresult::TestResult;

    #[test]
    fn it_serializes_errors_in_camel_case() -> TestResult {
        let response: FetchResponse = FetchResponse::failure(FetchError {
            code: Some("AUTH_CANCELLED".into()),
            message: Some("auth cancelled".into()),
            status: Some(400),
            status_text: Some("BAD_REQUEST".into()),
        });

        assert_eq!(
            serde_json::to_value(&response)?,
            json!({
                "data": null,
                "error": {
                    "code": "AUTH_CANCELLED",
                    "message": "auth cancelled",
                    "status": 400,
                    "statusText": "BAD_REQUEST"
                }
            })
        );
        Ok(())
    }

    #[test]
    fn it_reads_partial_errors() -> TestResult {
        let response: FetchResponse = serde_json::from_value(json!({
            "data": null,
            "error": { "message": "error" }
        }))?;

        assert_eq!(
            response.error,
            Some(FetchError {
                message: Some("error".into()),
                ..FetchError::default()
            })
        );
        Ok(())
    }

    #[test]
    fn it_reads_success_bodies_as_data() -> TestResult {
        let response = read_response(StatusCode::OK, r#"{"challenge":"Y2hhbGxlbmdl"}"#.into())?;
        assert_eq!(
            response,
            FetchResponse::success(json!({ "challenge": "Y2hhbGxlbmdl" }))
        );
        Ok(())
    }

    #[test]
    fn it_gives_no_data_for_empty_or_null_success_bodies() -> TestResult {
        for body in ["", "  ", "null"] {
            let response = read_response(StatusCode::OK, body.into())?;
            assert_eq!(response.data, None);
            assert_eq!(response.error, None);
        }
        Ok(())
    }

    #[test]
    fn it_rejects_malformed_success_bodies() {
        assert!(matches!(
            read_response(StatusCode::OK, "<html>".into()),
            Err(ClientError::InvalidBody(_))
        ));
    }

    #[test]
    fn it_builds_errors_from_json_error_bodies() -> TestResult {
        let response = read_response(
            StatusCode::UNAUTHORIZED,
            r#"{"code":"INVALID_SIGNATURE","message":"bad sig"}"#.into(),
        )?;

        assert_eq!(response.data, None);
        assert_eq!(
            response.error,
            Some(FetchError {
                code: Some("INVALID_SIGNATURE".into()),
                message: Some("bad sig".into()),
                status: Some(401),
                status_text: Some("Unauthorized".into()),
            })
        );
        Ok(())
    }

    #[test]
    fn it_uses_plain_text_error_bodies_as_the_message() -> TestResult {
        let response = read_response(StatusCode::BAD_GATEWAY, "upstream down".into())?;
        let error = response.error.unwrap_or_default();

        assert_eq!(error.code, None);
        assert_eq!(error.message.as_deref(), Some("upstream down"));
        assert_eq!(error.status, Some(502));
        assert_eq!(error.status_text.as_deref(), Some("Bad Gateway"));
        Ok(())
    }

    #[test]
    fn it_falls_back_to_the_status_reason() -> TestResult {
        let response = read_response(StatusCode::NOT_FOUND, String::new())?;
        let error = response.error.unwrap_or_default();

        assert_eq!(error.message.as_deref(), Some("Not Found"));
        assert_eq!(error.status, Some(404));
        Ok(())
    }

    #[test]
    fn it_turns_client_errors_into_status_less_fetch_errors() {
        let error = FetchError::from(ClientError::Transport("connection refused".into()));
        assert_eq!(error.status, None);
        assert_eq!(error.message.as_deref(), Some("request failed: connection refused"));
    }

    #[test]
    fn it_builds_requests_with_query_and_headers() -> TestResult {
        let fetch = HttpFetch::new(
            ClientConfig::new("https://auth.example.com/api/auth").with_header("x-client", "mobile"),
        );
        let request = FetchRequest::get()
            .with_query("name", "laptop key")
            .with_options(FetchOptions::default().with_header("cookie", "session=1"));

        let built = fetch
            .build_request("/passkey/generate-register-options", &request)?
            .build()?;

        assert_eq!(built.method(), reqwest::Method::GET);
        assert_eq!(
            built.url().as_str(),
            "https://auth.example.com/api/auth/passkey/generate-register-options?name=laptop+key"
        );
        assert_eq!(
            built.headers().get("x-client").and_then(|v| v.to_str().ok()),
            Some("mobile")
        );
        assert_eq!(
            built.headers().get("cookie").and_then(|v| v.to_str().ok()),
            Some("session=1")
        );
        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[tokio::test]
    async fn it_reports_unreachable_servers_as_errors() {
        let fetch = HttpFetch::new(ClientConfig::new("http://127.0.0.1:9").with_timeout(2));

        let response = fetch
            .fetch("/passkey/generate-authenticate-options", FetchRequest::post(json!({})))
            .await;

        assert_eq!(response.data, None);
        let error = response.error.unwrap_or_default();
        assert_eq!(error.status, None);
        assert!(error.message.is_some());
    }
}
