//! Inventory REST API client.
//!
//! Every endpoint goes through [`ApiClient::send`], which turns the backend's
//! inconsistent responses into one shape:
//!
//! - `204 No Content` or an empty body is `Ok(None)`
//! - a 2xx body is decoded as the requested type, or fails with
//!   [`ApiError::Decode`] (never a silent empty value)
//! - `422` with a `found` member is treated as success and yields `found`
//!   (when [`ApiConfig::unwrap_found`] is set)
//! - any other status fails with [`ApiError::Status`]
//!
//! The endpoint groups in the submodules only build paths and bodies.

mod categories;
mod periods;
mod products;
mod records;

pub use products::{ImageFile, ImageSource};

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode, multipart};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use stockcount_core::extract_error_message;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::ApiConfig;

/// Longest body excerpt kept on a decode failure.
const EXCERPT_LEN: usize = 200;

/// Errors that can occur when talking to the inventory API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("HTTP error: {0}")]
    Network(#[from] reqwest::Error),

    /// A 2xx response body did not match the expected shape.
    #[error("Invalid response body (HTTP {status}): {source}")]
    Decode {
        status: u16,
        source: serde_json::Error,
        /// Start of the offending body, for logs.
        excerpt: String,
    },

    /// The server answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Status {
        status: u16,
        message: String,
        body: Option<Value>,
    },

    /// The endpoint returned no body where one was required.
    #[error("Empty response from {path}")]
    MissingPayload { path: String },

    /// The request body could not be built.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// HTTP status carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::Decode { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            Self::MissingPayload { .. } | Self::InvalidRequest(_) => None,
        }
    }

    /// Whether the failure happened below HTTP (DNS, TLS, connection reset).
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Body of an outgoing request.
#[derive(Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(multipart::Form),
}

/// Method, body and extra headers for one call.
#[derive(Debug)]
pub struct ApiRequest {
    method: Method,
    body: RequestBody,
    headers: HeaderMap,
}

impl ApiRequest {
    /// A request with the given method and no body.
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            body: RequestBody::Empty,
            headers: HeaderMap::new(),
        }
    }

    #[must_use]
    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    #[must_use]
    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    #[must_use]
    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    #[must_use]
    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidRequest` if `body` cannot be serialized.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value =
            serde_json::to_value(body).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    /// Attach a multipart form body.
    #[must_use]
    pub fn multipart(mut self, form: multipart::Form) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    /// Add a header. Caller headers are applied last and win over defaults.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// The HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }
}

/// Inventory REST API client.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    /// Base URL without a trailing slash
    base_url: String,
    unwrap_found: bool,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("unwrap_found", &self.inner.unwrap_found)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                unwrap_found: config.unwrap_found,
            }),
        })
    }

    /// The base URL requests are issued against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.inner.base_url)
        } else {
            format!("{}/{path}", self.inner.base_url)
        }
    }

    /// Issue a request and normalize the response.
    ///
    /// Adds `Authorization: Bearer <token>` when `token` is given.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` on transport failure, `ApiError::Decode`
    /// for an unparsable 2xx body and `ApiError::Status` for any other
    /// non-success response.
    #[instrument(skip(self, token, request), fields(method = %request.method))]
    pub async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&SecretString>,
        request: ApiRequest,
    ) -> Result<Option<T>, ApiError> {
        let ApiRequest {
            method,
            body,
            headers,
        } = request;

        let mut builder = self.inner.client.request(method, self.url(path));
        if let Some(token) = token {
            builder = builder.bearer_auth(token.expose_secret());
        }
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => builder.multipart(form),
        };
        builder = builder.headers(headers);

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(status = status.as_u16(), bytes = text.len(), "API response");

        normalize(status, &text, self.inner.unwrap_found)
    }

    /// Like [`send`](Self::send), but an absent body is an error.
    ///
    /// # Errors
    ///
    /// Everything `send` returns, plus `ApiError::MissingPayload`.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&SecretString>,
        request: ApiRequest,
    ) -> Result<T, ApiError> {
        self.send(path, token, request)
            .await?
            .ok_or_else(|| ApiError::MissingPayload {
                path: path.to_string(),
            })
    }

    /// Issue a request whose response body, if any, is discarded.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub async fn execute(
        &self,
        path: &str,
        token: Option<&SecretString>,
        request: ApiRequest,
    ) -> Result<(), ApiError> {
        self.send::<serde::de::IgnoredAny>(path, token, request)
            .await
            .map(|_| ())
    }
}

/// Turn a status code and body text into the normalized result.
///
/// # Errors
///
/// See [`ApiClient::send`].
pub fn normalize<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
    unwrap_found: bool,
) -> Result<Option<T>, ApiError> {
    let empty = body.trim().is_empty();

    if status.is_success() {
        if status == StatusCode::NO_CONTENT || empty {
            return Ok(None);
        }
        return serde_json::from_str(body)
            .map(Some)
            .map_err(|source| decode_error(status, source, body));
    }

    let parsed: Option<Value> = if empty {
        None
    } else {
        serde_json::from_str(body).ok()
    };

    if unwrap_found
        && status == StatusCode::UNPROCESSABLE_ENTITY
        && let Some(found) = parsed.as_ref().and_then(|value| value.get("found"))
    {
        debug!("unwrapping `found` from 422 response");
        if found.is_null() {
            return Ok(None);
        }
        return serde_json::from_value(found.clone())
            .map(Some)
            .map_err(|source| decode_error(status, source, body));
    }

    let message = parsed
        .as_ref()
        .and_then(extract_error_message)
        .or_else(|| (!empty).then(|| body.trim().to_string()))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });

    Err(ApiError::Status {
        status: status.as_u16(),
        message,
        body: parsed,
    })
}

fn decode_error(status: StatusCode, source: serde_json::Error, body: &str) -> ApiError {
    ApiError::Decode {
        status: status.as_u16(),
        source,
        excerpt: body.chars().take(EXCERPT_LEN).collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use stockcount_core::Category;

    use super::*;

    #[test]
    fn test_no_content_is_none() {
        let result: Option<Category> = normalize(StatusCode::NO_CONTENT, "", true).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_empty_success_body_is_none() {
        let result: Option<Category> = normalize(StatusCode::OK, "  \n", true).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_success_decodes() {
        let result: Option<Category> =
            normalize(StatusCode::CREATED, r#"{"id":1,"name":"Tools"}"#, true).unwrap();
        assert_eq!(result.unwrap().name, "Tools");
    }

    #[test]
    fn test_malformed_success_is_decode_error() {
        let err = normalize::<Category>(StatusCode::OK, "<html>oops</html>", true).unwrap_err();
        assert!(matches!(err, ApiError::Decode { status: 200, ref excerpt, .. } if excerpt.starts_with("<html>")));

        let err = normalize::<Category>(StatusCode::OK, r#"{"id":"x"}"#, true).unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[test]
    fn test_status_error_extracts_message() {
        let err = normalize::<Category>(
            StatusCode::NOT_FOUND,
            r#"{"message":"Category not found"}"#,
            true,
        )
        .unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "API error (404): Category not found");
    }

    #[test]
    fn test_status_error_raw_text_and_empty() {
        let err = normalize::<Category>(StatusCode::BAD_GATEWAY, "upstream down", true).unwrap_err();
        assert!(matches!(err, ApiError::Status { ref message, body: None, .. } if message == "upstream down"));

        let err = normalize::<Category>(StatusCode::INTERNAL_SERVER_ERROR, "", true).unwrap_err();
        assert!(
            matches!(err, ApiError::Status { status: 500, ref message, .. } if message == "Internal Server Error")
        );
    }

    #[test]
    fn test_unprocessable_found_is_success() {
        let body = r#"{"message":"already exists","found":{"id":9,"name":"Dairy"}}"#;
        let found: Option<Category> =
            normalize(StatusCode::UNPROCESSABLE_ENTITY, body, true).unwrap();
        assert_eq!(found.unwrap().id.as_i32(), 9);

        let null: Option<Category> =
            normalize(StatusCode::UNPROCESSABLE_ENTITY, r#"{"found":null}"#, true).unwrap();
        assert!(null.is_none());
    }

    #[test]
    fn test_unprocessable_found_disabled_is_error() {
        let body = r#"{"message":"already exists","found":{"id":9,"name":"Dairy"}}"#;
        let err = normalize::<Category>(StatusCode::UNPROCESSABLE_ENTITY, body, false).unwrap_err();
        assert_eq!(err.status(), Some(422));
    }

    #[test]
    fn test_unprocessable_without_found_is_error() {
        let err = normalize::<Category>(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"error":"name is required"}"#,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 422, ref message, .. } if message == "name is required"));
    }

    #[test]
    fn test_request_json_body() {
        let request = ApiRequest::post()
            .json(&serde_json::json!({"name": "x"}))
            .unwrap();
        assert_eq!(*request.method(), Method::POST);
        assert!(matches!(request.body, RequestBody::Json(_)));
    }
}
