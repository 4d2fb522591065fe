//! Request transport, failure classification and bearer-token injection.
//!
//! ARCHITECTURE
//! ============
//! Every HTTP call in the SDK goes through a [`Transport`]. The auth
//! manager uses a plain transport authenticated by a static Basic header;
//! the rpc sub-client gets the same transport wrapped in [`FetchWithAuth`],
//! which looks up the current access token right before each dispatch.
//!
//! [`handle_error`] turns a [`TransportError`] into an [`AuthError`]:
//! a failure status of 502/503/504 or an unreadable response is retryable,
//! any other failure status is an API error, and no response at all is an
//! unknown error carrying the transport failure as its cause.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::config::{Timeouts, client_info};
use crate::error::{AuthError, Error, NETWORK_ERROR_CODES};
use crate::helpers::{AUTHORIZATION, Headers, bearer_value, set_header};

// =============================================================================
// REQUEST / RESPONSE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Patch => Self::PATCH,
            Method::Delete => Self::DELETE,
        }
    }
}

/// Outgoing request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Text(String),
    Binary(Vec<u8>),
    /// Multi-part form fields. The transport picks the boundary.
    Form(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub method: Method,
    pub headers: Headers,
    pub body: Option<RequestBody>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Headers,
    /// Decoded body. A body that is not JSON is kept as a JSON string;
    /// an empty body is `null`.
    pub data: Value,
}

/// Failure reported by a [`Transport`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The server answered with a failure status.
    #[error("request failed with status {}", .0.status)]
    Status(HttpResponse),

    /// A response started but its body could not be read.
    #[error("response with status {status} could not be read: {message}")]
    Incomplete { status: u16, message: String },

    /// No response was received.
    #[error("{0}")]
    Connection(String),
}

// =============================================================================
// TRANSPORT TRAIT
// =============================================================================

/// Issues one HTTP request. Implementations must report failure statuses as
/// [`TransportError::Status`] and missing responses as
/// [`TransportError::Connection`].
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Yields the access token to attach to outgoing calls.
#[async_trait::async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Option<String>;
}

// =============================================================================
// REQWEST TRANSPORT
// =============================================================================

/// Default transport backed by an async `reqwest` client.
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(timeouts: Timeouts) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(client_info())
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| Error::HttpClientBuild(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.http.request(request.method.into(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match request.body {
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Text(text)) => builder.body(text),
            Some(RequestBody::Binary(bytes)) => builder.body(bytes),
            Some(RequestBody::Form(fields)) => {
                let form = fields
                    .into_iter()
                    .fold(reqwest::multipart::Form::new(), |form, (name, value)| form.text(name, value));
                builder.multipart(form)
            }
            None => builder,
        };

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response_headers(response.headers());
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Incomplete { status, message: e.to_string() })?;

        let response = HttpResponse { status, headers, data: decode_body(&text) };
        if (200..300).contains(&status) {
            Ok(response)
        } else {
            Err(TransportError::Status(response))
        }
    }
}

pub(crate) fn response_headers(map: &reqwest::header::HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in map {
        if let Ok(value) = value.to_str() {
            headers.insert(name.as_str().to_owned(), value.to_owned());
        }
    }
    headers
}

pub(crate) fn decode_body(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
}

/// Use the caller's transport when given, otherwise build the default one.
///
/// # Errors
///
/// Returns an error if the default HTTP client fails to build.
pub fn resolve_transport(custom: Option<Arc<dyn Transport>>, timeouts: Timeouts) -> Result<Arc<dyn Transport>, Error> {
    match custom {
        Some(transport) => Ok(transport),
        None => Ok(Arc::new(ReqwestTransport::new(timeouts)?)),
    }
}

// =============================================================================
// FAILURE CLASSIFICATION
// =============================================================================

/// Classify a transport failure into the auth taxonomy.
#[must_use]
pub fn handle_error(error: TransportError) -> AuthError {
    match error {
        TransportError::Status(response) => {
            let message = error_message(&response.data, response.status);
            if NETWORK_ERROR_CODES.contains(&response.status) {
                AuthError::RetryableFetch { message, status: response.status }
            } else {
                let status = if response.status == 0 { 500 } else { response.status };
                AuthError::Api { message, status }
            }
        }
        TransportError::Incomplete { status, message } => AuthError::RetryableFetch { message, status },
        TransportError::Connection(message) => {
            let cause = TransportError::Connection(message.clone());
            AuthError::unknown(message, cause)
        }
    }
}

/// Best human-readable message in a failure payload.
pub(crate) fn error_message(data: &Value, status: u16) -> String {
    if let Some(description) = data.get("error_description").and_then(Value::as_str) {
        return description.to_owned();
    }
    match data {
        Value::Null => format!("request failed with status {status}"),
        Value::String(text) if text.is_empty() => format!("request failed with status {status}"),
        Value::String(text) => text.clone(),
        Value::Object(map) => ["msg", "message", "error"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map_or_else(|| data.to_string(), str::to_owned),
        other => other.to_string(),
    }
}

// =============================================================================
// REQUEST HELPER
// =============================================================================

/// Send a JSON request and return the response payload, classifying any
/// failure into the auth taxonomy.
pub(crate) async fn request(
    transport: &dyn Transport,
    method: Method,
    url: &str,
    headers: &Headers,
    body: Option<Value>,
) -> Result<Value, AuthError> {
    tracing::debug!(%method, url, "dispatching auth request");
    let request = HttpRequest {
        url: url.to_owned(),
        method,
        headers: headers.clone(),
        body: body.map(RequestBody::Json),
    };
    match transport.send(request).await {
        Ok(response) => Ok(response.data),
        Err(e) => Err(handle_error(e)),
    }
}

// =============================================================================
// BEARER INJECTION
// =============================================================================

/// Transport decorator that sets `Authorization: Bearer <token>` on every
/// request, using the literal `null` when no token is available.
pub struct FetchWithAuth {
    inner: Arc<dyn Transport>,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl FetchWithAuth {
    #[must_use]
    pub fn new(tokens: Arc<dyn AccessTokenProvider>, inner: Arc<dyn Transport>) -> Self {
        Self { inner, tokens }
    }
}

#[async_trait::async_trait]
impl Transport for FetchWithAuth {
    async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let token = self.tokens.access_token().await;
        set_header(&mut request.headers, AUTHORIZATION, bearer_value(token.as_deref()));
        self.inner.send(request).await
    }
}

#[cfg(test)]
#[path = "fetch_test.rs"]
mod tests;
