//! Remote function invocation.
//!
//! Unlike the auth flows, a failed invocation is returned as `Err(RpcError)`
//! rather than inside an envelope. Callers that branch on envelopes for auth
//! and storage still need to handle `Err` here.

use std::sync::Arc;

use serde_json::Value;

use crate::error::RpcError;
use crate::fetch::{HttpRequest, Method, RequestBody, Transport, TransportError, error_message};
use crate::helpers::{CONTENT_TYPE, Headers, has_header, merge_headers, set_header};

/// Arguments passed to a remote function.
#[derive(Debug, Clone, PartialEq)]
pub enum InvokeBody {
    Json(Value),
    Text(String),
    Binary(Vec<u8>),
    /// Multi-part form fields; the transport picks the boundary.
    Form(Vec<(String, String)>),
}

impl InvokeBody {
    /// Content type implied by the body kind. Forms have none of their own.
    #[must_use]
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Self::Json(_) => Some("application/json"),
            Self::Text(_) => Some("text/plain"),
            Self::Binary(_) => Some("application/octet-stream"),
            Self::Form(_) => None,
        }
    }
}

impl From<InvokeBody> for RequestBody {
    fn from(body: InvokeBody) -> Self {
        match body {
            InvokeBody::Json(value) => Self::Json(value),
            InvokeBody::Text(text) => Self::Text(text),
            InvokeBody::Binary(bytes) => Self::Binary(bytes),
            InvokeBody::Form(fields) => Self::Form(fields),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvokeOptions {
    /// Highest-precedence headers for this call.
    pub headers: Headers,
    /// Defaults to POST.
    pub method: Option<Method>,
    pub body: Option<InvokeBody>,
}

pub struct RpcClient {
    url: String,
    headers: Headers,
    transport: Arc<dyn Transport>,
}

impl RpcClient {
    /// `transport` is expected to attach the bearer token.
    #[must_use]
    pub fn new(url: impl Into<String>, headers: Headers, transport: Arc<dyn Transport>) -> Self {
        Self { url: url.into(), headers, transport }
    }

    /// Call `<url>/<function_name>` and return the response payload.
    ///
    /// Header precedence, highest first: `options.headers`, client headers,
    /// the content type implied by the body. The implied type only applies
    /// when the call sets no `Content-Type` of its own.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError`] when the request fails; `context` holds the
    /// server payload when there was a response.
    pub async fn invoke(&self, function_name: &str, options: InvokeOptions) -> Result<Value, RpcError> {
        let InvokeOptions { headers, method, body } = options;

        let mut inferred = Headers::new();
        if let Some(content_type) = body.as_ref().and_then(InvokeBody::content_type) {
            if !has_header(&headers, CONTENT_TYPE) {
                set_header(&mut inferred, CONTENT_TYPE, content_type.to_owned());
            }
        }

        let method = method.unwrap_or_default();
        let request = HttpRequest {
            url: format!("{}/{function_name}", self.url),
            method,
            headers: merge_headers(&[&inferred, &self.headers, &headers]),
            body: body.map(RequestBody::from),
        };

        tracing::debug!(%method, function = function_name, "invoking rpc");
        match self.transport.send(request).await {
            Ok(response) => Ok(response.data),
            Err(error) => {
                tracing::warn!(function = function_name, error = %error, "rpc failed");
                Err(rpc_error(error))
            }
        }
    }
}

fn rpc_error(error: TransportError) -> RpcError {
    match error {
        TransportError::Status(response) => RpcError {
            message: error_message(&response.data, response.status),
            status: Some(response.status),
            context: Some(response.data),
        },
        TransportError::Incomplete { status, message } => {
            RpcError { message, status: Some(status), context: None }
        }
        TransportError::Connection(message) => RpcError {
            message: if message.is_empty() { RpcError::DEFAULT_MESSAGE.to_owned() } else { message },
            status: None,
            context: None,
        },
    }
}

#[cfg(test)]
#[path = "rpc_test.rs"]
mod tests;
