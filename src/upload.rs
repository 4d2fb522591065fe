//! File upload transport.
//!
//! An [`Uploader`] ships a local file to a URL and reports the raw response
//! body and status. It does not interpret the body; the storage sub-client
//! does that. Non-2xx statuses are still `Ok`, since the body is what the
//! caller wants to see.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Timeouts, client_info};
use crate::error::Error;
use crate::fetch::{AccessTokenProvider, Method, response_headers};
use crate::helpers::{AUTHORIZATION, CONTENT_TYPE, Headers, bearer_value, has_header, set_header};

pub const DEFAULT_FIELD_NAME: &str = "file";
const FILE_URI_SCHEME: &str = "file://";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadType {
    /// The file bytes are the request body.
    #[default]
    BinaryContent,
    /// The file is one part of a `multipart/form-data` body.
    Multipart,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadOptions {
    pub headers: Headers,
    pub http_method: Method,
    pub upload_type: UploadType,
    /// Multipart field holding the file. Defaults to `file`.
    pub field_name: Option<String>,
    pub mime_type: Option<String>,
    /// Extra multipart text fields.
    pub parameters: Headers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub status: u16,
    pub headers: Headers,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("could not read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid mime type '{0}'")]
    MimeType(String),

    #[error("upload failed: {0}")]
    Connection(String),

    #[error("upload response with status {status} could not be read: {message}")]
    Incomplete { status: u16, message: String },
}

#[async_trait::async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, url: &str, file_uri: &str, options: UploadOptions) -> Result<UploadResult, UploadError>;
}

/// Local filesystem path behind a `file://` URI. Plain paths pass through.
#[must_use]
pub fn local_path(file_uri: &str) -> &str {
    file_uri.strip_prefix(FILE_URI_SCHEME).unwrap_or(file_uri)
}

// =============================================================================
// REQWEST UPLOADER
// =============================================================================

pub struct ReqwestUploader {
    http: reqwest::Client,
}

impl ReqwestUploader {
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
impl Uploader for ReqwestUploader {
    async fn upload(&self, url: &str, file_uri: &str, options: UploadOptions) -> Result<UploadResult, UploadError> {
        let path = local_path(file_uri);
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| UploadError::ReadFile { path: path.to_owned(), source })?;

        let UploadOptions { mut headers, http_method, upload_type, field_name, mime_type, parameters } = options;
        let mut builder = self.http.request(http_method.into(), url);

        match upload_type {
            UploadType::BinaryContent => {
                if !has_header(&headers, CONTENT_TYPE) {
                    let mime = mime_type.unwrap_or_else(|| "application/octet-stream".to_owned());
                    set_header(&mut headers, CONTENT_TYPE, mime);
                }
                builder = builder.body(bytes);
            }
            UploadType::Multipart => {
                let file_name = Path::new(path)
                    .file_name()
                    .map_or_else(|| DEFAULT_FIELD_NAME.to_owned(), |n| n.to_string_lossy().into_owned());
                let mut part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
                if let Some(mime) = mime_type {
                    part = part.mime_str(&mime).map_err(|_| UploadError::MimeType(mime.clone()))?;
                }
                let form = parameters
                    .into_iter()
                    .fold(reqwest::multipart::Form::new(), |form, (name, value)| form.text(name, value))
                    .part(field_name.unwrap_or_else(|| DEFAULT_FIELD_NAME.to_owned()), part);
                // reqwest sets the multipart content type with its boundary.
                headers.retain(|name, _| !name.eq_ignore_ascii_case(CONTENT_TYPE));
                builder = builder.multipart(form);
            }
        }

        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        tracing::debug!(method = %http_method, url, ?upload_type, "dispatching upload");
        let response = builder
            .send()
            .await
            .map_err(|e| UploadError::Connection(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response_headers(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| UploadError::Incomplete { status, message: e.to_string() })?;

        Ok(UploadResult { status, headers, body })
    }
}

/// Use the caller's uploader when given, otherwise build the default one.
///
/// # Errors
///
/// Returns an error if the default HTTP client fails to build.
pub fn resolve_uploader(custom: Option<Arc<dyn Uploader>>, timeouts: Timeouts) -> Result<Arc<dyn Uploader>, Error> {
    match custom {
        Some(uploader) => Ok(uploader),
        None => Ok(Arc::new(ReqwestUploader::new(timeouts)?)),
    }
}

// =============================================================================
// BEARER INJECTION
// =============================================================================

/// Uploader decorator that sets `Authorization: Bearer <token>` before
/// delegating, using `null` when no token is available.
pub struct UploadWithAuth {
    inner: Arc<dyn Uploader>,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl UploadWithAuth {
    #[must_use]
    pub fn new(tokens: Arc<dyn AccessTokenProvider>, inner: Arc<dyn Uploader>) -> Self {
        Self { inner, tokens }
    }
}

#[async_trait::async_trait]
impl Uploader for UploadWithAuth {
    async fn upload(&self, url: &str, file_uri: &str, mut options: UploadOptions) -> Result<UploadResult, UploadError> {
        let token = self.tokens.access_token().await;
        set_header(&mut options.headers, AUTHORIZATION, bearer_value(token.as_deref()));
        self.inner.upload(url, file_uri, options).await
    }
}

#[cfg(test)]
#[path = "upload_test.rs"]
mod tests;
