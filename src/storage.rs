//! File storage sub-client.
//!
//! Uploads always go out as multipart. The result is always an envelope:
//! upload failures and non-JSON response bodies both land in its error
//! side, and nothing is returned as `Err`. This differs from
//! [`RpcClient::invoke`](crate::rpc::RpcClient::invoke), which returns
//! `Err` on failure.

use std::sync::Arc;

use serde_json::Value;

use crate::error::StorageError;
use crate::helpers::{Headers, merge_headers};
use crate::types::Envelope;
use crate::upload::{UploadOptions, UploadType, Uploader};

/// One upload: local `file_uri` to `<storage url>/<path>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileUpload {
    pub path: String,
    pub file_uri: String,
    pub options: UploadOptions,
}

pub struct StorageClient {
    url: String,
    headers: Headers,
    uploader: Arc<dyn Uploader>,
}

impl StorageClient {
    /// `uploader` is expected to attach the bearer token.
    #[must_use]
    pub fn new(url: impl Into<String>, headers: Headers, uploader: Arc<dyn Uploader>) -> Self {
        Self { url: url.into(), headers, uploader }
    }

    /// Upload a file and decode the JSON response body.
    ///
    /// Client headers are sent under the per-call headers. A response body
    /// that is not JSON comes back as [`StorageError::InvalidBody`] holding
    /// the raw text.
    pub async fn upload(&self, upload: FileUpload) -> Envelope<Value, StorageError> {
        let FileUpload { path, file_uri, mut options } = upload;
        options.upload_type = UploadType::Multipart;
        options.headers = merge_headers(&[&self.headers, &options.headers]);
        let url = format!("{}/{path}", self.url);

        tracing::debug!(url = %url, file_uri = %file_uri, "uploading file");
        let result = match self.uploader.upload(&url, &file_uri, options).await {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!(url = %url, error = %error, "upload failed");
                return Envelope::err(StorageError::Upload(error));
            }
        };

        match serde_json::from_str::<Value>(&result.body) {
            Ok(data) => Envelope::ok(data),
            Err(_) => {
                tracing::warn!(url = %url, status = result.status, "upload response is not JSON");
                Envelope::err(StorageError::InvalidBody(result.body))
            }
        }
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
