//! Scripted collaborators for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::{Value, json};

use crate::config::{AuthOptions, ClientOptions, GlobalOptions};
use crate::fetch::{AccessTokenProvider, HttpRequest, HttpResponse, Transport, TransportError};
use crate::helpers::Headers;
use crate::session_store::{MemoryStore, SessionStore, StoreError};
use crate::upload::{UploadError, UploadOptions, UploadResult, Uploader};

pub const TEST_URL: &str = "https://api.example.com";

// =============================================================================
// Transport
// =============================================================================

/// Records every request and answers from a queue. An empty queue answers
/// `200 {}`.
#[derive(Default)]
pub struct MockTransport {
    requests: Mutex<Vec<HttpRequest>>,
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
}

impl MockTransport {
    #[must_use]
    pub fn new(responses: Vec<Result<HttpResponse, TransportError>>) -> Self {
        Self { requests: Mutex::new(Vec::new()), responses: Mutex::new(responses.into()) }
    }

    pub fn push(&self, response: Result<HttpResponse, TransportError>) {
        self.responses.lock().unwrap_or_else(PoisonError::into_inner).push_back(response);
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// The most recent request, if any.
    #[must_use]
    pub fn last(&self) -> Option<HttpRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).last().cloned()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).push(request);
        let next = self.responses.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        next.unwrap_or_else(|| ok(json!({})))
    }
}

/// A 200 response carrying `data`.
pub fn ok(data: Value) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse { status: 200, headers: Headers::new(), data })
}

/// A failure status carrying `data`.
pub fn failure(status: u16, data: Value) -> Result<HttpResponse, TransportError> {
    Err(TransportError::Status(HttpResponse { status, headers: Headers::new(), data }))
}

// =============================================================================
// Uploader
// =============================================================================

#[derive(Debug, Clone)]
pub struct UploadCall {
    pub url: String,
    pub file_uri: String,
    pub options: UploadOptions,
}

/// Records uploads and answers with a fixed body, or fails when built with
/// [`MockUploader::failing`].
pub struct MockUploader {
    calls: Mutex<Vec<UploadCall>>,
    body: String,
    failure: Option<String>,
}

impl MockUploader {
    #[must_use]
    pub fn new(body: impl Into<String>) -> Self {
        Self { calls: Mutex::new(Vec::new()), body: body.into(), failure: None }
    }

    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self { calls: Mutex::new(Vec::new()), body: String::new(), failure: Some(message.into()) }
    }

    #[must_use]
    pub fn calls(&self) -> Vec<UploadCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait::async_trait]
impl Uploader for MockUploader {
    async fn upload(&self, url: &str, file_uri: &str, options: UploadOptions) -> Result<UploadResult, UploadError> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(UploadCall {
            url: url.to_owned(),
            file_uri: file_uri.to_owned(),
            options,
        });
        match &self.failure {
            Some(message) => Err(UploadError::Connection(message.clone())),
            None => Ok(UploadResult { status: 200, headers: Headers::new(), body: self.body.clone() }),
        }
    }
}

// =============================================================================
// Store + tokens
// =============================================================================

/// Memory store that counts reads, writes and deletes, and can be told to
/// fail every read.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    gets: AtomicUsize,
    sets: AtomicUsize,
    deletes: AtomicUsize,
    fail_reads: bool,
}

impl CountingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing_reads() -> Self {
        Self { fail_reads: true, ..Self::default() }
    }

    #[must_use]
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SessionStore for CountingStore {
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set_item(key, value).await
    }

    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        // Yield so concurrent callers interleave.
        tokio::task::yield_now().await;
        if self.fail_reads {
            return Err(StoreError::Backend("store offline".into()));
        }
        self.inner.get_item(key).await
    }

    async fn delete_item(&self, key: &str) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_item(key).await
    }
}

/// Memory store whose reads hand back their value only after `delay`, so a
/// write can land between a read and whatever the reader does next.
pub struct SlowReadStore {
    inner: MemoryStore,
    delay: Duration,
}

impl SlowReadStore {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { inner: MemoryStore::new(), delay }
    }
}

#[async_trait::async_trait]
impl SessionStore for SlowReadStore {
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set_item(key, value).await
    }

    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self.inner.get_item(key).await;
        tokio::time::sleep(self.delay).await;
        value
    }

    async fn delete_item(&self, key: &str) -> Result<(), StoreError> {
        self.inner.delete_item(key).await
    }
}

/// Fixed token source.
pub struct StaticToken(pub Option<String>);

#[async_trait::async_trait]
impl AccessTokenProvider for StaticToken {
    async fn access_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Client options wired to the given mocks.
#[must_use]
pub fn mock_options(
    transport: Arc<MockTransport>,
    uploader: Arc<MockUploader>,
    store: Arc<dyn SessionStore>,
) -> ClientOptions {
    ClientOptions {
        auth: AuthOptions { session_store: Some(store), ..AuthOptions::default() },
        global: GlobalOptions { transport: Some(transport), uploader: Some(uploader), ..GlobalOptions::default() },
    }
}

/// A stored session blob as the auth manager writes it.
#[must_use]
pub fn session_value(token: &str) -> Value {
    json!({
        "accessToken": token,
        "user": { "id": "u1", "email": "a@b.com", "created_at": "2024-01-01" }
    })
}
