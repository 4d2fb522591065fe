//! The client facade.
//!
//! ARCHITECTURE
//! ============
//! ```text
//!   KryptapayClient
//!     ├── auth     AuthClient    <url>/auth     Basic <key:secret>
//!     ├── rpc      RpcClient     <url>          Bearer via FetchWithAuth
//!     └── storage  StorageClient <url>/storage  Bearer via UploadWithAuth
//! ```
//! The auth manager is shared behind an `Arc`: it is also the access-token
//! provider the rpc and storage decorators consult before every call.

use std::sync::Arc;

use crate::auth::{AuthClient, AuthClientConfig, spawn_initialize};
use crate::config::{
    ClientConfig, ClientOptions, DEFAULT_PERSIST_SESSION, DEFAULT_STORAGE_KEY, apply_setting_defaults,
};
use crate::error::Error;
use crate::fetch::{AccessTokenProvider, FetchWithAuth, resolve_transport};
use crate::helpers::{AUTHORIZATION, Headers, basic_auth_value, merge_headers, strip_trailing_slash};
use crate::rpc::RpcClient;
use crate::session_store::{FileStore, MemoryStore, SessionStore};
use crate::storage::StorageClient;
use crate::upload::{UploadWithAuth, resolve_uploader};

pub struct KryptapayClient {
    pub auth: Arc<AuthClient>,
    pub rpc: RpcClient,
    pub storage: StorageClient,
    auth_url: String,
    rpc_url: String,
    storage_url: String,
    headers: Headers,
}

impl KryptapayClient {
    /// Build a client for the backend at `url`.
    ///
    /// `options` are shallow-merged over [`ClientOptions::defaults`]. When a
    /// Tokio runtime is running, session recovery starts immediately in the
    /// background; otherwise it runs on the first
    /// [`AuthClient::initialize`] call.
    ///
    /// # Errors
    ///
    /// Returns an error if `url`, `key` or `secret` is empty, or if a default
    /// HTTP client fails to build.
    pub fn new(url: &str, key: &str, secret: &str, options: Option<ClientOptions>) -> Result<Self, Error> {
        if url.is_empty() {
            return Err(Error::MissingParameter("kryptapayUrl"));
        }
        if key.is_empty() {
            return Err(Error::MissingParameter("kryptapayKey"));
        }
        if secret.is_empty() {
            return Err(Error::MissingParameter("kryptapaySecret"));
        }

        let base = strip_trailing_slash(url);
        let auth_url = format!("{base}/auth");
        let rpc_url = base.to_owned();
        let storage_url = format!("{base}/storage");

        let settings = apply_setting_defaults(options.unwrap_or_default(), ClientOptions::defaults());
        let headers = settings.global.headers.unwrap_or_default();
        let timeouts = settings.global.timeouts.unwrap_or_default();
        let transport = resolve_transport(settings.global.transport, timeouts)?;
        let uploader = resolve_uploader(settings.global.uploader, timeouts)?;

        let basic = Headers::from([(AUTHORIZATION.to_owned(), basic_auth_value(key, secret))]);
        let auth = Arc::new(AuthClient::new(AuthClientConfig {
            url: auth_url.clone(),
            headers: merge_headers(&[&basic, &headers]),
            storage_key: settings.auth.storage_key.unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_owned()),
            persist_session: settings.auth.persist_session.unwrap_or(DEFAULT_PERSIST_SESSION),
            store: settings.auth.session_store.unwrap_or_else(default_store),
            transport: transport.clone(),
        }));

        let tokens: Arc<dyn AccessTokenProvider> = auth.clone();
        let rpc_transport = Arc::new(FetchWithAuth::new(tokens.clone(), transport));
        let rpc = RpcClient::new(rpc_url.clone(), headers.clone(), rpc_transport);
        let storage_uploader = Arc::new(UploadWithAuth::new(tokens, uploader));
        let storage = StorageClient::new(storage_url.clone(), headers.clone(), storage_uploader);

        spawn_initialize(&auth);
        tracing::debug!(url = base, persist_session = auth.persist_session(), "kryptapay client ready");

        Ok(Self { auth, rpc, storage, auth_url, rpc_url, storage_url, headers })
    }

    /// Build a client from [`ClientConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns an error if the environment is incomplete or the client
    /// cannot be built.
    pub fn from_env() -> Result<Self, Error> {
        let config = ClientConfig::from_env()?;
        Self::new(&config.url, &config.key, &config.secret, Some(config.options()))
    }

    #[must_use]
    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    #[must_use]
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    #[must_use]
    pub fn storage_url(&self) -> &str {
        &self.storage_url
    }

    /// Headers shared by the rpc and storage sub-clients.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }
}

/// File store under the platform data directory, or memory when there is none.
fn default_store() -> Arc<dyn SessionStore> {
    match FileStore::default_location() {
        Some(store) => Arc::new(store),
        None => {
            tracing::warn!("no data directory; sessions will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    }
}

/// Create a new client. See [`KryptapayClient::new`].
///
/// # Errors
///
/// Same as [`KryptapayClient::new`].
pub fn create_client(
    url: &str,
    key: &str,
    secret: &str,
    options: Option<ClientOptions>,
) -> Result<KryptapayClient, Error> {
    KryptapayClient::new(url, key, secret, options)
}

/// Create a client from `KRYPTAPAY_*` environment variables.
///
/// # Errors
///
/// Same as [`KryptapayClient::from_env`].
pub fn create_client_from_env() -> Result<KryptapayClient, Error> {
    KryptapayClient::from_env()
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
