//! Client SDK for the Kryptapay backend.
//!
//! One [`KryptapayClient`] per application exposes three sub-clients:
//!
//! - `auth`: sign-up, password and OTP sign-in, sign-out, code requests and
//!   the persisted session. Calls are authenticated with the API key/secret
//!   pair (Basic).
//! - `rpc`: named remote functions at `<url>/<name>`.
//! - `storage`: multipart file uploads under `<url>/storage`.
//!
//! rpc and storage calls carry `Authorization: Bearer <token>` taken from
//! the current session at dispatch time, or `Bearer null` when there is none.
//!
//! Auth and storage report failures inside an [`Envelope`]; rpc returns
//! `Err(RpcError)`.
//!
//! The collaborators are traits: [`Transport`] for HTTP, [`SessionStore`] for
//! the persisted session and [`Uploader`] for file uploads. Defaults are
//! backed by `reqwest` and a file under the platform data directory.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod helpers;
pub mod rpc;
pub mod session_store;
pub mod storage;
pub mod types;
pub mod upload;

#[cfg(test)]
pub mod test_helpers;

pub use auth::{AuthClient, AuthClientConfig};
pub use client::{KryptapayClient, create_client, create_client_from_env};
pub use config::{AuthOptions, ClientConfig, ClientOptions, GlobalOptions, Timeouts};
pub use error::{AuthError, Error, RpcError, StorageError};
pub use fetch::{AccessTokenProvider, HttpRequest, HttpResponse, Method, RequestBody, Transport, TransportError};
pub use rpc::{InvokeBody, InvokeOptions, RpcClient};
pub use session_store::{FileStore, MemoryStore, SessionStore, StoreError};
pub use storage::{FileUpload, StorageClient};
pub use types::{
    AuthData, EmailResendType, Envelope, InitializeResult, OtpCredentials, PasswordCredentials, PhoneResendType,
    PreferredLanguage, ResendParams, ResetPasswordOptions, SecurityCodeRequest, Session, SessionData,
    SignOutCredentials, SignUpCredentials, User, UserData,
};
pub use upload::{UploadError, UploadOptions, UploadResult, UploadType, Uploader};
