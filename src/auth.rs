//! Auth session manager.
//!
//! DESIGN
//! ======
//! [`AuthClient`] is the single authority on which session is current. With
//! persistence on, the session store is the source of truth and every
//! [`AuthClient::get_session`] re-reads it; with persistence off the session
//! lives in a field on the manager.
//!
//! Lifecycle
//! ---------
//! `initialize` runs once per manager. Concurrent callers share the same
//! in-flight recovery through a `OnceCell`. Recovery reads the stored blob,
//! drops it when corrupt and re-saves it when valid. A recovery failure is
//! logged and never surfaces as an error from construction.
//!
//! `get_session` and every flow that clears the session await `initialize`
//! first, so a recovery still in flight cannot write back a session the
//! caller has already removed.
//!
//! Every flow that starts a sign-in (sign up, password, OTP, sign out,
//! resend) removes the current session before sending its request, so at
//! most one session is ever current. Two sign-ins racing each other are not
//! serialized; the last write to the store wins.
//!
//! ERROR POLICY
//! ============
//! Operations return `Ok(Envelope)` for success and for failures in the
//! [`AuthError`] taxonomy. Anything else (store I/O, encoding) is `Err`.

use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::OnceCell;

use crate::error::{AuthError, Error};
use crate::fetch::{self, AccessTokenProvider, Method, Transport};
use crate::helpers::Headers;
use crate::session_store::{SessionStore, get_item_json, set_item_json};
use crate::types::{
    AuthData, Envelope, InitializeResult, OtpCredentials, PasswordCredentials, ResendParams, ResetPasswordOptions,
    SecurityCodeRequest, Session, SessionData, SignOutCredentials, SignUpCredentials, StoredSession, User, UserData,
};

/// Everything the manager needs, resolved by the facade.
pub struct AuthClientConfig {
    /// Auth base URL, e.g. `https://api.example.com/auth`.
    pub url: String,
    /// Sent with every auth request. Carries the Basic credentials.
    pub headers: Headers,
    pub storage_key: String,
    pub persist_session: bool,
    pub store: Arc<dyn SessionStore>,
    pub transport: Arc<dyn Transport>,
}

pub struct AuthClient {
    url: String,
    headers: Headers,
    storage_key: String,
    persist_session: bool,
    store: Arc<dyn SessionStore>,
    transport: Arc<dyn Transport>,
    in_memory_session: Mutex<Option<Session>>,
    initialized: OnceCell<InitializeResult>,
}

impl AuthClient {
    #[must_use]
    pub fn new(config: AuthClientConfig) -> Self {
        Self {
            url: config.url,
            headers: config.headers,
            storage_key: config.storage_key,
            persist_session: config.persist_session,
            store: config.store,
            transport: config.transport,
            in_memory_session: Mutex::new(None),
            initialized: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    #[must_use]
    pub fn persist_session(&self) -> bool {
        self.persist_session
    }

    // =========================================================================
    // INITIALIZATION
    // =========================================================================

    /// Recover the stored session once. Later and concurrent calls return the
    /// result of the first run.
    pub async fn initialize(&self) -> InitializeResult {
        self.initialized
            .get_or_init(|| async { initialize_result(self.recover_and_refresh().await) })
            .await
            .clone()
    }

    async fn recover_and_refresh(&self) -> Result<(), Error> {
        let Some(value) = get_item_json(self.store.as_ref(), &self.storage_key).await? else {
            return Ok(());
        };
        match StoredSession::classify(value) {
            StoredSession::Corrupt => {
                tracing::warn!(storage_key = %self.storage_key, "discarding corrupt stored session");
                self.remove_session().await
            }
            StoredSession::Valid(session) if self.persist_session => self.save_session(&session).await,
            StoredSession::Valid(_) => Ok(()),
        }
    }

    // =========================================================================
    // SESSION STATE
    // =========================================================================

    /// Current session, if any. Never touches the network.
    ///
    /// A corrupt stored session is removed and reported as no session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn get_session(&self) -> Result<Envelope<SessionData>, Error> {
        self.initialize().await;
        let session = if self.persist_session {
            self.load_persisted().await?
        } else {
            self.in_memory_session.lock().unwrap_or_else(PoisonError::into_inner).clone()
        };
        Ok(Envelope::ok(SessionData { session }))
    }

    async fn load_persisted(&self) -> Result<Option<Session>, Error> {
        let Some(value) = get_item_json(self.store.as_ref(), &self.storage_key).await? else {
            return Ok(None);
        };
        match StoredSession::classify(value) {
            StoredSession::Valid(session) => Ok(Some(session)),
            StoredSession::Corrupt => {
                tracing::warn!(storage_key = %self.storage_key, "discarding corrupt stored session");
                self.remove_session().await?;
                Ok(None)
            }
        }
    }

    async fn save_session(&self, session: &Session) -> Result<(), Error> {
        if self.persist_session {
            set_item_json(self.store.as_ref(), &self.storage_key, session).await?;
        } else {
            *self.in_memory_session.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        }
        tracing::info!(user_id = session.user_id(), persisted = self.persist_session, "session saved");
        Ok(())
    }

    async fn remove_session(&self) -> Result<(), Error> {
        if self.persist_session {
            self.store.delete_item(&self.storage_key).await?;
        } else {
            *self.in_memory_session.lock().unwrap_or_else(PoisonError::into_inner) = None;
        }
        tracing::debug!(persisted = self.persist_session, "session removed");
        Ok(())
    }

    // =========================================================================
    // FLOWS
    // =========================================================================

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures outside the auth taxonomy.
    pub async fn sign_up(&self, credentials: &SignUpCredentials) -> Result<Envelope<AuthData>, Error> {
        settle(self.sign_up_inner(credentials).await)
    }

    async fn sign_up_inner(&self, credentials: &SignUpCredentials) -> Result<AuthData, Error> {
        self.initialize().await;
        self.remove_session().await?;
        credentials.validate()?;
        let data = self.post("/signup", serde_json::to_value(credentials)?).await?;
        if !data.is_object() {
            return Err(AuthError::InvalidTokenResponse.into());
        }
        Ok(decode(data)?)
    }

    /// First sign-in step. Returns the user; the session arrives with
    /// [`AuthClient::sign_in_with_otp`].
    ///
    /// # Errors
    ///
    /// Returns an error only for failures outside the auth taxonomy.
    pub async fn sign_in_with_password(&self, credentials: &PasswordCredentials) -> Result<Envelope<UserData>, Error> {
        settle(self.sign_in_with_password_inner(credentials).await)
    }

    async fn sign_in_with_password_inner(&self, credentials: &PasswordCredentials) -> Result<UserData, Error> {
        self.initialize().await;
        self.remove_session().await?;
        let username = credentials.username()?;
        let body = json!({
            "username": username,
            "password": credentials.password,
            "grant_type": "password",
            "scope": "user",
        });
        let data = self.post("/token", body).await?;
        let user: User = required(&data, "user")?;
        tracing::info!(user_id = %user.id, "password accepted");
        Ok(UserData { user })
    }

    /// Second sign-in step. Saves the returned session.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures outside the auth taxonomy.
    pub async fn sign_in_with_otp(&self, credentials: &OtpCredentials) -> Result<Envelope<AuthData>, Error> {
        settle(self.sign_in_with_otp_inner(credentials).await)
    }

    async fn sign_in_with_otp_inner(&self, credentials: &OtpCredentials) -> Result<AuthData, Error> {
        self.initialize().await;
        self.remove_session().await?;
        credentials.validate()?;
        let data = self.post("/otp", serde_json::to_value(credentials)?).await?;
        let session: Session = required(&data, "session")?;
        let user: User = required(&data, "user")?;
        self.save_session(&session).await?;
        tracing::info!(user_id = %user.id, "signed in");
        Ok(AuthData { user: Some(user), session: Some(session) })
    }

    /// # Errors
    ///
    /// Returns an error only for failures outside the auth taxonomy.
    pub async fn sign_out(&self, credentials: &SignOutCredentials) -> Result<Envelope<Value>, Error> {
        settle(self.sign_out_inner(credentials).await)
    }

    async fn sign_out_inner(&self, credentials: &SignOutCredentials) -> Result<Value, Error> {
        self.initialize().await;
        self.remove_session().await?;
        credentials.validate()?;
        let data = self.post("/signout", serde_json::to_value(credentials)?).await?;
        tracing::info!(user_id = %credentials.user_id, "signed out");
        non_null(data)
    }

    /// Resend a confirmation email or SMS code.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures outside the auth taxonomy.
    pub async fn resend(&self, params: &ResendParams) -> Result<Envelope<AuthData>, Error> {
        settle(self.resend_inner(params).await)
    }

    async fn resend_inner(&self, params: &ResendParams) -> Result<AuthData, Error> {
        self.initialize().await;
        self.remove_session().await?;
        params.validate()?;
        self.post("/resend", serde_json::to_value(params)?).await?;
        Ok(AuthData::default())
    }

    /// Ask the backend to send a security code. Leaves the session alone.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures outside the auth taxonomy.
    pub async fn request_security_code(&self, request: &SecurityCodeRequest) -> Result<Envelope<Value>, Error> {
        settle(self.one_shot("/code", serde_json::to_value(request)).await)
    }

    /// # Errors
    ///
    /// Returns an error only for failures outside the auth taxonomy.
    pub async fn reset_password_for_email(&self, options: &ResetPasswordOptions) -> Result<Envelope<Value>, Error> {
        settle(self.one_shot("/recover", serde_json::to_value(options)).await)
    }

    async fn one_shot(&self, path: &str, body: Result<Value, serde_json::Error>) -> Result<Value, Error> {
        let data = self.post(path, body?).await?;
        non_null(data)
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, AuthError> {
        let url = format!("{}{path}", self.url);
        fetch::request(self.transport.as_ref(), Method::Post, &url, &self.headers, Some(body)).await
    }
}

#[async_trait::async_trait]
impl AccessTokenProvider for AuthClient {
    async fn access_token(&self) -> Option<String> {
        match self.get_session().await {
            Ok(envelope) => envelope
                .data()
                .and_then(|data| data.session.as_ref())
                .and_then(Session::bearer_token)
                .map(str::to_owned),
            Err(error) => {
                tracing::warn!(error = %error, "could not read session for access token");
                None
            }
        }
    }
}

/// Spawn [`AuthClient::initialize`] on the ambient Tokio runtime, if any.
pub(crate) fn spawn_initialize(auth: &Arc<AuthClient>) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        tracing::debug!("no tokio runtime; session recovery deferred to initialize()");
        return;
    };
    let auth = Arc::clone(auth);
    drop(handle.spawn(async move {
        if let Some(error) = auth.initialize().await.error {
            tracing::warn!(error = %error, code = error.error_code(), "session initialization failed");
        }
    }));
}

// =============================================================================
// RESULT SHAPING
// =============================================================================

/// Split an internal outcome: taxonomy errors go into the envelope, anything
/// else goes back to the caller as `Err`.
fn settle<T>(outcome: Result<T, Error>) -> Result<Envelope<T>, Error> {
    match outcome {
        Ok(data) => Ok(Envelope::ok(data)),
        Err(Error::Auth(error)) => Ok(Envelope::err(error)),
        Err(other) => Err(other),
    }
}

fn initialize_result(outcome: Result<(), Error>) -> InitializeResult {
    match outcome {
        Ok(()) => InitializeResult::default(),
        Err(Error::Auth(error)) => InitializeResult { error: Some(error) },
        Err(Error::Store(error)) => {
            tracing::error!(error = %error, "session recovery failed");
            InitializeResult::default()
        }
        Err(other) => InitializeResult {
            error: Some(AuthError::unknown("Unexpected error during initialization", other)),
        },
    }
}

/// Decode `data[field]`, treating absence, `null` and a bad shape alike.
fn required<T: DeserializeOwned>(data: &Value, field: &str) -> Result<T, AuthError> {
    match data.get(field) {
        Some(value) if !value.is_null() => {
            serde_json::from_value(value.clone()).map_err(|_| AuthError::InvalidTokenResponse)
        }
        _ => Err(AuthError::InvalidTokenResponse),
    }
}

fn decode<T: DeserializeOwned>(data: Value) -> Result<T, AuthError> {
    serde_json::from_value(data).map_err(|_| AuthError::InvalidTokenResponse)
}

fn non_null(data: Value) -> Result<Value, Error> {
    if data.is_null() {
        return Err(AuthError::InvalidTokenResponse.into());
    }
    Ok(data)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
