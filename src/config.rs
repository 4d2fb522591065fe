//! Client options, their defaults, and environment-driven configuration.
//!
//! Option groups are merged shallowly: a key the caller sets replaces the
//! default for that key, nothing deeper. In particular a caller-supplied
//! `headers` map replaces the default header map as a whole.

use std::sync::Arc;

use crate::error::Error;
use crate::fetch::Transport;
use crate::helpers::Headers;
use crate::session_store::SessionStore;
use crate::upload::Uploader;

pub const DEFAULT_STORAGE_KEY: &str = "kryptapay.auth.token";
pub const DEFAULT_PERSIST_SESSION: bool = true;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const CLIENT_INFO_HEADER: &str = "X-Client-Info";

/// `kryptapay-rs/<version>`, sent as `X-Client-Info` and as the user agent.
#[must_use]
pub fn client_info() -> String {
    format!("kryptapay-rs/{}", env!("CARGO_PKG_VERSION"))
}

#[must_use]
pub fn default_headers() -> Headers {
    Headers::from([(CLIENT_INFO_HEADER.to_owned(), client_info())])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

// =============================================================================
// OPTIONS
// =============================================================================

/// Auth option group. Unset fields fall back to the defaults.
#[derive(Clone, Default)]
pub struct AuthOptions {
    /// Key of the persisted session slot.
    pub storage_key: Option<String>,
    /// Save the session to the session store (`true`) or keep it in memory.
    pub persist_session: Option<bool>,
    /// Store used when persisting sessions.
    pub session_store: Option<Arc<dyn SessionStore>>,
}

/// Global option group shared by every sub-client.
#[derive(Clone, Default)]
pub struct GlobalOptions {
    /// Headers sent with every request.
    pub headers: Option<Headers>,
    /// Replaces the default reqwest transport.
    pub transport: Option<Arc<dyn Transport>>,
    /// Replaces the default file uploader.
    pub uploader: Option<Arc<dyn Uploader>>,
    pub timeouts: Option<Timeouts>,
}

#[derive(Clone, Default)]
pub struct ClientOptions {
    pub auth: AuthOptions,
    pub global: GlobalOptions,
}

impl ClientOptions {
    /// The fixed defaults every client starts from.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            auth: AuthOptions {
                storage_key: Some(DEFAULT_STORAGE_KEY.to_owned()),
                persist_session: Some(DEFAULT_PERSIST_SESSION),
                session_store: None,
            },
            global: GlobalOptions {
                headers: Some(default_headers()),
                transport: None,
                uploader: None,
                timeouts: Some(Timeouts::default()),
            },
        }
    }
}

/// Shallow-merge `options` over `defaults`, one group at a time.
#[must_use]
pub fn apply_setting_defaults(options: ClientOptions, defaults: ClientOptions) -> ClientOptions {
    let ClientOptions { auth, global } = options;
    ClientOptions {
        auth: AuthOptions {
            storage_key: auth.storage_key.or(defaults.auth.storage_key),
            persist_session: auth.persist_session.or(defaults.auth.persist_session),
            session_store: auth.session_store.or(defaults.auth.session_store),
        },
        global: GlobalOptions {
            headers: global.headers.or(defaults.global.headers),
            transport: global.transport.or(defaults.global.transport),
            uploader: global.uploader.or(defaults.global.uploader),
            timeouts: global.timeouts.or(defaults.global.timeouts),
        },
    }
}

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Client configuration read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub url: String,
    pub key: String,
    pub secret: String,
    pub storage_key: Option<String>,
    pub persist_session: Option<bool>,
    pub timeouts: Timeouts,
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Required:
    /// - `KRYPTAPAY_URL`, `KRYPTAPAY_KEY`, `KRYPTAPAY_SECRET`
    ///
    /// Optional:
    /// - `KRYPTAPAY_STORAGE_KEY`: default `kryptapay.auth.token`
    /// - `KRYPTAPAY_PERSIST_SESSION`: `true`/`false`/`1`/`0`, default true
    /// - `KRYPTAPAY_REQUEST_TIMEOUT_SECS`: default 60
    /// - `KRYPTAPAY_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or the persist flag
    /// is not a boolean.
    pub fn from_env() -> Result<Self, Error> {
        let url = env_var("KRYPTAPAY_URL").ok_or(Error::MissingParameter("KRYPTAPAY_URL"))?;
        let key = env_var("KRYPTAPAY_KEY").ok_or(Error::MissingParameter("KRYPTAPAY_KEY"))?;
        let secret = env_var("KRYPTAPAY_SECRET").ok_or(Error::MissingParameter("KRYPTAPAY_SECRET"))?;
        let persist_session = env_var("KRYPTAPAY_PERSIST_SESSION")
            .map(|raw| parse_bool("KRYPTAPAY_PERSIST_SESSION", &raw))
            .transpose()?;
        let timeouts = Timeouts {
            request_secs: env_parse_u64("KRYPTAPAY_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("KRYPTAPAY_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { url, key, secret, storage_key: env_var("KRYPTAPAY_STORAGE_KEY"), persist_session, timeouts })
    }

    /// Options carrying the values this config sets.
    #[must_use]
    pub fn options(&self) -> ClientOptions {
        ClientOptions {
            auth: AuthOptions {
                storage_key: self.storage_key.clone(),
                persist_session: self.persist_session,
                session_store: None,
            },
            global: GlobalOptions { timeouts: Some(self.timeouts), ..GlobalOptions::default() },
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    env_var(key).map_or(default, |v| v.trim().parse::<u64>().unwrap_or(default))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, Error> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(Error::ConfigParse(format!("{key} must be a boolean, got '{other}'"))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
