//! Session, credential and envelope types.
//!
//! Credential types serialize straight into the request bodies the auth
//! endpoints expect, so the field renames here are wire format.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::AuthError;

// =============================================================================
// SESSION
// =============================================================================

/// Server-issued user record. Unknown fields are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Access token plus the user it belongs to.
///
/// Both fields are opaque: a stored session is valid as long as it carries
/// the two keys, whatever their shape. [`Session::bearer_token`] reads the
/// token when it is a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(deserialize_with = "access_token")]
    pub access_token: Value,
    pub user: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Session {
    /// Token to send as `Bearer`, when the stored token is a string.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.access_token.as_str()
    }

    /// `user.id`, when the user carries a string id.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user.get("id").and_then(Value::as_str)
    }
}

/// The backend sends the token either bare or as `{"value": "..."}`.
fn access_token<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
    Ok(normalize_token(Value::deserialize(deserializer)?))
}

/// Unwrap `{"value": "<token>"}` to the bare string. Other shapes pass
/// through untouched.
fn normalize_token(token: Value) -> Value {
    match token.get("value") {
        Some(Value::String(inner)) => Value::String(inner.clone()),
        _ => token,
    }
}

/// A value read back from the session store, after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredSession {
    Valid(Session),
    /// Anything that is not an object with both `accessToken` and `user`.
    Corrupt,
}

impl StoredSession {
    #[must_use]
    pub fn classify(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self::Corrupt;
        };
        let (Some(token), Some(user)) = (map.remove("accessToken"), map.remove("user")) else {
            return Self::Corrupt;
        };
        Self::Valid(Session { access_token: normalize_token(token), user, extra: map })
    }
}

// =============================================================================
// ENVELOPE
// =============================================================================

/// `{data, error}` result of a public operation. Exactly one side is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope<T, E = AuthError>(Result<T, E>);

impl<T, E> Envelope<T, E> {
    pub fn ok(data: T) -> Self {
        Self(Ok(data))
    }

    pub fn err(error: E) -> Self {
        Self(Err(error))
    }

    #[must_use]
    pub fn data(&self) -> Option<&T> {
        match &self.0 {
            Ok(data) => Some(data),
            Err(_) => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&E> {
        match &self.0 {
            Ok(_) => None,
            Err(error) => Some(error),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.0.is_ok()
    }

    /// # Errors
    ///
    /// Returns the carried error when the envelope holds one.
    pub fn into_result(self) -> Result<T, E> {
        self.0
    }
}

impl<T, E> From<Result<T, E>> for Envelope<T, E> {
    fn from(result: Result<T, E>) -> Self {
        Self(result)
    }
}

/// Outcome of the one-time startup recovery. Never carries a session.
#[derive(Debug, Clone, Default)]
pub struct InitializeResult {
    pub error: Option<AuthError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct AuthData {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub session: Option<Session>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserData {
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionData {
    pub session: Option<Session>,
}

// =============================================================================
// CREDENTIALS
// =============================================================================

const EMAIL_OR_PHONE_AND_PASSWORD: &str = "You must provide either an email or phone number and a password";

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PreferredLanguage {
    #[serde(rename = "fr_FR")]
    French,
    #[serde(rename = "en_EN")]
    English,
}

/// New account registration. Both `email` and `phone` are required.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpCredentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub user_name: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referer_uuid: Option<String>,
    pub push_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_language: Option<PreferredLanguage>,
}

impl SignUpCredentials {
    pub(crate) fn validate(&self) -> Result<(), AuthError> {
        if present(self.email.as_deref()).is_none() || present(self.phone.as_deref()).is_none() {
            return Err(AuthError::invalid_credentials(EMAIL_OR_PHONE_AND_PASSWORD));
        }
        Ok(())
    }
}

/// Email or phone plus password. Email wins when both are set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PasswordCredentials {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: String,
}

impl PasswordCredentials {
    #[must_use]
    pub fn with_email(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: Some(email.into()), phone: None, password: password.into() }
    }

    #[must_use]
    pub fn with_phone(phone: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: None, phone: Some(phone.into()), password: password.into() }
    }

    /// The `username` sent to the token endpoint.
    pub(crate) fn username(&self) -> Result<&str, AuthError> {
        let identifier = present(self.email.as_deref()).or_else(|| present(self.phone.as_deref()));
        match identifier {
            Some(id) if !self.password.is_empty() => Ok(id),
            _ => Err(AuthError::invalid_credentials(EMAIL_OR_PHONE_AND_PASSWORD)),
        }
    }
}

/// Second sign-in step: the one-time codes issued after the password check.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct OtpCredentials {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "ROTP")]
    pub rotp: String,
    #[serde(rename = "TOTP", skip_serializing_if = "Option::is_none")]
    pub totp: Option<String>,
}

impl OtpCredentials {
    pub(crate) fn validate(&self) -> Result<(), AuthError> {
        if self.rotp.trim().is_empty() {
            return Err(AuthError::invalid_credentials("You must provide an ROTP."));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SignOutCredentials {
    #[serde(rename = "userId")]
    pub user_id: String,
}

impl SignOutCredentials {
    pub(crate) fn validate(&self) -> Result<(), AuthError> {
        if self.user_id.trim().is_empty() {
            return Err(AuthError::invalid_credentials("You must provide an userId."));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailResendType {
    Signup,
    EmailChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneResendType {
    Sms,
    PhoneChange,
}

/// What to resend, and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResendParams {
    Email {
        email: String,
        #[serde(rename = "type")]
        kind: EmailResendType,
    },
    Phone {
        phone: String,
        #[serde(rename = "type")]
        kind: PhoneResendType,
    },
}

impl ResendParams {
    pub(crate) fn validate(&self) -> Result<(), AuthError> {
        let target = match self {
            Self::Email { email, .. } => email,
            Self::Phone { phone, .. } => phone,
        };
        if target.trim().is_empty() {
            return Err(AuthError::invalid_credentials(
                "You must provide either an email or phone number and a type",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SecurityCodeRequest {
    pub to: String,
    pub scope: String,
}

pub const DEFAULT_RESET_SCOPE: &str = "passwordReset";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordOptions {
    pub email: String,
    pub new_password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_password: Option<String>,
    pub security_code: String,
    /// Defaults to `passwordReset`.
    #[serde(serialize_with = "reset_scope")]
    pub scope: Option<String>,
}

#[allow(clippy::ref_option)]
fn reset_scope<S: serde::Serializer>(scope: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(scope.as_deref().unwrap_or(DEFAULT_RESET_SCOPE))
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
