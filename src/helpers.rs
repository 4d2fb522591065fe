//! Small pure helpers shared by the sub-clients.

use std::collections::BTreeMap;

use base64::Engine;

/// Header map used across the SDK. Keys keep the caller's casing; lookups
/// that must be case-insensitive go through [`has_header`].
pub type Headers = BTreeMap<String, String>;

pub const AUTHORIZATION: &str = "Authorization";
pub const CONTENT_TYPE: &str = "Content-Type";

#[must_use]
pub fn strip_trailing_slash(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

/// `Basic <base64(key:secret)>` value for the auth endpoints.
#[must_use]
pub fn basic_auth_value(key: &str, secret: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{key}:{secret}"));
    format!("Basic {encoded}")
}

/// `Bearer <token>`; a missing token is rendered as the literal `null`.
#[must_use]
pub fn bearer_value(token: Option<&str>) -> String {
    format!("Bearer {}", token.unwrap_or("null"))
}

#[must_use]
pub fn has_header(headers: &Headers, name: &str) -> bool {
    headers.keys().any(|k| k.eq_ignore_ascii_case(name))
}

/// Insert `name: value`, replacing any existing key that differs only in case.
pub fn set_header(headers: &mut Headers, name: &str, value: String) {
    headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
    headers.insert(name.to_owned(), value);
}

/// Merge header layers from lowest to highest precedence. A later layer
/// replaces a key from an earlier one regardless of casing.
#[must_use]
pub fn merge_headers(layers: &[&Headers]) -> Headers {
    let mut merged = Headers::new();
    for layer in layers {
        for (name, value) in *layer {
            set_header(&mut merged, name, value.clone());
        }
    }
    merged
}

#[cfg(test)]
#[path = "helpers_test.rs"]
mod tests;
