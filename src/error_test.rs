use super::*;

#[test]
fn names_and_codes() {
    let api = AuthError::Api { message: "bad".into(), status: 422 };
    assert_eq!(api.name(), "AuthApiError");
    assert_eq!(api.error_code(), "E_AUTH_API");
    assert_eq!(api.status(), Some(422));
    assert!(!api.is_retryable());

    let retry = AuthError::RetryableFetch { message: "down".into(), status: 503 };
    assert_eq!(retry.name(), "AuthRetryableFetchError");
    assert!(retry.is_retryable());
}

#[test]
fn fixed_statuses() {
    assert_eq!(AuthError::invalid_credentials("x").status(), Some(400));
    assert_eq!(AuthError::InvalidTokenResponse.status(), Some(500));
    let unknown = AuthError::Unknown { message: "?".into(), cause: None };
    assert_eq!(unknown.status(), None);
}

#[test]
fn invalid_token_response_message() {
    assert_eq!(AuthError::InvalidTokenResponse.to_string(), "Auth session or user missing");
}

#[test]
fn unknown_keeps_cause() {
    let io = std::io::Error::other("socket closed");
    let err = AuthError::unknown("request failed", io);
    assert_eq!(err.to_string(), "request failed");
    assert_eq!(err.cause().map(ToString::to_string).as_deref(), Some("socket closed"));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn to_json_shape() {
    let err = AuthError::RetryableFetch { message: "unavailable".into(), status: 503 };
    assert_eq!(
        err.to_json(),
        json!({ "name": "AuthRetryableFetchError", "message": "unavailable", "status": 503 })
    );
    assert_eq!(AuthError::Unknown { message: "m".into(), cause: None }.to_json()["status"], Value::Null);
}

#[test]
fn crate_error_wraps_auth_transparently() {
    let err: Error = AuthError::invalid_credentials("You must provide an ROTP.").into();
    assert_eq!(err.to_string(), "You must provide an ROTP.");
    assert_eq!(Error::MissingParameter("kryptapayUrl").to_string(), "kryptapayUrl is required.");
}

#[test]
fn storage_error_body() {
    let err = StorageError::InvalidBody("not json".into());
    assert_eq!(err.body(), Some("not json"));
    assert_eq!(err.to_string(), "not json");

    let err = StorageError::from(UploadError::Connection("refused".into()));
    assert_eq!(err.body(), None);
}

#[test]
fn rpc_error_name() {
    let err = RpcError { message: RpcError::DEFAULT_MESSAGE.into(), status: None, context: None };
    assert_eq!(err.name(), "RpcError");
    assert_eq!(err.to_string(), "Failed to send a Rpc");
}
