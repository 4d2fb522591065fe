use super::*;
use crate::test_helpers::{MockTransport, StaticToken, failure, ok};
use serde_json::json;

fn status_error(status: u16, data: Value) -> TransportError {
    TransportError::Status(HttpResponse { status, headers: Headers::new(), data })
}

// =============================================================================
// handle_error
// =============================================================================

#[test]
fn network_statuses_are_retryable() {
    for status in NETWORK_ERROR_CODES {
        let err = handle_error(status_error(status, json!("unavailable")));
        assert!(err.is_retryable(), "status {status}");
        assert_eq!(err.status(), Some(status));
        assert_eq!(err.to_string(), "unavailable");
    }
}

#[test]
fn other_statuses_are_api_errors() {
    let err = handle_error(status_error(400, json!({ "error_description": "Invalid login" })));
    assert!(matches!(err, AuthError::Api { status: 400, .. }));
    assert_eq!(err.to_string(), "Invalid login");

    let err = handle_error(status_error(500, json!({ "msg": "boom" })));
    assert_eq!(err.name(), "AuthApiError");
    assert_eq!(err.to_string(), "boom");
}

#[test]
fn missing_status_defaults_to_500() {
    let err = handle_error(status_error(0, Value::Null));
    assert_eq!(err.status(), Some(500));
}

#[test]
fn unreadable_response_is_retryable() {
    let err = handle_error(TransportError::Incomplete { status: 200, message: "eof".into() });
    assert!(err.is_retryable());
}

#[test]
fn no_response_is_unknown_with_cause() {
    let err = handle_error(TransportError::Connection("connection refused".into()));
    assert_eq!(err.name(), "AuthUnknownError");
    assert_eq!(err.to_string(), "connection refused");
    assert!(err.cause().is_some());
}

// =============================================================================
// error_message
// =============================================================================

#[test]
fn error_message_precedence() {
    assert_eq!(error_message(&json!({ "error_description": "d", "msg": "m" }), 400), "d");
    assert_eq!(error_message(&json!("plain"), 400), "plain");
    assert_eq!(error_message(&json!({ "message": "m", "error": "e" }), 400), "m");
    assert_eq!(error_message(&json!({ "error": "e" }), 400), "e");
    assert_eq!(error_message(&json!({ "code": 7 }), 400), r#"{"code":7}"#);
    assert_eq!(error_message(&Value::Null, 418), "request failed with status 418");
}

#[test]
fn decode_body_handles_non_json() {
    assert_eq!(decode_body(""), Value::Null);
    assert_eq!(decode_body(r#"{"a":1}"#), json!({ "a": 1 }));
    assert_eq!(decode_body("not json"), json!("not json"));
}

// =============================================================================
// request helper
// =============================================================================

#[tokio::test]
async fn request_sends_json_with_headers() {
    let transport = MockTransport::new(vec![ok(json!({ "user": { "id": "1" } }))]);
    let headers = Headers::from([(AUTHORIZATION.to_owned(), "Basic azpz".to_owned())]);

    let data = request(&transport, Method::Post, "https://x/auth/token", &headers, Some(json!({ "a": 1 })))
        .await
        .unwrap();

    assert_eq!(data["user"]["id"], "1");
    let sent = transport.last().unwrap();
    assert_eq!(sent.url, "https://x/auth/token");
    assert_eq!(sent.method, Method::Post);
    assert_eq!(sent.headers[AUTHORIZATION], "Basic azpz");
    assert_eq!(sent.body, Some(RequestBody::Json(json!({ "a": 1 }))));
}

#[tokio::test]
async fn request_classifies_failures() {
    let transport = MockTransport::new(vec![failure(503, json!("unavailable"))]);
    let err = request(&transport, Method::Post, "u", &Headers::new(), None).await.unwrap_err();
    assert!(matches!(err, AuthError::RetryableFetch { status: 503, .. }));
}

// =============================================================================
// FetchWithAuth
// =============================================================================

#[tokio::test]
async fn fetch_with_auth_overrides_authorization() {
    let inner = Arc::new(MockTransport::default());
    let fetch = FetchWithAuth::new(Arc::new(StaticToken(Some("tok".into()))), inner.clone());

    let mut headers = Headers::new();
    headers.insert("authorization".into(), "Basic old".into());
    fetch
        .send(HttpRequest { url: "u".into(), method: Method::Get, headers, body: None })
        .await
        .unwrap();

    let sent = inner.last().unwrap();
    assert_eq!(sent.headers.len(), 1);
    assert_eq!(sent.headers[AUTHORIZATION], "Bearer tok");
}

#[tokio::test]
async fn fetch_with_auth_sends_bearer_null_without_token() {
    let inner = Arc::new(MockTransport::default());
    let fetch = FetchWithAuth::new(Arc::new(StaticToken(None)), inner.clone());

    fetch.send(HttpRequest { url: "u".into(), method: Method::Post, headers: Headers::new(), body: None }).await.unwrap();

    assert_eq!(inner.last().unwrap().headers[AUTHORIZATION], "Bearer null");
}

#[test]
fn method_strings() {
    assert_eq!(Method::default(), Method::Post);
    assert_eq!(Method::Patch.to_string(), "PATCH");
    assert_eq!(reqwest::Method::from(Method::Delete), reqwest::Method::DELETE);
}
