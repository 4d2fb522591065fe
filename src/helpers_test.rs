use super::*;

fn headers(pairs: &[(&str, &str)]) -> Headers {
    pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
}

// =============================================================================
// strip_trailing_slash
// =============================================================================

#[test]
fn strip_trailing_slash_removes_one_slash() {
    assert_eq!(strip_trailing_slash("https://api.example.com/"), "https://api.example.com");
}

#[test]
fn strip_trailing_slash_leaves_clean_url() {
    assert_eq!(strip_trailing_slash("https://api.example.com"), "https://api.example.com");
}

#[test]
fn strip_trailing_slash_only_strips_last() {
    assert_eq!(strip_trailing_slash("https://api.example.com//"), "https://api.example.com/");
}

// =============================================================================
// auth header values
// =============================================================================

#[test]
fn basic_auth_value_encodes_key_and_secret() {
    // base64("k:s") == "azpz"
    assert_eq!(basic_auth_value("k", "s"), "Basic azpz");
}

#[test]
fn bearer_value_with_token() {
    assert_eq!(bearer_value(Some("abc")), "Bearer abc");
}

#[test]
fn bearer_value_without_token_is_literal_null() {
    assert_eq!(bearer_value(None), "Bearer null");
}

// =============================================================================
// header maps
// =============================================================================

#[test]
fn has_header_ignores_case() {
    let h = headers(&[("content-type", "text/plain")]);
    assert!(has_header(&h, CONTENT_TYPE));
    assert!(!has_header(&h, AUTHORIZATION));
}

#[test]
fn set_header_replaces_other_casing() {
    let mut h = headers(&[("authorization", "Basic x")]);
    set_header(&mut h, AUTHORIZATION, "Bearer y".into());
    assert_eq!(h.len(), 1);
    assert_eq!(h.get(AUTHORIZATION).map(String::as_str), Some("Bearer y"));
}

#[test]
fn merge_headers_later_layer_wins() {
    let low = headers(&[("Content-Type", "application/json"), ("X-A", "1")]);
    let mid = headers(&[("X-A", "2"), ("X-B", "2")]);
    let high = headers(&[("content-type", "text/csv")]);
    let merged = merge_headers(&[&low, &mid, &high]);

    assert_eq!(merged.get("X-A").map(String::as_str), Some("2"));
    assert_eq!(merged.get("X-B").map(String::as_str), Some("2"));
    assert_eq!(merged.get("content-type").map(String::as_str), Some("text/csv"));
    assert!(!merged.contains_key("Content-Type"));
}
