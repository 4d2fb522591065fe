use super::*;
use crate::test_helpers::{MockUploader, StaticToken};

#[test]
fn local_path_strips_file_scheme() {
    assert_eq!(local_path("file:///tmp/a.png"), "/tmp/a.png");
    assert_eq!(local_path("/tmp/a.png"), "/tmp/a.png");
    assert_eq!(local_path("relative.txt"), "relative.txt");
}

#[test]
fn options_default_to_binary_post() {
    let options = UploadOptions::default();
    assert_eq!(options.http_method, Method::Post);
    assert_eq!(options.upload_type, UploadType::BinaryContent);
    assert!(options.field_name.is_none());
}

#[tokio::test]
async fn upload_with_auth_sets_bearer() {
    let inner = Arc::new(MockUploader::new("{}"));
    let uploader = UploadWithAuth::new(Arc::new(StaticToken(Some("tok".into()))), inner.clone());

    uploader.upload("https://x/storage/f.txt", "file://x", UploadOptions::default()).await.unwrap();

    let calls = inner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].options.headers[AUTHORIZATION], "Bearer tok");
    assert_eq!(calls[0].url, "https://x/storage/f.txt");
}

#[tokio::test]
async fn upload_with_auth_sends_literal_null_without_token() {
    let inner = Arc::new(MockUploader::new("{}"));
    let uploader = UploadWithAuth::new(Arc::new(StaticToken(None)), inner.clone());

    let mut options = UploadOptions::default();
    options.headers.insert("authorization".into(), "stale".into());
    uploader.upload("u", "f", options).await.unwrap();

    let headers = &inner.calls()[0].options.headers;
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[AUTHORIZATION], "Bearer null");
}

#[tokio::test]
async fn resolve_uploader_prefers_custom() {
    let custom: Arc<dyn Uploader> = Arc::new(MockUploader::new("ok"));
    let resolved = resolve_uploader(Some(custom.clone()), Timeouts::default()).unwrap();
    assert!(Arc::ptr_eq(&resolved, &custom));
}

#[tokio::test]
async fn reqwest_uploader_reports_missing_file() {
    let uploader = ReqwestUploader::new(Timeouts::default()).unwrap();
    let err = uploader
        .upload("http://127.0.0.1:9/none", "file:///definitely/not/here.bin", UploadOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::ReadFile { ref path, .. } if path == "/definitely/not/here.bin"));
}
