use std::sync::{Arc, Mutex};
use std::time::Duration;

use httpmock::MockServer;
use serde_json::json;

use folio::application::uploads::{
    MediaHost, ProgressCallback, ProgressSink, UploadFile, UploadOptions, UploadOrchestrator,
    UploadProgress, UploadStatus,
};
use folio::domain::uploads::{UploadKind, UploadLimits};
use folio::infra::http::MediaHostClient;

fn host(server: &MockServer) -> MediaHostClient {
    MediaHostClient::new(&server.url("/upload"), "portfolio-unsigned", Duration::from_secs(5))
        .expect("media host")
}

#[tokio::test]
async fn upload_sends_preset_and_folder() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST")
            .path("/upload")
            .body_includes("portfolio-unsigned")
            .body_includes("portfolio/projects");
        then.status(200).json_body(json!({
            "secure_url": "https://cdn.example/p/cover.png",
            "public_id": "p/cover",
            "width": 800,
            "height": 600,
            "format": "png",
            "bytes": 11
        }));
    });

    let options = UploadOptions {
        kind: UploadKind::Gallery,
        folder: Some("portfolio/projects".to_string()),
        tags: vec!["project".to_string()],
    };
    let sink = ProgressSink::detached();
    let uploaded = host(&server)
        .upload(
            &UploadFile::new("cover.png", "image/png", &b"fake-image!"[..]),
            &options,
            &sink,
        )
        .await
        .expect("uploaded");

    mock.assert();
    assert_eq!(uploaded.url, "https://cdn.example/p/cover.png");
    assert_eq!(uploaded.media_id, "p/cover");
    assert_eq!(uploaded.width, Some(800));
    assert_eq!(sink.percent(), 99);
}

#[tokio::test]
async fn missing_preset_is_a_configuration_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("POST").path("/upload");
        then.status(400)
            .json_body(json!({"error": {"message": "Upload preset must be whitelisted"}}));
    });

    let err = host(&server)
        .upload(
            &UploadFile::new("a.png", "image/png", &b"x"[..]),
            &UploadOptions::default(),
            &ProgressSink::detached(),
        )
        .await
        .expect_err("misconfigured");

    assert!(err.is_configuration());
}

#[tokio::test]
async fn batch_keeps_successes_when_one_transfer_fails() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("POST").path("/upload").body_includes("good-bytes");
        then.status(200)
            .json_body(json!({"secure_url": "https://cdn.example/good.png", "public_id": "good"}));
    });
    server.mock(|when, then| {
        when.method("POST").path("/upload").body_includes("bad-bytes");
        then.status(502).body("upstream hiccup");
    });

    let events: Arc<Mutex<Vec<UploadProgress>>> = Arc::default();
    let recorder = Arc::clone(&events);
    let callback: ProgressCallback = Arc::new(move |event| {
        recorder.lock().expect("events lock").push(event);
    });

    let orchestrator = UploadOrchestrator::new(Arc::new(host(&server)), UploadLimits::default());
    let tasks = orchestrator
        .upload_batch(
            vec![
                UploadFile::new("good.png", "image/png", &b"good-bytes"[..]),
                UploadFile::new("bad.png", "image/png", &b"bad-bytes"[..]),
            ],
            &UploadOptions::default(),
            Some(callback),
        )
        .await;

    assert_eq!(tasks.len(), 2);
    assert!(tasks[0].is_done());
    assert_eq!(tasks[0].progress_percent, 100);
    assert_eq!(
        tasks[0].result.as_ref().map(|media| media.url.as_str()),
        Some("https://cdn.example/good.png")
    );
    assert_eq!(tasks[1].status, UploadStatus::Failed);
    assert!(tasks[1].progress_percent < 100);
    assert!(!tasks[1].error.as_ref().expect("error").is_configuration());

    let events = events.lock().expect("events lock");
    assert!(events.iter().any(|e| e.index == 0 && e.status == UploadStatus::Done));
    assert!(events.iter().any(|e| e.index == 1 && e.status == UploadStatus::Failed));
}
