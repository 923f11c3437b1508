//! Browser-backed tests. They need a local Chrome/Chromium and run with
//! `cargo test --features browser_tests`.
#![cfg(feature = "browser_tests")]

use axum::response::Html;
use axum::routing::get;
use axum::Router;
use screenshot_api::{
    BrowserSession, BrowserSettings, CaptureSettings, Clip, OutputFormat, RawScreenshotQuery,
    ResolvedOptions, ScreenshotBackend, ScreenshotCapturer, ScreenshotError, ScreenshotRequest,
    Viewport,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G'];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

const PAGE: &str = r#"<!doctype html>
<html>
  <head><title>fixture</title></head>
  <body style="margin:0;background:#3366cc">
    <div style="height:3000px">tall page</div>
  </body>
</html>"#;

async fn serve_fixture() -> SocketAddr {
    let app = Router::new()
        .route("/", get(|| async { Html(PAGE) }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Html(PAGE)
            }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn launch() -> Arc<BrowserSession> {
    let settings = BrowserSettings {
        chrome_path: std::env::var("CHROME_PATH").ok(),
        ..Default::default()
    };
    Arc::new(BrowserSession::launch(&settings).await.expect("browser should launch"))
}

fn options(format: OutputFormat, viewport: Viewport, clip: Option<Clip>) -> ResolvedOptions {
    ResolvedOptions {
        format,
        viewport,
        delay: Duration::ZERO,
        clip,
        quality: None,
    }
}

/// Wait for the browser to report `expected` contexts; disposal after a drop runs on a spawned task.
async fn assert_contexts_settle(session: &BrowserSession, expected: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let count = session.context_count().await.unwrap();
        if count == expected {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "browser still holds {count} contexts, expected {expected}"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn captures_full_page_png() {
    let addr = serve_fixture().await;
    let session = launch().await;
    let capturer = ScreenshotCapturer::new(session.clone(), Duration::from_secs(15));
    let url = Url::parse(&format!("http://{addr}/")).unwrap();

    let data = capturer
        .capture(&url, &options(OutputFormat::Png, Viewport::new(800, 600), None))
        .await
        .unwrap();

    assert!(data.starts_with(PNG_MAGIC));
    session.shutdown().await;
}

#[tokio::test]
async fn captures_clipped_jpeg_from_validated_query() {
    let addr = serve_fixture().await;
    let session = launch().await;
    let capturer = ScreenshotCapturer::new(session.clone(), Duration::from_secs(15));

    let raw = RawScreenshotQuery {
        url: Some(format!("http://{addr}/")),
        format: Some("jpeg".to_string()),
        device_width: Some("640".to_string()),
        device_height: Some("480".to_string()),
        clip_x: Some("100".to_string()),
        clip_width: Some("5000".to_string()),
        ..Default::default()
    };
    let request = ScreenshotRequest::validate(&raw).unwrap();
    let resolved = request.resolve(&CaptureSettings::default());
    assert_eq!(resolved.clip.map(|clip| clip.width), Some(540));

    let data = capturer.capture(&request.url, &resolved).await.unwrap();
    assert!(data.starts_with(JPEG_MAGIC));
    session.shutdown().await;
}

#[tokio::test]
async fn delay_does_not_block_other_captures() {
    let addr = serve_fixture().await;
    let session = launch().await;
    let capturer = Arc::new(ScreenshotCapturer::new(session.clone(), Duration::from_secs(15)));
    let url = Url::parse(&format!("http://{addr}/")).unwrap();

    let mut delayed = options(OutputFormat::Png, Viewport::new(400, 300), None);
    delayed.delay = Duration::from_secs(3);

    let slow = {
        let capturer = capturer.clone();
        let url = url.clone();
        tokio::spawn(async move { capturer.capture(&url, &delayed).await })
    };

    let start = Instant::now();
    capturer
        .capture(&url, &options(OutputFormat::Png, Viewport::new(400, 300), None))
        .await
        .unwrap();
    assert!(start.elapsed() < Duration::from_secs(3));

    slow.await.unwrap().unwrap();
    session.shutdown().await;
}

#[tokio::test]
async fn slow_navigation_times_out() {
    let addr = serve_fixture().await;
    let session = launch().await;
    let capturer = ScreenshotCapturer::new(session.clone(), Duration::from_secs(1));
    let baseline = session.context_count().await.unwrap();
    let url = Url::parse(&format!("http://{addr}/slow")).unwrap();

    let result = capturer
        .capture(&url, &options(OutputFormat::Png, Viewport::new(400, 300), None))
        .await;

    assert!(matches!(result, Err(ScreenshotError::NavigationTimeout(_))));
    assert_eq!(session.context_count().await.unwrap(), baseline);

    // The failed request must not leave the session unusable.
    let url = Url::parse(&format!("http://{addr}/")).unwrap();
    assert!(capturer
        .capture(&url, &options(OutputFormat::Png, Viewport::new(400, 300), None))
        .await
        .is_ok());
    session.shutdown().await;
}

#[tokio::test]
async fn unreachable_host_is_a_navigation_failure() {
    let session = launch().await;
    let capturer = ScreenshotCapturer::new(session.clone(), Duration::from_secs(15));
    let baseline = session.context_count().await.unwrap();
    // Port 9 (discard) on localhost refuses connections.
    let url = Url::parse("http://127.0.0.1:9/").unwrap();

    let result = capturer
        .capture(&url, &options(OutputFormat::Png, Viewport::new(400, 300), None))
        .await;

    assert!(matches!(result, Err(ScreenshotError::NavigationFailed(_))));
    assert_eq!(session.context_count().await.unwrap(), baseline);
    session.shutdown().await;
}

#[tokio::test]
async fn cancelled_capture_disposes_its_context() {
    let addr = serve_fixture().await;
    let session = launch().await;
    let capturer = ScreenshotCapturer::new(session.clone(), Duration::from_secs(15));
    let baseline = session.context_count().await.unwrap();
    let url = Url::parse(&format!("http://{addr}/slow")).unwrap();

    // Dropping the future mid-navigation is what a client disconnect does to the handler.
    let outcome = tokio::time::timeout(
        Duration::from_secs(1),
        capturer.capture(&url, &options(OutputFormat::Png, Viewport::new(400, 300), None)),
    )
    .await;
    assert!(outcome.is_err());

    assert_contexts_settle(&session, baseline).await;
    session.shutdown().await;
}

#[tokio::test]
async fn successful_capture_disposes_its_context() {
    let addr = serve_fixture().await;
    let session = launch().await;
    let capturer = ScreenshotCapturer::new(session.clone(), Duration::from_secs(15));
    let baseline = session.context_count().await.unwrap();
    let url = Url::parse(&format!("http://{addr}/")).unwrap();

    capturer
        .capture(&url, &options(OutputFormat::Jpeg, Viewport::new(400, 300), None))
        .await
        .unwrap();

    assert_eq!(session.context_count().await.unwrap(), baseline);
    session.shutdown().await;
}

#[tokio::test]
async fn shutdown_makes_session_unavailable() {
    let session = launch().await;
    let capturer = ScreenshotCapturer::new(session.clone(), Duration::from_secs(15));
    assert!(capturer.is_available());

    session.shutdown().await;

    assert!(!capturer.is_available());
    let url = Url::parse("http://127.0.0.1:9/").unwrap();
    let result = capturer
        .capture(&url, &options(OutputFormat::Png, Viewport::new(400, 300), None))
        .await;
    assert!(matches!(result, Err(ScreenshotError::BrowserUnavailable)));
}
