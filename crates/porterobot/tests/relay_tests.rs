//! Relay handler tests driven through the router with a fake streamer.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use bytes::Bytes;
use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tower::ServiceExt;

use portero::relay::{router, MediaHandle, MediaStreamer, RelayState, StreamError};

/// Serves one known message id; everything else is unresolvable.
struct FakeStreamer;

#[async_trait]
impl MediaStreamer for FakeStreamer {
    async fn open(&self, msg_id: i32) -> Result<MediaHandle, StreamError> {
        match msg_id {
            42 => Ok(MediaHandle {
                file_name: Some("movie.mkv".to_string()),
                file_size: 11,
                mime_type: Some("video/x-matroska".to_string()),
                body: futures_util::stream::iter(vec![
                    Ok(Bytes::from_static(b"hello ")),
                    Ok(Bytes::from_static(b"world")),
                ])
                .boxed(),
            }),
            // Message exists but its media vanished upstream
            7 => Err(StreamError::Upstream("origin hiccup".to_string())),
            _ => Err(StreamError::NotFound),
        }
    }
}

fn test_app() -> axum::Router {
    router(RelayState {
        streamer: Arc::new(FakeStreamer),
    })
}

async fn get(uri: &str) -> axum::response::Response {
    test_app()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

fn header_value(response: &axum::response::Response, name: header::HeaderName) -> String {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn health_endpoint_reports_running() {
    let response = get("/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(payload["status"], "running");
}

#[tokio::test]
async fn watch_streams_with_stored_display_name() {
    let response = get("/watch/42").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_value(&response, header::CONTENT_DISPOSITION),
        "attachment; filename=\"movie.mkv\""
    );
    assert_eq!(header_value(&response, header::CONTENT_TYPE), "video/x-matroska");
    assert_eq!(header_value(&response, header::CONTENT_LENGTH), "11");

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"hello world");
}

#[tokio::test]
async fn name_query_overrides_the_filename_only() {
    let response = get("/watch/42?name=foo.mkv").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_value(&response, header::CONTENT_DISPOSITION),
        "attachment; filename=\"foo.mkv\""
    );
}

#[tokio::test]
async fn blank_name_override_falls_back_to_stored_name() {
    let response = get("/watch/42?name=").await;
    assert_eq!(
        header_value(&response, header::CONTENT_DISPOSITION),
        "attachment; filename=\"movie.mkv\""
    );
}

#[tokio::test]
async fn unresolvable_id_is_a_404_not_an_empty_200() {
    let response = get("/watch/99999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"Not found");
}

#[tokio::test]
async fn out_of_range_id_is_a_404() {
    let response = get("/watch/99999999999999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upstream_failure_is_a_500_with_a_short_message() {
    let response = get("/watch/7").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // No internal detail leaks
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"Stream failed");
}
