//! Fast-link relay.
//!
//! Serves archived media straight from the storage channel at
//! `/watch/{message_id}`. Anyone holding a link can fetch it; links never
//! expire. The body is proxied chunk by chunk from Telegram with no local
//! copy and no size cap beyond what the origin enforces.

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::mtproto::{media, MtProtoClient, MtProtoError};

/// An opened media object ready to be streamed to one caller.
pub struct MediaHandle {
    pub file_name: Option<String>,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub body: BoxStream<'static, Result<Bytes, std::io::Error>>,
}

/// Why a reference could not be opened.
#[derive(Debug)]
pub enum StreamError {
    /// Deleted message, wrong id, or a message without media
    NotFound,
    /// Origin fetch failed for another reason; detail stays in the logs
    Upstream(String),
}

/// Resolves a storage-channel message id to a live byte stream.
///
/// The trait seam keeps relay handlers testable without Telegram.
#[async_trait]
pub trait MediaStreamer: Send + Sync {
    async fn open(&self, msg_id: i32) -> Result<MediaHandle, StreamError>;
}

/// Production streamer: fetch the message over MTProto, stream its file.
pub struct MtProtoStreamer {
    client: Arc<MtProtoClient>,
    storage_chat_id: i64,
}

impl MtProtoStreamer {
    pub fn new(client: Arc<MtProtoClient>, storage_chat_id: i64) -> Self {
        Self {
            client,
            storage_chat_id,
        }
    }
}

#[async_trait]
impl MediaStreamer for MtProtoStreamer {
    async fn open(&self, msg_id: i32) -> Result<MediaHandle, StreamError> {
        let info = media::get_media(&self.client, self.storage_chat_id, msg_id)
            .await
            .map_err(|e| match e {
                MtProtoError::MessageNotFound | MtProtoError::NoMediaInMessage => StreamError::NotFound,
                other => StreamError::Upstream(other.to_string()),
            })?;

        let file_name = info.filename.clone();
        let file_size = info.size;
        let mime_type = info.mime_type.clone();
        let body = media::stream_media(Arc::clone(&self.client), info).boxed();

        Ok(MediaHandle {
            file_name,
            file_size,
            mime_type,
            body,
        })
    }
}

/// Shared state for the relay server.
#[derive(Clone)]
pub struct RelayState {
    pub streamer: Arc<dyn MediaStreamer>,
}

/// Build the relay router. Separated from serving so tests can drive it.
pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/watch/:id", get(watch_handler))
        .with_state(state)
}

/// Start the relay server.
pub async fn start_relay_server(port: u16, state: RelayState) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(state);

    log::info!("Starting relay server on http://{}", addr);
    log::info!("  /           - Health check");
    log::info!("  /watch/:id  - Stream archived media (optional ?name= override)");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// GET / — health payload.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "running",
        "service": "portero",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Deserialize)]
struct WatchParams {
    /// Overrides the served filename without touching the catalog
    name: Option<String>,
}

/// Keep header values sane: strip quotes and control characters.
fn sanitize_filename(name: &str) -> String {
    name.chars().filter(|c| *c != '"' && !c.is_control()).collect()
}

/// GET /watch/:id — streams the referenced media.
async fn watch_handler(
    Path(id): Path<i64>,
    Query(params): Query<WatchParams>,
    State(state): State<RelayState>,
) -> Response {
    let Ok(msg_id) = i32::try_from(id) else {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    };

    let handle = match state.streamer.open(msg_id).await {
        Ok(handle) => handle,
        Err(StreamError::NotFound) => {
            return (StatusCode::NOT_FOUND, "Not found").into_response();
        }
        Err(StreamError::Upstream(detail)) => {
            log::error!("Relay failed to open message {}: {}", msg_id, detail);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Stream failed").into_response();
        }
    };

    // Rename logic: the query override wins, the stored name is the fallback.
    let final_name = params
        .name
        .filter(|n| !n.trim().is_empty())
        .or(handle.file_name)
        .unwrap_or_else(|| porterocore::core::utils::generated_file_name(handle.file_size));

    let content_type = handle
        .mime_type
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, handle.file_size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", sanitize_filename(&final_name)),
        )
        .body(Body::from_stream(handle.body));

    match response {
        Ok(response) => response,
        Err(e) => {
            log::error!("Relay failed to build response for message {}: {}", msg_id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Stream failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_sanitizing_strips_quotes_and_controls() {
        assert_eq!(sanitize_filename("movie.mkv"), "movie.mkv");
        assert_eq!(sanitize_filename("mo\"vie\n.mkv"), "movie.mkv");
    }
}
