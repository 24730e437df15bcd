use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, Path, State,
    },
    handler::Handler,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use bytes::Bytes;
use log::{debug, error, info, warn};
use serde_json::json;
use std::sync::Arc as StdArc;
use tokio_stream::StreamExt;
use tokio_util::io::StreamReader;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::config::ServerConfig;
use crate::constants::{DEFAULT_ORIGINAL_NAME, UPLOADS_ROUTE_PREFIX, UPLOAD_FIELD_NAME};
use crate::error::StoreError;
use crate::store::{Recording, RecordingStore};

// State for recording API handlers
pub struct AppState {
    pub store: StdArc<RecordingStore>,
}

/// Run the recordings server until SIGINT/SIGTERM (for serve command)
pub fn serve_recordings(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    // Create tokio runtime and run server
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_server(config))
}

pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = StdArc::new(RecordingStore::open(&config.database_path, &config.uploads_dir).await?);
    let app = build_router(store.clone(), &config)?;

    let listener = tokio::net::TcpListener::bind(format!("[::]:{}", config.port))
        .await
        .map_err(|e| format!("Failed to bind to port {}: {}", config.port, e))?;

    info!("Listening on: http://[::]:{} (IPv4 + IPv6)", config.port);
    info!("Endpoints:");
    info!("  POST   /api/recordings  - Upload a recording (multipart field '{}')", UPLOAD_FIELD_NAME);
    info!("  GET    /api/recordings  - List recordings, newest first");
    info!("  PUT    /api/recordings/{{id}}  - Rename a recording");
    info!("  DELETE /api/recordings/{{id}}  - Delete a recording");
    info!("  GET    /{}/{{file}}  - Recording content", UPLOADS_ROUTE_PREFIX);
    if config.max_upload_bytes.is_none() {
        warn!("No upload size limit configured; request bodies are unbounded");
    }

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let signal = wait_for_stop_signal().await;
            info!("Received {}, shutting down", signal);
        })
        .await;

    store.close().await;
    served.map_err(|e| format!("Server error: {}", e))?;
    Ok(())
}

/// Build the application router around a store
pub fn build_router(
    store: StdArc<RecordingStore>,
    config: &ServerConfig,
) -> Result<Router, String> {
    let cors = cors_layer(config)?;

    let body_limit = match config.max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    let content = ServeDir::new(store.uploads_dir());
    let app_state = StdArc::new(AppState { store });

    let api_routes = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/recordings",
            get(list_handler).post(upload_handler.layer(body_limit)),
        )
        .route(
            "/api/recordings/{id}",
            put(rename_handler).delete(delete_handler),
        )
        .with_state(app_state);

    Ok(api_routes
        .nest_service(&format!("/{}", UPLOADS_ROUTE_PREFIX), content)
        .layer(cors))
}

fn cors_layer(config: &ServerConfig) -> Result<CorsLayer, String> {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allows_any_origin() {
        return Ok(cors.allow_origin(Any));
    }

    let origins = config
        .cors_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|_| format!("Invalid CORS origin '{}'", origin))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(cors.allow_origin(AllowOrigin::list(origins)))
}

#[cfg(unix)]
async fn wait_for_stop_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut terminate, mut interrupt) =
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(terminate), Ok(interrupt)) => (terminate, interrupt),
            _ => {
                warn!("Failed to install signal handlers, falling back to Ctrl-C");
                let _ = tokio::signal::ctrl_c().await;
                return "Ctrl-C";
            }
        };

    tokio::select! {
        _ = terminate.recv() => "SIGTERM",
        _ = interrupt.recv() => "SIGINT",
    }
}

#[cfg(not(unix))]
async fn wait_for_stop_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "Ctrl-C"
}

// Health check endpoint - returns 200 OK if server is running
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

fn message_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

/// Map a store failure to its response; `message` describes the failed step
fn store_error_response(message: &str, err: StoreError) -> Response {
    match err {
        StoreError::Validation(reason) => message_response(StatusCode::BAD_REQUEST, &reason),
        StoreError::NotFound(_) => message_response(StatusCode::NOT_FOUND, "Recording not found."),
        StoreError::ContentRead(e) => {
            let status = e
                .get_ref()
                .and_then(|inner| inner.downcast_ref::<MultipartError>())
                .map(|multipart_err| multipart_err.status())
                .unwrap_or(StatusCode::BAD_REQUEST);
            warn!("Upload body could not be read: {}", e);
            (
                status,
                Json(json!({ "message": "Failed to read upload.", "error": e.to_string() })),
            )
                .into_response()
        }
        err @ (StoreError::StorageWrite(_) | StoreError::Persistence(_)) => {
            error!("{} {}", message, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": message, "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

/// Parse a recording id path segment; ids are positive integers
fn parse_recording_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

async fn upload_handler(
    State(state): State<StdArc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            debug!("Upload rejected: {}", rejection);
            return message_response(StatusCode::BAD_REQUEST, "Please upload a file.");
        }
    };

    // The clip is stored as soon as its part arrives; the rest of the body is
    // still read so a second file part can void the upload
    let mut stored: Option<Recording> = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                discard_upload(&state.store, stored.take()).await;
                return (
                    e.status(),
                    Json(json!({ "message": "Invalid multipart body.", "error": e.body_text() })),
                )
                    .into_response();
            }
        };

        let is_clip = field.name() == Some(UPLOAD_FIELD_NAME);
        if !is_clip && field.file_name().is_none() {
            // Plain form fields carry nothing the store needs
            continue;
        }
        if !is_clip || stored.is_some() {
            drop(field);
            discard_upload(&state.store, stored.take()).await;
            return message_response(
                StatusCode::BAD_REQUEST,
                &format!("Upload exactly one file, as '{}'.", UPLOAD_FIELD_NAME),
            );
        }

        debug!("POST /api/recordings: receiving '{}' part", UPLOAD_FIELD_NAME);
        let original_name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_ORIGINAL_NAME)
            .to_string();

        // Stream the part straight to disk; the part body is never buffered whole
        let body = field.map(|chunk| chunk.map_err(std::io::Error::other));
        let reader = StreamReader::new(body);
        tokio::pin!(reader);

        match state.store.create(reader, &original_name).await {
            Ok(recording) => stored = Some(recording),
            Err(err @ StoreError::StorageWrite(_)) => {
                return store_error_response("Error saving file.", err)
            }
            Err(err) => return store_error_response("Error saving to database.", err),
        }
    }

    match stored {
        Some(recording) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "Recording uploaded successfully",
                "recordingId": recording.id,
            })),
        )
            .into_response(),
        None => message_response(StatusCode::BAD_REQUEST, "Please upload a file."),
    }
}

/// Remove a recording stored earlier in a request that turned out to be invalid
async fn discard_upload(store: &RecordingStore, recording: Option<Recording>) {
    let Some(recording) = recording else {
        return;
    };
    match store.delete(recording.id).await {
        Ok(()) => debug!("Discarded recording {} of a rejected upload", recording.id),
        Err(e) => warn!(
            "Failed to discard recording {} of a rejected upload: {}",
            recording.id, e
        ),
    }
}

async fn list_handler(State(state): State<StdArc<AppState>>) -> Response {
    debug!("GET /api/recordings");
    match state.store.list().await {
        Ok(recordings) => (StatusCode::OK, Json(recordings)).into_response(),
        Err(err) => store_error_response("Error fetching recordings.", err),
    }
}

/// Pull a usable title out of a rename body: `{"title": "<non-empty string>"}`
fn title_from_body(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let title = value.get("title")?.as_str()?;
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

async fn rename_handler(
    State(state): State<StdArc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    debug!("PUT /api/recordings/{}", id);
    let Some(title) = title_from_body(&body) else {
        return message_response(StatusCode::BAD_REQUEST, "Title is required.");
    };
    let Some(id) = parse_recording_id(&id) else {
        return message_response(StatusCode::BAD_REQUEST, "Invalid recording id.");
    };

    match state.store.rename(id, &title).await {
        Ok(()) => message_response(StatusCode::OK, "Title updated successfully."),
        Err(err) => store_error_response("Error updating title.", err),
    }
}

async fn delete_handler(
    State(state): State<StdArc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    debug!("DELETE /api/recordings/{}", id);
    let Some(id) = parse_recording_id(&id) else {
        return message_response(StatusCode::BAD_REQUEST, "Invalid recording id.");
    };

    match state.store.delete(id).await {
        Ok(()) => message_response(StatusCode::OK, "Recording deleted successfully."),
        Err(err) => store_error_response("Database error.", err),
    }
}
