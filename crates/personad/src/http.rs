use crate::engine::EngineError;
use crate::pipeline::{Pipeline, PipelineError, Upload};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Shared state for the HTTP handlers.
pub struct AppState {
    pub pipeline: Pipeline,
    pub started_at: DateTime<Utc>,
    pub seed: Option<u64>,
}

impl PipelineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NoUploads => StatusCode::BAD_REQUEST,
            Self::Unsupported(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Extract(_) => StatusCode::BAD_GATEWAY,
            Self::Staging(_) | Self::Engine(_) | Self::Join => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/status", get(status))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// Accept one or more image files and return the four-section report.
async fn analyze(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let mut uploads = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "malformed upload");
                return error_response(e.status(), e.body_text());
            }
        };

        // Plain form fields carry no file name; only files are frames.
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        match field.bytes().await {
            Ok(data) => uploads.push(Upload {
                file_name,
                data: data.to_vec(),
            }),
            Err(e) => {
                tracing::warn!(error = %e, file = %file_name, "failed to read upload");
                return error_response(e.status(), e.body_text());
            }
        }
    }

    match state.pipeline.analyze(uploads).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            let status = e.status_code();
            if status.is_server_error() {
                tracing::error!(error = %e, "analysis failed");
            } else {
                tracing::warn!(error = %e, "analysis rejected");
            }
            let message = match &e {
                PipelineError::Engine(EngineError::Table(_)) => {
                    "measurement table could not be read".to_string()
                }
                other => other.to_string(),
            };
            error_response(status, message)
        }
    }
}

async fn status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let uptime = Utc::now().signed_duration_since(state.started_at);
    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "extractor": state.pipeline.extractor().bin().display().to_string(),
        "seed_pinned": state.seed.is_some(),
        "started_at": state.started_at.to_rfc3339(),
        "uptime_secs": uptime.num_seconds(),
    }))
}
