//! HTTP API: health, student encoding, classroom attendance.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use classscan_core::protocol::{
    AttendanceRequest, AttendanceResponse, EncodeStudentRequest, EncodeStudentResponse, ErrorBody,
    HealthResponse,
};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::engine::{EngineError, EngineHandle};
use crate::loader::{ImageLoader, LoadError};

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    engine: EngineHandle,
    loader: Arc<ImageLoader>,
}

impl AppState {
    pub fn new(engine: EngineHandle, loader: ImageLoader) -> Self {
        Self {
            engine,
            loader: Arc::new(loader),
        }
    }
}

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing {0}")]
    MissingField(&'static str),
    #[error("Invalid request body: {message}")]
    Rejected { status: StatusCode, message: String },
    #[error("No face detected in image")]
    NoFaceDetected,
    #[error("Could not load image: {0}")]
    ImageLoad(String),
    #[error("{0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<LoadError> for ApiError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Join(e) => ApiError::Internal(format!("image decode task: {e}")),
            other => ApiError::ImageLoad(other.to_string()),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::MissingField(_) => (
                StatusCode::BAD_REQUEST,
                ErrorBody { success: None, error: self.to_string() },
            ),
            ApiError::Rejected { status, .. } => (
                *status,
                ErrorBody { success: Some(false), error: self.to_string() },
            ),
            ApiError::NoFaceDetected | ApiError::ImageLoad(_) => (
                StatusCode::BAD_REQUEST,
                ErrorBody { success: Some(false), error: self.to_string() },
            ),
            ApiError::Internal(detail) => {
                // Details stay in the server log.
                tracing::error!(error = %detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody { success: Some(false), error: "Internal server error".to_string() },
                )
            }
        };

        if status.is_client_error() {
            tracing::warn!(status = status.as_u16(), error = %body.error, "request rejected");
        }

        (status, Json(body)).into_response()
    }
}

/// Build the application router.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/encode-student", post(encode_student_handler))
        .route("/process-attendance", post(process_attendance_handler))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// POST /encode-student: embedding of the most confident face in a reference photo.
async fn encode_student_handler(
    State(state): State<AppState>,
    payload: Result<Json<EncodeStudentRequest>, JsonRejection>,
) -> Result<Json<EncodeStudentResponse>, ApiError> {
    let Json(request) = payload?;
    let source = request
        .source()
        .ok_or(ApiError::MissingField("imageUrl or imageData"))?;

    tracing::info!(source = source.kind(), "encode-student requested");

    let image = state.loader.load(&source).await?;
    let embedding = state
        .engine
        .encode(image)
        .await?
        .ok_or(ApiError::NoFaceDetected)?;

    Ok(Json(EncodeStudentResponse {
        success: true,
        encodings: embedding,
    }))
}

/// POST /process-attendance: present/absent verdict for each student on the roster.
async fn process_attendance_handler(
    State(state): State<AppState>,
    payload: Result<Json<AttendanceRequest>, JsonRejection>,
) -> Result<Json<AttendanceResponse>, ApiError> {
    let Json(request) = payload?;
    let source = request
        .source()
        .ok_or(ApiError::MissingField("classImageUrl or classImageData"))?;
    let students = request
        .students
        .filter(|s| !s.is_empty())
        .ok_or(ApiError::MissingField("students data"))?;

    tracing::info!(
        source = source.kind(),
        students = students.len(),
        "process-attendance requested"
    );

    let image = state.loader.load(&source).await?;
    let results = state.engine.attendance(image, students).await?;

    Ok(Json(AttendanceResponse {
        success: true,
        results,
    }))
}
