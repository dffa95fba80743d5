//! HTTP surface: multipart upload in, batch JSON out.
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
  extract::{
    multipart::{MultipartError, MultipartRejection},
    DefaultBodyLimit, Multipart, State,
  },
  http::{header, Method, StatusCode},
  response::{IntoResponse, Response},
  routing::{get, post},
  Json, Router,
};
use serde::Serialize;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use crate::batch::{BatchError, BatchResult};
use crate::config::{UploadConfig, UploadFieldMode};
use crate::error::{AppError, Result};
use crate::image_result::ImageInput;
use crate::pipeline::Pipeline;

const MULTIPART_REQUIRED: &str = "Content-Type must be multipart/form-data";

#[derive(Clone)]
pub struct AppState {
  pub pipeline: Arc<Pipeline>,
  pub upload: UploadConfig,
}

impl AppState {
  pub fn new(pipeline: Pipeline, upload: UploadConfig) -> Self {
    Self {
      pipeline: Arc::new(pipeline),
      upload,
    }
  }
}

#[derive(Serialize)]
struct HealthResponse {
  status: &'static str,
  version: &'static str,
  engine: &'static str,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
  Json(HealthResponse {
    status: "healthy",
    version: env!("CARGO_PKG_VERSION"),
    engine: state.pipeline.engine_name(),
  })
}

async fn method_not_allowed() -> AppError {
  AppError::MethodNotAllowed
}

/// `POST` handler: runs every uploaded image through the pipeline.
async fn extract_text(
  State(state): State<AppState>,
  multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<BatchResult>> {
  let span = tracing::info_span!("ocr_request", request_id = %Uuid::new_v4());
  handle_upload(state, multipart).instrument(span).await
}

async fn handle_upload(
  state: AppState,
  multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<BatchResult>> {
  let multipart = multipart.map_err(|e| {
    tracing::debug!(error = %e, "multipart extraction rejected");
    AppError::BadRequest(MULTIPART_REQUIRED.to_string())
  })?;

  let inputs = collect_images(multipart, state.upload.field_mode).await?;
  if inputs.is_empty() {
    return Err(BatchError::NoImages.into());
  }
  tracing::info!(images = inputs.len(), "received images");

  let batch = state.pipeline.process_batch(inputs).await?;
  Ok(Json(batch))
}

/// Whether a multipart part should be treated as an uploaded image.
pub fn accepts_field(mode: UploadFieldMode, name: &str, filename: Option<&str>) -> bool {
  match mode {
    UploadFieldMode::Prefix => name.starts_with("image") && filename.is_some_and(|f| !f.is_empty()),
    UploadFieldMode::Repeated => name == "images",
  }
}

fn multipart_error(err: MultipartError) -> AppError {
  if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
    AppError::PayloadTooLarge(err.body_text())
  } else {
    AppError::BadRequest(format!("Failed to read upload: {}", err.body_text()))
  }
}

/// Reads the accepted parts, in order, into pipeline inputs.
pub async fn collect_images(mut multipart: Multipart, mode: UploadFieldMode) -> Result<Vec<ImageInput>> {
  let mut inputs = Vec::new();

  while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
    let name = field.name().unwrap_or("").to_string();
    let filename = field.file_name().map(str::to_string);

    if !accepts_field(mode, &name, filename.as_deref()) {
      tracing::debug!(field = %name, filename = ?filename, "skipping form field");
      continue;
    }

    let bytes = field.bytes().await.map_err(multipart_error)?;
    inputs.push(ImageInput::new(inputs.len() + 1, filename.as_deref(), bytes.to_vec()));
  }

  Ok(inputs)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
  let message = if let Some(s) = err.downcast_ref::<String>() {
    s.clone()
  } else if let Some(s) = err.downcast_ref::<&str>() {
    s.to_string()
  } else {
    "unknown error".to_string()
  };
  AppError::Internal(message).into_response()
}

pub fn router(state: AppState) -> Router {
  let cors = CorsLayer::new()
    .allow_origin(AnyOrigin)
    .allow_methods([Method::POST, Method::OPTIONS])
    .allow_headers([header::CONTENT_TYPE]);

  let body_limit = state.upload.max_request_bytes;
  let ocr = post(extract_text).fallback(method_not_allowed);

  Router::new()
    .route("/", ocr.clone())
    .route("/api/ocr", ocr)
    .route("/health", get(health_check))
    .layer(CatchPanicLayer::custom(handle_panic))
    .layer(DefaultBodyLimit::max(body_limit))
    .layer(TraceLayer::new_for_http())
    .layer(cors)
    .with_state(state)
}

/// Serves `app` until Ctrl+C or SIGTERM.
pub async fn serve(app: Router, addr: SocketAddr) -> std::io::Result<()> {
  let listener = tokio::net::TcpListener::bind(addr).await?;
  tracing::info!("textlift listening on {}", addr);

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  tracing::info!("server shutdown complete");
  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = signal::ctrl_c().await {
      tracing::error!("failed to listen for Ctrl+C: {}", e);
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut stream) => {
        stream.recv().await;
      }
      Err(e) => {
        tracing::error!("failed to install SIGTERM handler: {}", e);
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }

  tracing::info!("shutdown signal received");
}
