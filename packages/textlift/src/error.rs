//! Error types for the HTTP surface.
use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::batch::BatchError;

pub type Result<T> = std::result::Result<T, AppError>;

/// Request-fatal errors. Per-image failures never become an `AppError`; they
/// are reported inside the batch.
#[derive(Error, Debug)]
pub enum AppError {
  #[error("{0}")]
  BadRequest(String),

  #[error("Method not allowed")]
  MethodNotAllowed,

  #[error("{0}")]
  PayloadTooLarge(String),

  #[error("OCR processing failed: {0}")]
  Internal(String),
}

impl From<BatchError> for AppError {
  fn from(err: BatchError) -> Self {
    match err {
      BatchError::NoImages => AppError::BadRequest(err.to_string()),
    }
  }
}

#[derive(Serialize)]
pub struct ErrorBody {
  pub success: bool,
  pub error: String,
}

impl AppError {
  pub fn status(&self) -> StatusCode {
    match self {
      AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
      AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
      AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
      AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    } else {
      tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
    }
    let body = Json(ErrorBody {
      success: false,
      error: self.to_string(),
    });
    (status, body).into_response()
  }
}
