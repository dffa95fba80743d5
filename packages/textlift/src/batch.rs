//! Fan-in of per-image results into the response payload.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::image_result::ImageResult;

const TEXT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Error, PartialEq)]
pub enum BatchError {
  #[error("No valid images found in request")]
  NoImages,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
  pub success: bool,
  pub images: Vec<ImageResult>,
  pub combined_text: String,
  pub total_confidence: f64,
  pub image_count: usize,
}

impl BatchResult {
  /// Aggregates per-image results in order.
  ///
  /// Failed images stay in `images` and count toward `total_confidence` with
  /// their zero confidence. Blank texts are left out of `combined_text`.
  pub fn aggregate(images: Vec<ImageResult>) -> Result<Self, BatchError> {
    if images.is_empty() {
      return Err(BatchError::NoImages);
    }

    let combined_text = images
      .iter()
      .map(|r| r.text.as_str())
      .filter(|text| !text.trim().is_empty())
      .collect::<Vec<_>>()
      .join(TEXT_SEPARATOR);
    let total_confidence =
      images.iter().map(|r| r.confidence).sum::<f64>() / images.len() as f64;

    Ok(Self {
      success: true,
      image_count: images.len(),
      images,
      combined_text,
      total_confidence,
    })
  }

  pub fn failed_count(&self) -> usize {
    self.images.iter().filter(|r| r.is_failed()).count()
  }
}
