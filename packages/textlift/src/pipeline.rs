//! The image-to-text pipeline: decode, preprocess, recognize, normalize,
//! aggregate.
use textlift_ocr::{recognized_lines, OcrError, RecognizedLine};
use thiserror::Error;
use tracing::Instrument;

use crate::batch::{BatchError, BatchResult};
use crate::config::Config;
use crate::engine::{build_engine, EngineHandle, RecognizeError};
use crate::image_result::{ImageInput, ImageResult};
use crate::preprocess::Preprocessor;

/// Failure scoped to a single image. Rendered into that image's `error` field.
#[derive(Debug, Error)]
pub enum ImageError {
  #[error("image exceeds {limit} bytes ({size} bytes received)")]
  TooLarge { size: usize, limit: usize },
  #[error("failed to decode image: {0}")]
  Decode(#[from] image::ImageError),
  #[error(transparent)]
  Recognize(#[from] RecognizeError),
  #[error("image worker failed: {0}")]
  Worker(String),
}

pub struct Pipeline {
  engine: EngineHandle,
  preprocessor: Preprocessor,
  max_upload_bytes: usize,
}

impl Pipeline {
  pub fn new(engine: EngineHandle, preprocessor: Preprocessor, max_upload_bytes: usize) -> Self {
    Self {
      engine,
      preprocessor,
      max_upload_bytes,
    }
  }

  /// Builds the engine described by `config` and wires the pipeline around it.
  pub fn from_config(config: &Config) -> Result<Self, OcrError> {
    let engine = build_engine(&config.engine)?;
    let handle = EngineHandle::new(engine, config.engine.concurrency, config.engine.image_timeout);
    Ok(Self::new(
      handle,
      Preprocessor::new(&config.pipeline.preprocess),
      config.pipeline.max_upload_bytes,
    ))
  }

  pub fn engine_name(&self) -> &'static str {
    self.engine.name()
  }

  /// Processes one image. Failures are captured in the returned record.
  pub async fn process_image(&self, input: ImageInput) -> ImageResult {
    let span = tracing::info_span!("image", index = input.index, filename = %input.filename);
    async move {
      let filename = input.filename.clone();
      tracing::info!(bytes = input.bytes.len(), "processing image");
      match self.extract_lines(input).await {
        Ok(lines) => {
          let result = ImageResult::from_lines(filename, &lines);
          tracing::info!(
            lines = result.lines_detected,
            characters = result.character_count,
            confidence = result.confidence,
            "image processed"
          );
          result
        }
        Err(e) => {
          tracing::error!(error = %e, "error processing image");
          ImageResult::failed(filename, e.to_string())
        }
      }
    }
    .instrument(span)
    .await
  }

  async fn extract_lines(&self, input: ImageInput) -> Result<Vec<RecognizedLine>, ImageError> {
    let size = input.bytes.len();
    if size > self.max_upload_bytes {
      return Err(ImageError::TooLarge {
        size,
        limit: self.max_upload_bytes,
      });
    }

    let preprocessor = self.preprocessor.clone();
    let bytes = input.bytes;
    let prepared = tokio::task::spawn_blocking(move || {
      image::load_from_memory(&bytes).map(|decoded| preprocessor.run(decoded).into_rgb8())
    })
    .await
    .map_err(|e| ImageError::Worker(e.to_string()))??;

    let output = self.engine.recognize(prepared).await?;
    Ok(recognized_lines(&output))
  }

  /// Processes every image in order, one at a time, then aggregates.
  pub async fn process_batch(&self, inputs: Vec<ImageInput>) -> Result<BatchResult, BatchError> {
    if inputs.is_empty() {
      return Err(BatchError::NoImages);
    }
    let total = inputs.len();
    let mut results = Vec::with_capacity(total);
    for input in inputs {
      results.push(self.process_image(input).await);
    }
    let batch = BatchResult::aggregate(results)?;
    tracing::info!(
      images = total,
      failed = batch.failed_count(),
      total_confidence = batch.total_confidence,
      "batch processed"
    );
    Ok(batch)
  }
}
