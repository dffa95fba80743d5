use async_trait::async_trait;
use image::RgbImage;
use thiserror::Error;

use crate::region::RawLine;

/// Nested engine result: one entry per image submitted in the call.
///
/// `None` marks an image for which the engine produced no result at all.
#[derive(Debug, Clone, Default)]
pub struct OcrOutput {
    pub batches: Vec<Option<Vec<RawLine>>>,
}

impl OcrOutput {
    /// Output for a single-image call.
    pub fn single(lines: Vec<RawLine>) -> Self {
        Self {
            batches: vec![Some(lines)],
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("engine error: {0}")]
    EngineError(String),
    #[error("engine unavailable: {0}")]
    Unavailable(String),
}

/// Black-box text recognition.
///
/// Implementations recognize a fixed language with line orientation
/// classification enabled. Inference is blocking; implementations move it onto
/// the blocking pool so callers can await it without stalling the runtime.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: RgbImage) -> Result<OcrOutput, OcrError>;

    /// Short identifier used in logs and the health endpoint.
    fn name(&self) -> &'static str;
}

pub(crate) async fn run_blocking<F>(job: F) -> Result<OcrOutput, OcrError>
where
    F: FnOnce() -> Result<OcrOutput, OcrError> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| OcrError::EngineError(e.to_string()))?
}
