//! # textlift
//!
//! Extracts text from uploaded images and reports it with confidence scores.
//!
//! ## Pipeline
//!
//! - **Preprocessing**: RGB conversion, size capping, contrast and sharpness boosts
//! - **Recognition**: any [`textlift_ocr::OcrEngine`], shared process-wide behind an [`EngineHandle`]
//! - **Normalization**: whitespace cleanup and in-word digit/letter repair
//! - **Aggregation**: per-image records folded into one [`BatchResult`]; one image failing never fails the batch
//!
//! ## Quick Start
//!
//! ```ignore
//! use textlift::prelude::*;
//!
//! let config = Config::from_env()?;
//! let pipeline = Pipeline::from_config(&config)?;
//! let batch = pipeline
//!     .process_batch(vec![ImageInput::new(1, Some("receipt.png"), bytes)])
//!     .await?;
//! println!("{} ({:.1}%)", batch.combined_text, batch.total_confidence);
//! ```

pub mod batch;
pub mod config;
pub mod engine;
pub mod error;
pub mod image_result;
pub mod normalize;
pub mod pipeline;
pub mod preprocess;
pub mod server;
pub mod telemetry;

pub use batch::{BatchError, BatchResult};
pub use config::{Config, EngineKind, UploadFieldMode};
pub use engine::{build_engine, EngineHandle, RecognizeError};
pub use error::AppError;
pub use image_result::{ImageInput, ImageResult};
pub use normalize::{normalize_lines, normalize_text};
pub use pipeline::{ImageError, Pipeline};
pub use preprocess::{PreprocessConfig, Preprocessor};
pub use server::{router, AppState};

/// Prelude module for convenient imports
///
/// ```ignore
/// use textlift::prelude::*;
/// ```
pub mod prelude {
  pub use crate::{
    normalize_lines, normalize_text, router, AppState, BatchResult, Config, EngineHandle, ImageInput,
    ImageResult, Pipeline, PreprocessConfig, Preprocessor,
  };
  pub use textlift_ocr::{OcrEngine, OcrError, OcrOutput, RawLine, RecognizedLine};
}
