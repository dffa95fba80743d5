pub mod adapter;
pub mod engine;
pub mod region;
pub mod tesseract;

#[cfg(feature = "paddle")]
pub mod paddle;

pub use adapter::recognized_lines;
pub use engine::{OcrEngine, OcrError, OcrOutput};
pub use region::{BoundingBox, RawLine, RecognizedLine};
pub use tesseract::{TesseractConfig, TesseractEngine};

#[cfg(feature = "paddle")]
pub use paddle::{PaddleEngine, PaddleModels};
