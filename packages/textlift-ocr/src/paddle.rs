//! PaddleOCR models served through ONNX Runtime by `oar-ocr`.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use image::RgbImage;
use oar_ocr::oarocr::{OAROCRBuilder, OAROCR};

use crate::engine::{run_blocking, OcrEngine, OcrError, OcrOutput};
use crate::region::{BoundingBox, RawLine};

#[derive(Debug, Clone)]
pub struct PaddleModels {
    pub text_detection: PathBuf,
    pub text_recognition: PathBuf,
    pub text_line_orientation: PathBuf,
    pub character_dict: PathBuf,
}

impl PaddleModels {
    /// Standard file names inside a model directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            text_detection: dir.join("text_detection.onnx"),
            text_recognition: dir.join("text_recognition.onnx"),
            text_line_orientation: dir.join("textline_orientation.onnx"),
            character_dict: dir.join("ppocr_keys_en.txt"),
        }
    }
}

/// Holds the loaded model sessions. Construction is expensive; build once per
/// process and share.
pub struct PaddleEngine {
    ocr: Arc<OAROCR>,
}

impl PaddleEngine {
    pub fn new(models: &PaddleModels) -> Result<Self, OcrError> {
        for path in [
            &models.text_detection,
            &models.text_recognition,
            &models.text_line_orientation,
            &models.character_dict,
        ] {
            if !path.exists() {
                return Err(OcrError::Unavailable(format!(
                    "missing model file {}",
                    path.display()
                )));
            }
        }

        let ocr = OAROCRBuilder::new(
            &models.text_detection,
            &models.text_recognition,
            &models.character_dict,
        )
        .with_text_line_orientation_classification(&models.text_line_orientation)
        .build()
        .map_err(|e| OcrError::Unavailable(e.to_string()))?;

        tracing::info!(models = ?models, "paddle engine ready");
        Ok(Self { ocr: Arc::new(ocr) })
    }
}

fn to_raw_line(region: oar_ocr::oarocr::TextRegion) -> RawLine {
    let points = &region.bounding_box.points;
    let geometry = if points.is_empty() {
        None
    } else {
        let min_x = points.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
        let min_y = points.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
        let max_x = points.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max);
        let max_y = points.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);
        Some(BoundingBox {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        })
    };
    let recognition = match (region.text, region.confidence) {
        (Some(text), Some(confidence)) => Some((text.to_string(), f64::from(confidence))),
        _ => None,
    };
    RawLine {
        geometry,
        recognition,
    }
}

#[async_trait]
impl OcrEngine for PaddleEngine {
    async fn recognize(&self, image: RgbImage) -> Result<OcrOutput, OcrError> {
        let ocr = Arc::clone(&self.ocr);
        run_blocking(move || {
            let results = ocr
                .predict(vec![image])
                .map_err(|e| OcrError::EngineError(e.to_string()))?;
            let batches = results
                .into_iter()
                .map(|result| Some(result.text_regions.into_iter().map(to_raw_line).collect()))
                .collect();
            Ok(OcrOutput { batches })
        })
        .await
    }

    fn name(&self) -> &'static str {
        "paddle"
    }
}
