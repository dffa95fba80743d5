//! Shared fixtures: a scripted engine keyed by image width and image builders.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use textlift::config::{UploadConfig, UploadFieldMode};
use textlift::{AppState, EngineHandle, Pipeline, Preprocessor};
use textlift_ocr::{BoundingBox, OcrEngine, OcrError, OcrOutput, RawLine};

pub enum Script {
    Lines(Vec<(&'static str, f64)>),
    Fail(&'static str),
    /// Sleeps before answering with no lines.
    Stall(Duration),
    Panic(&'static str),
}

/// Answers according to the width of the image it receives, so each test
/// image can be given its own outcome.
pub struct ScriptedEngine {
    scripts: HashMap<u32, Script>,
    pub seen: Mutex<Vec<(u32, u32)>>,
}

impl ScriptedEngine {
    pub fn new(scripts: Vec<(u32, Script)>) -> Self {
        Self {
            scripts: scripts.into_iter().collect(),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl OcrEngine for ScriptedEngine {
    async fn recognize(&self, image: RgbImage) -> Result<OcrOutput, OcrError> {
        self.seen.lock().unwrap().push(image.dimensions());
        let bbox = BoundingBox {
            x: 0.0,
            y: 0.0,
            width: image.width() as f32,
            height: 10.0,
        };
        match self.scripts.get(&image.width()) {
            Some(Script::Lines(lines)) => Ok(OcrOutput::single(
                lines
                    .iter()
                    .map(|(text, confidence)| RawLine::new(bbox.clone(), *text, *confidence))
                    .collect(),
            )),
            Some(Script::Fail(message)) => Err(OcrError::EngineError(message.to_string())),
            Some(Script::Stall(delay)) => {
                tokio::time::sleep(*delay).await;
                Ok(OcrOutput::single(vec![]))
            }
            Some(Script::Panic(message)) => panic!("{}", message),
            None => Ok(OcrOutput::empty()),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([240, 240, 240]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn pipeline(engine: Arc<ScriptedEngine>) -> Pipeline {
    pipeline_with_limit(engine, 20 * 1024 * 1024)
}

pub fn pipeline_with_limit(engine: Arc<ScriptedEngine>, max_upload_bytes: usize) -> Pipeline {
    Pipeline::new(
        EngineHandle::new(engine, 1, None),
        Preprocessor::default(),
        max_upload_bytes,
    )
}

pub fn pipeline_with_deadline(engine: Arc<ScriptedEngine>, deadline: Duration) -> Pipeline {
    Pipeline::new(
        EngineHandle::new(engine, 1, Some(deadline)),
        Preprocessor::default(),
        20 * 1024 * 1024,
    )
}

pub fn app_state(engine: Arc<ScriptedEngine>, field_mode: UploadFieldMode) -> AppState {
    app_state_with_request_limit(engine, field_mode, 10 * 1024 * 1024)
}

pub fn app_state_with_request_limit(
    engine: Arc<ScriptedEngine>,
    field_mode: UploadFieldMode,
    max_request_bytes: usize,
) -> AppState {
    AppState::new(
        pipeline(engine),
        UploadConfig {
            field_mode,
            max_request_bytes,
        },
    )
}

pub const BOUNDARY: &str = "textlift-test-boundary";

pub struct Part {
    pub name: &'static str,
    pub filename: Option<&'static str>,
    pub data: Vec<u8>,
}

pub fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match part.filename {
            Some(filename) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                part.name, filename
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
