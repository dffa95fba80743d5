//! Process-wide access to the OCR engine.
//!
//! The engine is built once at startup and shared by every request. Access is
//! gated by a semaphore so engines that cannot run concurrently are used by
//! one request at a time.
use std::sync::Arc;
use std::time::Duration;

use image::RgbImage;
use textlift_ocr::{OcrEngine, OcrError, OcrOutput, TesseractConfig, TesseractEngine};
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::{EngineConfig, EngineKind};

#[derive(Debug, Error)]
pub enum RecognizeError {
  #[error(transparent)]
  Engine(#[from] OcrError),
  #[error("recognition timed out after {}s", .0.as_secs())]
  TimedOut(Duration),
}

#[derive(Clone)]
pub struct EngineHandle {
  engine: Arc<dyn OcrEngine>,
  permits: Arc<Semaphore>,
  timeout: Option<Duration>,
}

impl EngineHandle {
  pub fn new(engine: Arc<dyn OcrEngine>, concurrency: usize, timeout: Option<Duration>) -> Self {
    Self {
      engine,
      permits: Arc::new(Semaphore::new(concurrency.max(1))),
      timeout,
    }
  }

  pub fn name(&self) -> &'static str {
    self.engine.name()
  }

  /// Waits for an engine slot, then runs recognition under the configured
  /// deadline.
  ///
  /// The slot is held by the recognition task itself, so an image that times
  /// out keeps its slot until the engine has actually finished with it.
  pub async fn recognize(&self, image: RgbImage) -> Result<OcrOutput, RecognizeError> {
    let permit = Arc::clone(&self.permits)
      .acquire_owned()
      .await
      .map_err(|_| OcrError::Unavailable("engine has been shut down".into()))?;

    let engine = Arc::clone(&self.engine);
    let task = tokio::spawn(async move {
      let _permit = permit;
      engine.recognize(image).await
    });

    let joined = match self.timeout {
      Some(limit) => tokio::time::timeout(limit, task)
        .await
        .map_err(|_| RecognizeError::TimedOut(limit))?,
      None => task.await,
    };

    match joined {
      Ok(output) => Ok(output?),
      Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
      Err(e) => Err(OcrError::EngineError(e.to_string()).into()),
    }
  }
}

/// Constructs the configured engine. Expensive; call once per process.
pub fn build_engine(config: &EngineConfig) -> Result<Arc<dyn OcrEngine>, OcrError> {
  match config.kind {
    EngineKind::Tesseract => {
      let engine = TesseractEngine::new(TesseractConfig {
        binary: config.tesseract_bin.clone(),
        language: config.language.clone(),
        ..TesseractConfig::default()
      })?;
      Ok(Arc::new(engine))
    }
    #[cfg(feature = "paddle")]
    EngineKind::Paddle => {
      let models = textlift_ocr::PaddleModels::in_dir(&config.paddle_model_dir);
      Ok(Arc::new(textlift_ocr::PaddleEngine::new(&models)?))
    }
    #[cfg(not(feature = "paddle"))]
    EngineKind::Paddle => Err(OcrError::Unavailable(
      "paddle engine requested but textlift was built without the `paddle` feature".into(),
    )),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;
  use std::sync::atomic::{AtomicUsize, Ordering};

  struct SlowEngine {
    delay: Duration,
    active: AtomicUsize,
    peak: AtomicUsize,
  }

  #[async_trait]
  impl OcrEngine for SlowEngine {
    async fn recognize(&self, _image: RgbImage) -> Result<OcrOutput, OcrError> {
      let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
      self.peak.fetch_max(now, Ordering::SeqCst);
      tokio::time::sleep(self.delay).await;
      self.active.fetch_sub(1, Ordering::SeqCst);
      Ok(OcrOutput::single(vec![]))
    }

    fn name(&self) -> &'static str {
      "slow"
    }
  }

  fn slow(delay_ms: u64) -> Arc<SlowEngine> {
    Arc::new(SlowEngine {
      delay: Duration::from_millis(delay_ms),
      active: AtomicUsize::new(0),
      peak: AtomicUsize::new(0),
    })
  }

  #[tokio::test]
  async fn test_single_permit_serializes_access() {
    let engine = slow(20);
    let handle = EngineHandle::new(engine.clone(), 1, None);
    let tasks: Vec<_> = (0..4)
      .map(|_| {
        let handle = handle.clone();
        tokio::spawn(async move { handle.recognize(RgbImage::new(1, 1)).await })
      })
      .collect();
    for task in tasks {
      task.await.unwrap().unwrap();
    }
    assert_eq!(engine.peak.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_more_permits_allow_overlap() {
    let engine = slow(50);
    let handle = EngineHandle::new(engine.clone(), 2, None);
    let (a, b) = tokio::join!(
      handle.recognize(RgbImage::new(1, 1)),
      handle.recognize(RgbImage::new(1, 1))
    );
    a.unwrap();
    b.unwrap();
    assert_eq!(engine.peak.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_timeout_is_reported() {
    let handle = EngineHandle::new(slow(200), 1, Some(Duration::from_millis(10)));
    let err = handle.recognize(RgbImage::new(1, 1)).await.unwrap_err();
    assert!(matches!(err, RecognizeError::TimedOut(_)));
  }

  struct BlockingEngine {
    work: Duration,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
  }

  #[async_trait]
  impl OcrEngine for BlockingEngine {
    async fn recognize(&self, _image: RgbImage) -> Result<OcrOutput, OcrError> {
      let work = self.work;
      let active = Arc::clone(&self.active);
      let peak = Arc::clone(&self.peak);
      tokio::task::spawn_blocking(move || {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(work);
        active.fetch_sub(1, Ordering::SeqCst);
      })
      .await
      .map_err(|e| OcrError::EngineError(e.to_string()))?;
      Ok(OcrOutput::single(vec![]))
    }

    fn name(&self) -> &'static str {
      "blocking"
    }
  }

  #[tokio::test]
  async fn test_timed_out_image_keeps_engine_slot() {
    let peak = Arc::new(AtomicUsize::new(0));
    let active = Arc::new(AtomicUsize::new(0));
    let engine = Arc::new(BlockingEngine {
      work: Duration::from_millis(300),
      active: Arc::clone(&active),
      peak: Arc::clone(&peak),
    });
    let handle = EngineHandle::new(engine, 1, Some(Duration::from_millis(20)));

    let first = handle.recognize(RgbImage::new(1, 1)).await;
    let second = handle.recognize(RgbImage::new(1, 1)).await;
    assert!(matches!(first, Err(RecognizeError::TimedOut(_))));
    assert!(matches!(second, Err(RecognizeError::TimedOut(_))));

    // Let the detached work drain before reading the counters.
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(active.load(Ordering::SeqCst), 0);
    assert_eq!(peak.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_timeout_message_names_the_deadline() {
    let handle = EngineHandle::new(slow(1500), 1, Some(Duration::from_secs(1)));
    let err = handle.recognize(RgbImage::new(1, 1)).await.unwrap_err();
    assert_eq!(err.to_string(), "recognition timed out after 1s");
  }

  #[test]
  fn test_missing_tesseract_binary() {
    let config = EngineConfig {
      kind: EngineKind::Tesseract,
      tesseract_bin: "/nonexistent/tesseract".into(),
      language: "eng".into(),
      paddle_model_dir: "models".into(),
      concurrency: 1,
      image_timeout: None,
    };
    assert!(matches!(build_engine(&config), Err(OcrError::Unavailable(_))));
  }
}
