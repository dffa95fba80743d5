//! Image normalization ahead of recognition.
//!
//! The preprocessor runs a fixed chain of steps. Each step either produces a
//! new image or fails; a failing step is logged and the image it was given
//! flows on to the next step unchanged.
use std::borrow::Cow;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use thiserror::Error;

pub const DEFAULT_MAX_DIMENSION: u32 = 2048;
pub const DEFAULT_CONTRAST_FACTOR: f32 = 1.2;
pub const DEFAULT_SHARPNESS_FACTOR: f32 = 1.1;

#[derive(Debug, Error)]
pub enum PreprocessError {
  #[error("image has no pixels ({width}x{height})")]
  EmptyImage { width: u32, height: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessConfig {
  pub max_dimension: u32,
  pub contrast_factor: f32,
  pub sharpness_factor: f32,
}

impl Default for PreprocessConfig {
  fn default() -> Self {
    Self {
      max_dimension: DEFAULT_MAX_DIMENSION,
      contrast_factor: DEFAULT_CONTRAST_FACTOR,
      sharpness_factor: DEFAULT_SHARPNESS_FACTOR,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PreprocessStep {
  ConvertRgb,
  Resize { max_dimension: u32 },
  Contrast { factor: f32 },
  Sharpen { factor: f32 },
}

impl PreprocessStep {
  pub fn name(&self) -> &'static str {
    match self {
      PreprocessStep::ConvertRgb => "convert_rgb",
      PreprocessStep::Resize { .. } => "resize",
      PreprocessStep::Contrast { .. } => "contrast",
      PreprocessStep::Sharpen { .. } => "sharpen",
    }
  }

  /// Returns `Ok(None)` when the step leaves the image as it is.
  pub fn apply(&self, image: &DynamicImage) -> Result<Option<DynamicImage>, PreprocessError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
      return Err(PreprocessError::EmptyImage { width, height });
    }

    match *self {
      PreprocessStep::ConvertRgb => match image {
        DynamicImage::ImageRgb8(_) => Ok(None),
        other => Ok(Some(DynamicImage::ImageRgb8(other.to_rgb8()))),
      },
      PreprocessStep::Resize { max_dimension } => Ok(bounded_size(width, height, max_dimension)
        .map(|(w, h)| image.resize_exact(w, h, FilterType::Lanczos3))),
      PreprocessStep::Contrast { factor } => {
        Ok(Some(DynamicImage::ImageRgb8(enhance_contrast(&rgb_view(image), factor))))
      }
      PreprocessStep::Sharpen { factor } => {
        Ok(Some(DynamicImage::ImageRgb8(enhance_sharpness(&rgb_view(image), factor))))
      }
    }
  }
}

#[derive(Debug, Clone)]
pub struct Preprocessor {
  steps: Vec<PreprocessStep>,
}

impl Preprocessor {
  pub fn new(config: &PreprocessConfig) -> Self {
    Self {
      steps: vec![
        PreprocessStep::ConvertRgb,
        PreprocessStep::Resize {
          max_dimension: config.max_dimension,
        },
        PreprocessStep::Contrast {
          factor: config.contrast_factor,
        },
        PreprocessStep::Sharpen {
          factor: config.sharpness_factor,
        },
      ],
    }
  }

  pub fn steps(&self) -> &[PreprocessStep] {
    &self.steps
  }

  /// Runs every step in order. Never fails.
  pub fn run(&self, image: DynamicImage) -> DynamicImage {
    self.steps.iter().fold(image, |current, step| match step.apply(&current) {
      Ok(Some(next)) => next,
      Ok(None) => current,
      Err(e) => {
        tracing::warn!(step = step.name(), error = %e, "image preprocessing step failed, keeping previous image");
        current
      }
    })
  }
}

impl Default for Preprocessor {
  fn default() -> Self {
    Self::new(&PreprocessConfig::default())
  }
}

/// Target size when the longer side exceeds `max_dimension`, `None` otherwise.
/// Scaled dimensions are truncated, never below one pixel.
pub fn bounded_size(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
  let longer = width.max(height);
  if longer <= max_dimension {
    return None;
  }
  let ratio = f64::from(max_dimension) / f64::from(longer);
  let scale = |dim: u32| ((f64::from(dim) * ratio) as u32).max(1);
  Some((scale(width), scale(height)))
}

fn rgb_view(image: &DynamicImage) -> Cow<'_, RgbImage> {
  match image {
    DynamicImage::ImageRgb8(rgb) => Cow::Borrowed(rgb),
    other => Cow::Owned(other.to_rgb8()),
  }
}

fn blend_channel(base: f32, value: f32, factor: f32) -> u8 {
  (base + factor * (value - base)).round().clamp(0.0, 255.0) as u8
}

fn luminance(pixel: &Rgb<u8>) -> f32 {
  let [r, g, b] = pixel.0;
  0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b)
}

/// Blends the image against a flat gray image at its mean luminance.
pub fn enhance_contrast(image: &RgbImage, factor: f32) -> RgbImage {
  let count = f64::from(image.width()) * f64::from(image.height());
  let total: f64 = image.pixels().map(|p| f64::from(luminance(p))).sum();
  let mean = (total / count).round() as f32;

  let mut out = image.clone();
  for pixel in out.pixels_mut() {
    for channel in pixel.0.iter_mut() {
      *channel = blend_channel(mean, f32::from(*channel), factor);
    }
  }
  out
}

const SMOOTH_KERNEL: [[f32; 3]; 3] = [[1.0, 1.0, 1.0], [1.0, 5.0, 1.0], [1.0, 1.0, 1.0]];
const SMOOTH_SCALE: f32 = 13.0;

/// Blends the image against a smoothed copy of itself. Border pixels have no
/// full neighbourhood and are left untouched.
pub fn enhance_sharpness(image: &RgbImage, factor: f32) -> RgbImage {
  let (width, height) = image.dimensions();
  let mut out = image.clone();
  if width < 3 || height < 3 {
    return out;
  }

  for y in 1..height - 1 {
    for x in 1..width - 1 {
      let mut smooth = [0.0f32; 3];
      for (ky, row) in SMOOTH_KERNEL.iter().enumerate() {
        for (kx, weight) in row.iter().enumerate() {
          let neighbour = image.get_pixel(x + kx as u32 - 1, y + ky as u32 - 1);
          for (acc, value) in smooth.iter_mut().zip(neighbour.0.iter()) {
            *acc += weight * f32::from(*value);
          }
        }
      }
      let original = image.get_pixel(x, y);
      let mut sharpened = [0u8; 3];
      for c in 0..3 {
        let base = (smooth[c] / SMOOTH_SCALE).round();
        sharpened[c] = blend_channel(base, f32::from(original.0[c]), factor);
      }
      out.put_pixel(x, y, Rgb(sharpened));
    }
  }
  out
}
