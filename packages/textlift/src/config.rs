//! Configuration management for the textlift service.
//!
//! Values come from the process environment (after `.env` has been loaded by
//! the binary); anything unset falls back to its default. Values that are set
//! but cannot be parsed are reported instead of silently ignored.
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::preprocess::{
  PreprocessConfig, DEFAULT_CONTRAST_FACTOR, DEFAULT_MAX_DIMENSION, DEFAULT_SHARPNESS_FACTOR,
};

const MIB: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("invalid value {value:?} for {key}: {reason}")]
  Invalid {
    key: &'static str,
    value: String,
    reason: String,
  },
}

#[derive(Debug, Clone)]
pub struct Config {
  pub server: ServerConfig,
  pub engine: EngineConfig,
  pub pipeline: PipelineConfig,
  pub upload: UploadConfig,
  pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
  pub host: String,
  pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
  Tesseract,
  Paddle,
}

impl FromStr for EngineKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "tesseract" => Ok(EngineKind::Tesseract),
      "paddle" | "paddleocr" => Ok(EngineKind::Paddle),
      other => Err(format!("unknown engine '{other}', expected tesseract or paddle")),
    }
  }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
  pub kind: EngineKind,
  pub tesseract_bin: PathBuf,
  pub language: String,
  pub paddle_model_dir: PathBuf,
  /// How many recognitions may run on the shared engine at once.
  pub concurrency: usize,
  /// Per-image recognition deadline; `None` waits indefinitely.
  pub image_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
  pub preprocess: PreprocessConfig,
  pub max_upload_bytes: usize,
}

/// Which multipart parts are treated as images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFieldMode {
  /// Parts whose name starts with `image` and that carry a filename.
  Prefix,
  /// Every part named exactly `images`.
  Repeated,
}

impl FromStr for UploadFieldMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "prefix" => Ok(UploadFieldMode::Prefix),
      "repeated" => Ok(UploadFieldMode::Repeated),
      other => Err(format!("unknown field mode '{other}', expected prefix or repeated")),
    }
  }
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
  pub field_mode: UploadFieldMode,
  pub max_request_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Text,
  Json,
}

impl FromStr for LogFormat {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "text" | "pretty" => Ok(LogFormat::Text),
      "json" => Ok(LogFormat::Json),
      other => Err(format!("unknown log format '{other}'")),
    }
  }
}

impl Default for Config {
  fn default() -> Self {
    Config {
      server: ServerConfig {
        host: "0.0.0.0".to_string(),
        port: 3000,
      },
      engine: EngineConfig {
        kind: EngineKind::Tesseract,
        tesseract_bin: PathBuf::from("tesseract"),
        language: "eng".to_string(),
        paddle_model_dir: PathBuf::from("models"),
        concurrency: 1,
        image_timeout: None,
      },
      pipeline: PipelineConfig {
        preprocess: PreprocessConfig::default(),
        max_upload_bytes: 20 * MIB,
      },
      upload: UploadConfig {
        field_mode: UploadFieldMode::Prefix,
        max_request_bytes: 50 * MIB,
      },
      log_format: LogFormat::Text,
    }
  }
}

impl Config {
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  /// Builds the configuration from an arbitrary key lookup.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let defaults = Config::default();
    let get = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());

    let timeout_secs: u64 = parse(&get, "OCR_IMAGE_TIMEOUT_SECS", 0)?;

    Ok(Config {
      server: ServerConfig {
        host: get("SERVER_HOST").unwrap_or(defaults.server.host),
        port: parse(&get, "SERVER_PORT", defaults.server.port)?,
      },
      engine: EngineConfig {
        kind: parse(&get, "OCR_ENGINE", defaults.engine.kind)?,
        tesseract_bin: get("TESSERACT_BIN")
          .map(PathBuf::from)
          .unwrap_or(defaults.engine.tesseract_bin),
        language: get("OCR_LANG").unwrap_or(defaults.engine.language),
        paddle_model_dir: get("PADDLE_MODEL_DIR")
          .map(PathBuf::from)
          .unwrap_or(defaults.engine.paddle_model_dir),
        concurrency: parse(&get, "OCR_ENGINE_CONCURRENCY", defaults.engine.concurrency)?.max(1),
        image_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
      },
      pipeline: PipelineConfig {
        preprocess: PreprocessConfig {
          max_dimension: parse(&get, "OCR_MAX_DIMENSION", DEFAULT_MAX_DIMENSION)?,
          contrast_factor: parse(&get, "OCR_CONTRAST", DEFAULT_CONTRAST_FACTOR)?,
          sharpness_factor: parse(&get, "OCR_SHARPNESS", DEFAULT_SHARPNESS_FACTOR)?,
        },
        max_upload_bytes: parse(&get, "MAX_UPLOAD_BYTES", defaults.pipeline.max_upload_bytes)?,
      },
      upload: UploadConfig {
        field_mode: parse(&get, "UPLOAD_FIELD_MODE", defaults.upload.field_mode)?,
        max_request_bytes: parse(&get, "MAX_REQUEST_BYTES", defaults.upload.max_request_bytes)?,
      },
      log_format: parse(&get, "LOG_FORMAT", defaults.log_format)?,
    })
  }
}

fn parse<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
  T: FromStr,
  T::Err: std::fmt::Display,
  G: Fn(&'static str) -> Option<String>,
{
  match get(key) {
    None => Ok(default),
    Some(value) => match value.trim().parse::<T>() {
      Ok(parsed) => Ok(parsed),
      Err(e) => Err(ConfigError::Invalid {
        key,
        reason: e.to_string(),
        value,
      }),
    },
  }
}
