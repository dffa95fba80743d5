//! Per-image input and result records.
use serde::{Deserialize, Serialize};
use textlift_ocr::RecognizedLine;

use crate::normalize::normalize_lines;

/// One uploaded file. `index` is 1-based within the batch.
#[derive(Debug, Clone)]
pub struct ImageInput {
  pub index: usize,
  pub filename: String,
  pub bytes: Vec<u8>,
}

impl ImageInput {
  /// Keeps the client's filename as given; uses `image_{index}` when it is
  /// absent or empty.
  pub fn new(index: usize, filename: Option<&str>, bytes: Vec<u8>) -> Self {
    let filename = match filename {
      Some(name) if !name.is_empty() => name.to_string(),
      _ => format!("image_{index}"),
    };
    Self { index, filename, bytes }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResult {
  pub filename: String,
  pub text: String,
  /// Mean line confidence on a 0-100 scale.
  pub confidence: f64,
  pub character_count: usize,
  pub lines_detected: usize,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl ImageResult {
  /// Builds the record for an image that went through recognition.
  pub fn from_lines(filename: impl Into<String>, lines: &[RecognizedLine]) -> Self {
    let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
    let text = normalize_lines(&texts);
    Self {
      filename: filename.into(),
      character_count: text.chars().count(),
      text,
      confidence: mean_confidence(lines) * 100.0,
      lines_detected: lines.len(),
      error: None,
    }
  }

  /// Record for an image whose decoding, preprocessing or recognition failed.
  pub fn failed(filename: impl Into<String>, error: impl Into<String>) -> Self {
    Self {
      filename: filename.into(),
      text: String::new(),
      confidence: 0.0,
      character_count: 0,
      lines_detected: 0,
      error: Some(error.into()),
    }
  }

  pub fn is_failed(&self) -> bool {
    self.error.is_some()
  }
}

fn mean_confidence(lines: &[RecognizedLine]) -> f64 {
  if lines.is_empty() {
    return 0.0;
  }
  lines.iter().map(|l| l.confidence).sum::<f64>() / lines.len() as f64
}

#[cfg(test)]
mod tests {
  use super::*;

  fn line(text: &str, confidence: f64) -> RecognizedLine {
    RecognizedLine {
      text: text.to_string(),
      confidence,
    }
  }

  #[test]
  fn test_placeholder_filename() {
    assert_eq!(ImageInput::new(3, None, vec![]).filename, "image_3");
    assert_eq!(ImageInput::new(1, Some(""), vec![]).filename, "image_1");
    assert_eq!(ImageInput::new(1, Some("scan.png"), vec![]).filename, "scan.png");
  }

  #[test]
  fn test_client_filename_kept_verbatim() {
    assert_eq!(ImageInput::new(2, Some(" "), vec![]).filename, " ");
    assert_eq!(ImageInput::new(2, Some(" page one.png "), vec![]).filename, " page one.png ");
  }

  #[test]
  fn test_from_lines() {
    let result = ImageResult::from_lines("a.png", &[line("Hel1o", 0.9), line("world", 0.8)]);
    assert_eq!(result.text, "Hello world");
    assert!((result.confidence - 85.0).abs() < 1e-9);
    assert_eq!(result.character_count, 11);
    assert_eq!(result.lines_detected, 2);
    assert!(result.error.is_none());
  }

  #[test]
  fn test_character_count_uses_chars() {
    let result = ImageResult::from_lines("a.png", &[line("café", 1.0)]);
    assert_eq!(result.character_count, 4);
  }

  #[test]
  fn test_no_lines() {
    let result = ImageResult::from_lines("blank.png", &[]);
    assert_eq!(result.text, "");
    assert_eq!(result.confidence, 0.0);
    assert_eq!(result.lines_detected, 0);
    assert!(!result.is_failed());
  }

  #[test]
  fn test_failed_record() {
    let result = ImageResult::failed("bad.png", "boom");
    assert_eq!(result.text, "");
    assert_eq!(result.confidence, 0.0);
    assert_eq!(result.character_count, 0);
    assert_eq!(result.lines_detected, 0);
    assert_eq!(result.error.as_deref(), Some("boom"));
  }

  #[test]
  fn test_error_field_only_serialized_on_failure() {
    let ok = serde_json::to_value(ImageResult::from_lines("a.png", &[line("x", 0.5)])).unwrap();
    assert!(ok.get("error").is_none());
    let failed = serde_json::to_value(ImageResult::failed("b.png", "boom")).unwrap();
    assert_eq!(failed["error"], "boom");
    assert_eq!(failed["confidence"], 0.0);
  }
}
