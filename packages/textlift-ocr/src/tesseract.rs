//! Tesseract binding driven through the `tesseract` command line tool.
//!
//! The image is PNG-encoded and piped on stdin; word rows from the TSV
//! renderer are grouped back into lines.
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use async_trait::async_trait;
use image::{ImageFormat, RgbImage};

use crate::engine::{run_blocking, OcrEngine, OcrError, OcrOutput};
use crate::region::{BoundingBox, RawLine};

/// Page segmentation mode 1: automatic segmentation with orientation and
/// script detection.
const PSM_AUTO_OSD: u8 = 1;

const WORD_LEVEL: &str = "5";

#[derive(Debug, Clone)]
pub struct TesseractConfig {
    pub binary: PathBuf,
    pub language: String,
    pub page_segmentation_mode: u8,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            page_segmentation_mode: PSM_AUTO_OSD,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TesseractEngine {
    config: TesseractConfig,
}

impl TesseractEngine {
    /// Checks that the binary can be executed before accepting work.
    pub fn new(config: TesseractConfig) -> Result<Self, OcrError> {
        let output = Command::new(&config.binary)
            .arg("--version")
            .output()
            .map_err(|e| {
                OcrError::Unavailable(format!("{}: {}", config.binary.display(), e))
            })?;
        if !output.status.success() {
            return Err(OcrError::Unavailable(format!(
                "{} --version exited with {}",
                config.binary.display(),
                output.status
            )));
        }
        let version = String::from_utf8_lossy(&output.stdout);
        tracing::info!(
            version = version.lines().next().unwrap_or("unknown"),
            language = %config.language,
            "tesseract engine ready"
        );
        Ok(Self { config })
    }

    fn run(config: &TesseractConfig, image: &RgbImage) -> Result<OcrOutput, OcrError> {
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| OcrError::InvalidInput(e.to_string()))?;

        let mut child = Command::new(&config.binary)
            .args(["stdin", "stdout", "-l", config.language.as_str(), "--psm"])
            .arg(config.page_segmentation_mode.to_string())
            .arg("tsv")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| OcrError::Unavailable(e.to_string()))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| OcrError::EngineError("tesseract stdin unavailable".into()))?;
        let writer = std::thread::spawn(move || stdin.write_all(&png));

        let output = child
            .wait_with_output()
            .map_err(|e| OcrError::EngineError(e.to_string()))?;
        let sent = writer
            .join()
            .map_err(|_| OcrError::EngineError("stdin writer panicked".into()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::EngineError(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        sent.map_err(|e| OcrError::EngineError(format!("failed to send image: {e}")))?;

        let tsv = String::from_utf8_lossy(&output.stdout);
        Ok(OcrOutput::single(parse_tsv(&tsv)))
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(&self, image: RgbImage) -> Result<OcrOutput, OcrError> {
        let config = self.config.clone();
        run_blocking(move || Self::run(&config, &image)).await
    }

    fn name(&self) -> &'static str {
        "tesseract"
    }
}

struct LineAccumulator {
    key: (u32, u32, u32, u32),
    words: Vec<String>,
    confidences: Vec<f64>,
    geometry: BoundingBox,
}

impl LineAccumulator {
    fn finish(self) -> RawLine {
        let confidence = if self.confidences.is_empty() {
            0.0
        } else {
            self.confidences.iter().sum::<f64>() / self.confidences.len() as f64 / 100.0
        };
        RawLine::new(self.geometry, self.words.join(" "), confidence)
    }
}

/// Groups word rows of Tesseract TSV output into lines, in output order.
///
/// Line confidence is the mean word confidence rescaled to `[0, 1]`; geometry
/// is the union of the word boxes.
pub fn parse_tsv(tsv: &str) -> Vec<RawLine> {
    let mut lines = Vec::new();
    let mut current: Option<LineAccumulator> = None;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.splitn(12, '\t').collect();
        if cols.len() < 12 || cols[0] != WORD_LEVEL {
            continue;
        }
        let text = cols[11].trim();
        let Ok(confidence) = cols[10].trim().parse::<f64>() else {
            continue;
        };
        if text.is_empty() || confidence < 0.0 {
            continue;
        }
        let Some(key) = parse_key(&cols[1..5]) else {
            continue;
        };
        let Some(word_box) = parse_box(&cols[6..10]) else {
            continue;
        };

        match current.as_mut() {
            Some(acc) if acc.key == key => {
                acc.words.push(text.to_string());
                acc.confidences.push(confidence);
                acc.geometry = acc.geometry.union(&word_box);
                continue;
            }
            _ => {}
        }

        if let Some(done) = current.take() {
            lines.push(done.finish());
        }
        current = Some(LineAccumulator {
            key,
            words: vec![text.to_string()],
            confidences: vec![confidence],
            geometry: word_box,
        });
    }

    if let Some(done) = current {
        lines.push(done.finish());
    }
    lines
}

fn parse_key(cols: &[&str]) -> Option<(u32, u32, u32, u32)> {
    let mut nums = cols.iter().map(|c| c.trim().parse::<u32>().ok());
    Some((nums.next()??, nums.next()??, nums.next()??, nums.next()??))
}

fn parse_box(cols: &[&str]) -> Option<BoundingBox> {
    let mut nums = cols.iter().map(|c| c.trim().parse::<f32>().ok());
    Some(BoundingBox {
        x: nums.next()??,
        y: nums.next()??,
        width: nums.next()??,
        height: nums.next()??,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn tsv(rows: &[&str]) -> String {
        let mut out = String::from(HEADER);
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out
    }

    #[test]
    fn test_parse_groups_words_into_lines() {
        let input = tsv(&[
            "1\t1\t0\t0\t0\t0\t0\t0\t640\t480\t-1\t",
            "4\t1\t1\t1\t1\t0\t10\t10\t200\t20\t-1\t",
            "5\t1\t1\t1\t1\t1\t10\t10\t80\t20\t90.0\tHello",
            "5\t1\t1\t1\t1\t2\t100\t12\t110\t18\t80.0\tworld",
            "5\t1\t1\t1\t2\t1\t10\t40\t50\t20\t95.0\tAgain",
        ]);
        let lines = parse_tsv(&input);
        assert_eq!(lines.len(), 2);

        let (text, confidence) = lines[0].recognition.clone().unwrap();
        assert_eq!(text, "Hello world");
        assert!((confidence - 0.85).abs() < 1e-6);
        assert_eq!(
            lines[0].geometry,
            Some(BoundingBox {
                x: 10.0,
                y: 10.0,
                width: 200.0,
                height: 20.0
            })
        );

        let (text, confidence) = lines[1].recognition.clone().unwrap();
        assert_eq!(text, "Again");
        assert!((confidence - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_parse_skips_blank_and_unscored_words() {
        let input = tsv(&[
            "5\t1\t1\t1\t1\t1\t10\t10\t80\t20\t-1\t ",
            "5\t1\t1\t1\t1\t2\t10\t10\t80\t20\tnot-a-number\tbad",
            "5\t1\t1\t1\t1\t3\t10\t10\t80\t20\t70\tok",
        ]);
        let lines = parse_tsv(&input);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].recognition.as_ref().unwrap().0, "ok");
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_tsv("").is_empty());
        assert!(parse_tsv(HEADER).is_empty());
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let config = TesseractConfig {
            binary: PathBuf::from("/nonexistent/tesseract-binary"),
            ..TesseractConfig::default()
        };
        let err = TesseractEngine::new(config).unwrap_err();
        assert!(matches!(err, OcrError::Unavailable(_)));
    }
}
