//! Turns raw engine output into the uniform `(text, confidence)` line list.
use crate::engine::OcrOutput;
use crate::region::RecognizedLine;

/// Extracts recognized lines from an engine result.
///
/// Only the first top-level entry is consulted since every call submits a
/// single image. Lines missing either the geometry or the recognition element
/// are skipped, text is trimmed, and blank lines are dropped. Confidences are
/// clamped into `[0, 1]`; a NaN confidence counts as zero.
pub fn recognized_lines(output: &OcrOutput) -> Vec<RecognizedLine> {
    let Some(Some(lines)) = output.batches.first() else {
        return Vec::new();
    };

    lines
        .iter()
        .filter(|line| line.element_count() >= 2)
        .filter_map(|line| line.recognition.as_ref())
        .filter_map(|(text, confidence)| {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            Some(RecognizedLine {
                text: text.to_string(),
                confidence: clamp_confidence(*confidence),
            })
        })
        .collect()
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}
