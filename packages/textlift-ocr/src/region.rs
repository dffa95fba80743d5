#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// Smallest box covering both `self` and `other`.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let left = self.x.min(other.x);
        let top = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        BoundingBox {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        }
    }
}

/// One line as reported by an engine, before any validation.
///
/// Engines describe a line as a geometry element followed by a
/// `(text, confidence)` pair. Either may be missing when the engine hands back
/// a partial line; such lines are skipped by [`crate::recognized_lines`].
#[derive(Debug, Clone, Default)]
pub struct RawLine {
    pub geometry: Option<BoundingBox>,
    pub recognition: Option<(String, f64)>,
}

impl RawLine {
    pub fn new(geometry: BoundingBox, text: impl Into<String>, confidence: f64) -> Self {
        Self {
            geometry: Some(geometry),
            recognition: Some((text.into(), confidence)),
        }
    }

    /// Number of populated sub-elements.
    pub fn element_count(&self) -> usize {
        usize::from(self.geometry.is_some()) + usize::from(self.recognition.is_some())
    }
}

/// A validated line: trimmed, non-empty text with a confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedLine {
    pub text: String,
    pub confidence: f64,
}
