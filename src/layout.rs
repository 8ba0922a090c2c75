use serde::{Deserialize, Serialize};

/// Axis-aligned box around one recognized glyph or word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlyphBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl GlyphBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64, text: impl Into<String>) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            text: text.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Copy with corners ordered so that `x1 >= x0` and `y1 >= y0`
    pub fn normalized(&self) -> Self {
        Self {
            x0: self.x0.min(self.x1),
            y0: self.y0.min(self.y1),
            x1: self.x0.max(self.x1),
            y1: self.y0.max(self.y1),
            text: self.text.clone(),
            confidence: self.confidence,
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn center_y(&self) -> f64 {
        (self.y0 + self.y1) / 2.0
    }

    /// Width over height, with `+1` keeping zero-height boxes finite
    pub fn aspect(&self) -> f64 {
        self.width() / (self.height() + 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoordOrigin {
    #[default]
    TopLeft,
    BottomLeft,
}

/// Bounding dimensions of the surface the boxes were recognized on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub origin: CoordOrigin,
}

impl Surface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            origin: CoordOrigin::TopLeft,
        }
    }

    /// Finite, non-negative dimensions. Margins measured against anything
    /// else degrade to `0` with a warning.
    pub fn is_measurable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width >= 0.0 && self.height >= 0.0
    }

    /// Convert a box into top-left space with ordered corners
    pub fn to_top_left(&self, glyph: &GlyphBox) -> GlyphBox {
        let glyph = glyph.normalized();
        match self.origin {
            CoordOrigin::TopLeft => glyph,
            CoordOrigin::BottomLeft => GlyphBox {
                y0: self.height - glyph.y1,
                y1: self.height - glyph.y0,
                ..glyph
            },
        }
    }
}

/// Source category. Fixes the vector shape and is part of the hash input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Recognized,
    Structured,
    Virtual,
}

impl SourceKind {
    pub fn vector_len(&self) -> usize {
        match self {
            SourceKind::Recognized => 6,
            SourceKind::Structured => 5,
            SourceKind::Virtual => 3,
        }
    }

    /// Coarse reliability label; never a forensic certainty score
    pub fn reliability(&self) -> &'static str {
        match self {
            SourceKind::Recognized => "heuristic",
            SourceKind::Structured => "declared",
            SourceKind::Virtual => "assumed",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SourceKind::Recognized => "Recognized",
            SourceKind::Structured => "Structured",
            SourceKind::Virtual => "Virtual",
        };
        f.pad(name)
    }
}

/// Page boxes produced by an upstream recognizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedPage {
    pub boxes: Vec<GlyphBox>,
    pub surface: Surface,
}

/// Page margins in twentieths of a point, as structured formats declare them
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageMarginsTwips {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

/// Layout metadata read directly from a structured document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StructuredPage {
    #[serde(default)]
    pub margins_twips: Option<PageMarginsTwips>,
    /// One declared size per paragraph, in half-points
    #[serde(default)]
    pub font_sizes_half_points: Vec<f64>,
    #[serde(default)]
    pub declared_font: Option<String>,
}

/// Layout assumed for sources with no measurable geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VirtualPage {
    #[serde(default)]
    pub font_size_px: Option<f64>,
    #[serde(default)]
    pub line_gap_px: Option<f64>,
    #[serde(default)]
    pub margin_mm: Option<f64>,
    #[serde(default)]
    pub aspect: Option<f64>,
}

/// Pipeline entry: one variant per source category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source")]
pub enum LayoutInput {
    Recognized(RecognizedPage),
    Structured(StructuredPage),
    Virtual(VirtualPage),
}

impl LayoutInput {
    pub fn source(&self) -> SourceKind {
        match self {
            LayoutInput::Recognized(_) => SourceKind::Recognized,
            LayoutInput::Structured(_) => SourceKind::Structured,
            LayoutInput::Virtual(_) => SourceKind::Virtual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_orders_corners() {
        let flipped = GlyphBox::new(20.0, 30.0, 10.0, 15.0, "a").normalized();
        assert_eq!((flipped.x0, flipped.y0, flipped.x1, flipped.y1), (10.0, 15.0, 20.0, 30.0));
    }

    #[test]
    fn test_aspect_handles_zero_height() {
        let flat = GlyphBox::new(0.0, 5.0, 8.0, 5.0, "-");
        assert_eq!(flat.aspect(), 8.0);
    }

    #[test]
    fn test_bottom_left_origin_is_flipped() {
        let surface = Surface {
            width: 600.0,
            height: 800.0,
            origin: CoordOrigin::BottomLeft,
        };
        let converted = surface.to_top_left(&GlyphBox::new(10.0, 700.0, 50.0, 714.0, "Title"));
        assert_eq!(converted.y0, 86.0);
        assert_eq!(converted.y1, 100.0);
        assert_eq!(converted.height(), 14.0);
    }

    #[test]
    fn test_surface_measurable() {
        assert!(Surface::new(600.0, 800.0).is_measurable());
        assert!(!Surface::new(f64::NAN, 800.0).is_measurable());
        assert!(!Surface::new(600.0, -1.0).is_measurable());
    }

    #[test]
    fn test_layout_input_tagged_json() {
        let json = r#"{"source":"Structured","font_sizes_half_points":[24,24]}"#;
        let input: LayoutInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.source(), SourceKind::Structured);

        let json = r#"{"source":"Recognized","boxes":[{"x0":1,"y0":2,"x1":3,"y1":4,"text":"a"}],
            "surface":{"width":100,"height":200}}"#;
        let input: LayoutInput = serde_json::from_str(json).unwrap();
        match input {
            LayoutInput::Recognized(page) => {
                assert_eq!(page.boxes.len(), 1);
                assert_eq!(page.surface.origin, CoordOrigin::TopLeft);
            }
            other => panic!("unexpected input {:?}", other),
        }
    }

    #[test]
    fn test_vector_lengths() {
        assert_eq!(SourceKind::Recognized.vector_len(), 6);
        assert_eq!(SourceKind::Structured.vector_len(), 5);
        assert_eq!(SourceKind::Virtual.vector_len(), 3);
    }
}
