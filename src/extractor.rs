use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::FontPrintConfig;
use crate::error::FontPrintResult;
use crate::layout::{GlyphBox, LayoutInput, RecognizedPage, SourceKind, StructuredPage, VirtualPage};
use crate::stats::{cluster_lines, diffs, finite_or_zero, median, round_to};

/// Structured formats declare lengths in twentieths of a point
pub const TWIPS_PER_POINT: f64 = 20.0;
pub const MM_PER_POINT: f64 = 0.3528;
pub const MM_PER_INCH: f64 = 25.4;

/// CSS reference pixels: 96 per inch, 72 points per inch
pub fn points_to_px(points: f64) -> f64 {
    points * 96.0 / 72.0
}

/// Scalar layout metrics measured from glyph boxes, in surface pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawMetrics {
    pub font_size_px: f64,
    pub line_gap_px: f64,
    pub left_margin_px: f64,
    pub right_margin_px: f64,
    pub top_margin_px: f64,
    pub bottom_margin_px: f64,
    pub aspect: f64,
}

impl RawMetrics {
    /// Replace non-finite fields with `0` (or `1.0` for aspect, which must stay positive)
    pub fn sanitized(self, warnings: &mut Vec<LayoutWarning>) -> Self {
        let mut check = |field: &str, value: f64| {
            if value.is_finite() {
                value
            } else {
                warnings.push(LayoutWarning::NonFiniteMetric {
                    field: field.to_string(),
                });
                finite_or_zero(value)
            }
        };

        let font_size_px = check("font_size_px", self.font_size_px);
        let line_gap_px = check("line_gap_px", self.line_gap_px);
        let left_margin_px = check("left_margin_px", self.left_margin_px);
        let right_margin_px = check("right_margin_px", self.right_margin_px);
        let top_margin_px = check("top_margin_px", self.top_margin_px);
        let bottom_margin_px = check("bottom_margin_px", self.bottom_margin_px);

        let aspect = if self.aspect.is_finite() && self.aspect > 0.0 {
            self.aspect
        } else {
            warnings.push(LayoutWarning::NonFiniteMetric {
                field: "aspect".to_string(),
            });
            1.0
        };

        Self {
            font_size_px,
            line_gap_px,
            left_margin_px,
            right_margin_px,
            top_margin_px,
            bottom_margin_px,
            aspect,
        }
    }
}

/// Page margins in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Margins {
    pub fn uniform(value: f64) -> Self {
        Self {
            left: value,
            right: value,
            top: value,
            bottom: value,
        }
    }

    fn map(self, mut f: impl FnMut(f64) -> f64) -> Self {
        Self {
            left: f(self.left),
            right: f(self.right),
            top: f(self.top),
            bottom: f(self.bottom),
        }
    }
}

/// Median shape of one frequently recognized character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlyphSignature {
    pub glyph: String,
    pub count: usize,
    pub aspect: f64,
}

/// Non-fatal conditions met while measuring. Recorded on the print, never raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum LayoutWarning {
    EmptyInput,
    NonFiniteMetric { field: String },
    DimensionMismatch { left: usize, right: usize },
    DiscardedBoxes { count: usize, reason: String },
}

/// Per-source measurement. `NoLayoutData` is the empty-input sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Recognized {
        metrics: RawMetrics,
        margin_mm: Margins,
        glyph_signatures: Vec<GlyphSignature>,
        box_count: usize,
        gap_samples: usize,
    },
    Structured {
        font_size_pt: f64,
        margin_mm: Option<Margins>,
        declared_font: Option<String>,
    },
    Virtual {
        font_size_px: f64,
        line_gap_px: f64,
        margin_mm: f64,
        aspect: Option<f64>,
    },
    NoLayoutData {
        source: SourceKind,
    },
}

impl Extraction {
    pub fn source(&self) -> SourceKind {
        match self {
            Extraction::Recognized { .. } => SourceKind::Recognized,
            Extraction::Structured { .. } => SourceKind::Structured,
            Extraction::Virtual { .. } => SourceKind::Virtual,
            Extraction::NoLayoutData { source } => *source,
        }
    }

    pub fn has_layout(&self) -> bool {
        !matches!(self, Extraction::NoLayoutData { .. })
    }

    /// Scalar fields in the source's fixed vector order. Reordering breaks
    /// hash stability with previously stored prints.
    pub fn vector_fields(&self) -> Vec<f64> {
        match self {
            Extraction::Recognized { metrics, .. } => vec![
                metrics.font_size_px,
                metrics.line_gap_px,
                metrics.left_margin_px,
                metrics.right_margin_px,
                metrics.top_margin_px,
                metrics.bottom_margin_px,
            ],
            Extraction::Structured {
                font_size_pt,
                margin_mm,
                ..
            } => {
                let margins = margin_mm.unwrap_or(Margins::uniform(0.0));
                vec![
                    *font_size_pt,
                    margins.left,
                    margins.right,
                    margins.top,
                    margins.bottom,
                ]
            }
            Extraction::Virtual {
                font_size_px,
                line_gap_px,
                margin_mm,
                ..
            } => vec![*font_size_px, *line_gap_px, *margin_mm],
            Extraction::NoLayoutData { source } => vec![0.0; source.vector_len()],
        }
    }

    pub fn aspect(&self) -> Option<f64> {
        match self {
            Extraction::Recognized { metrics, .. } => Some(metrics.aspect),
            Extraction::Virtual { aspect, .. } => *aspect,
            _ => None,
        }
    }

    pub fn font_size_px(&self) -> Option<f64> {
        match self {
            Extraction::Recognized { metrics, .. } => Some(metrics.font_size_px),
            Extraction::Structured { font_size_pt, .. } => Some(points_to_px(*font_size_pt)),
            Extraction::Virtual { font_size_px, .. } => Some(*font_size_px),
            Extraction::NoLayoutData { .. } => None,
        }
    }

    /// `None` when no line spacing could be measured (single line, structured source)
    pub fn line_gap_px(&self) -> Option<f64> {
        match self {
            Extraction::Recognized {
                metrics,
                gap_samples,
                ..
            } if *gap_samples > 0 => Some(metrics.line_gap_px),
            Extraction::Virtual { line_gap_px, .. } => Some(*line_gap_px),
            _ => None,
        }
    }

    pub fn margin_mm(&self) -> Option<Margins> {
        match self {
            Extraction::Recognized { margin_mm, .. } => Some(*margin_mm),
            Extraction::Structured { margin_mm, .. } => *margin_mm,
            Extraction::Virtual { margin_mm, .. } => Some(Margins::uniform(*margin_mm)),
            Extraction::NoLayoutData { .. } => None,
        }
    }

    pub fn glyph_signatures(&self) -> &[GlyphSignature] {
        match self {
            Extraction::Recognized {
                glyph_signatures, ..
            } => glyph_signatures,
            _ => &[],
        }
    }
}

/// Extraction result plus the non-fatal conditions met on the way
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub extraction: Extraction,
    pub warnings: Vec<LayoutWarning>,
}

impl Extracted {
    fn empty(source: SourceKind, mut warnings: Vec<LayoutWarning>) -> Self {
        warn!("No layout data for {} source, degrading to empty fingerprint", source);
        warnings.push(LayoutWarning::EmptyInput);
        Self {
            extraction: Extraction::NoLayoutData { source },
            warnings,
        }
    }
}

/// Anything that can be reduced to layout metrics
pub trait MetricSource {
    fn source(&self) -> SourceKind;

    fn extract(&self, config: &FontPrintConfig) -> FontPrintResult<Extracted>;
}

impl MetricSource for RecognizedPage {
    fn source(&self) -> SourceKind {
        SourceKind::Recognized
    }

    fn extract(&self, config: &FontPrintConfig) -> FontPrintResult<Extracted> {
        let cfg = &config.extraction;
        let mut warnings = Vec::new();
        if !self.surface.is_measurable() {
            warn!(
                "Surface {}x{} is not measurable, margins against it fall back to 0",
                self.surface.width, self.surface.height
            );
        }

        let mut low_confidence = 0;
        let mut non_finite = 0;
        let boxes: Vec<_> = self
            .boxes
            .iter()
            .filter(|glyph| {
                let keep = glyph.confidence.map_or(true, |c| c >= cfg.min_confidence);
                if !keep {
                    low_confidence += 1;
                }
                keep
            })
            .map(|glyph| self.surface.to_top_left(glyph))
            .filter(|glyph| {
                let finite = [glyph.x0, glyph.y0, glyph.x1, glyph.y1]
                    .iter()
                    .all(|v| v.is_finite());
                if !finite {
                    non_finite += 1;
                }
                finite
            })
            .collect();

        if low_confidence > 0 {
            warnings.push(LayoutWarning::DiscardedBoxes {
                count: low_confidence,
                reason: format!("confidence below {}", cfg.min_confidence),
            });
        }
        if non_finite > 0 {
            warnings.push(LayoutWarning::DiscardedBoxes {
                count: non_finite,
                reason: "non-finite coordinates".to_string(),
            });
        }

        if boxes.is_empty() {
            return Ok(Extracted::empty(SourceKind::Recognized, warnings));
        }

        let heights: Vec<f64> = boxes.iter().map(|b| b.height()).collect();
        let font_size_px = median(&heights);

        let centers: Vec<f64> = boxes.iter().map(|b| b.center_y()).collect();
        let lines = cluster_lines(&centers, cfg.line_merge_threshold_px);
        let gaps: Vec<f64> = diffs(&lines)
            .into_iter()
            .filter(|gap| *gap > cfg.min_line_gap_px)
            .collect();
        let line_gap_px = median(&gaps);

        let min_x0 = boxes.iter().map(|b| b.x0).fold(f64::INFINITY, f64::min);
        let max_x1 = boxes.iter().map(|b| b.x1).fold(f64::NEG_INFINITY, f64::max);
        let min_y0 = boxes.iter().map(|b| b.y0).fold(f64::INFINITY, f64::min);
        let max_y1 = boxes.iter().map(|b| b.y1).fold(f64::NEG_INFINITY, f64::max);

        let aspects: Vec<f64> = boxes.iter().map(|b| b.aspect()).collect();

        // Boxes spilling past the surface edge count as a zero margin. A
        // non-finite edge stays non-finite here so sanitizing records it.
        let clamp = |margin: f64| if margin.is_finite() { margin.max(0.0) } else { margin };
        let metrics = RawMetrics {
            font_size_px,
            line_gap_px,
            left_margin_px: clamp(min_x0),
            right_margin_px: clamp(self.surface.width - max_x1),
            top_margin_px: clamp(min_y0),
            bottom_margin_px: clamp(self.surface.height - max_y1),
            aspect: median(&aspects),
        }
        .sanitized(&mut warnings);

        let px_to_mm = MM_PER_INCH / cfg.recognition_dpi;
        let margin_mm = Margins {
            left: metrics.left_margin_px,
            right: metrics.right_margin_px,
            top: metrics.top_margin_px,
            bottom: metrics.bottom_margin_px,
        }
        .map(|px| finite_or_zero(px * px_to_mm));

        debug!(
            "Measured {} boxes: font {:.2}px, {} lines, gap {:.2}px, aspect {:.3}",
            boxes.len(),
            metrics.font_size_px,
            lines.len(),
            metrics.line_gap_px,
            metrics.aspect
        );

        Ok(Extracted {
            extraction: Extraction::Recognized {
                metrics,
                margin_mm,
                glyph_signatures: glyph_signatures(&boxes, cfg.glyph_signature_limit),
                box_count: boxes.len(),
                gap_samples: gaps.len(),
            },
            warnings,
        })
    }
}

impl MetricSource for StructuredPage {
    fn source(&self) -> SourceKind {
        SourceKind::Structured
    }

    fn extract(&self, _config: &FontPrintConfig) -> FontPrintResult<Extracted> {
        let mut warnings = Vec::new();
        let sizes: Vec<f64> = self
            .font_sizes_half_points
            .iter()
            .copied()
            .filter(|size| size.is_finite() && *size > 0.0)
            .collect();

        let discarded = self.font_sizes_half_points.len() - sizes.len();
        if discarded > 0 {
            warnings.push(LayoutWarning::DiscardedBoxes {
                count: discarded,
                reason: "non-positive or non-finite font size".to_string(),
            });
        }

        if sizes.is_empty() {
            return Ok(Extracted::empty(SourceKind::Structured, warnings));
        }

        let avg_half_points = sizes.iter().sum::<f64>() / sizes.len() as f64;
        let font_size_pt = avg_half_points / 2.0;

        let margin_mm = self.margins_twips.map(|twips| {
            Margins {
                left: twips.left,
                right: twips.right,
                top: twips.top,
                bottom: twips.bottom,
            }
            .map(|value| {
                let mm = value / TWIPS_PER_POINT * MM_PER_POINT;
                if !mm.is_finite() {
                    warnings.push(LayoutWarning::NonFiniteMetric {
                        field: "margin_mm".to_string(),
                    });
                }
                finite_or_zero(mm)
            })
        });

        debug!(
            "Structured layout: {} paragraphs, {:.2}pt, margins {:?}",
            sizes.len(),
            font_size_pt,
            margin_mm
        );

        Ok(Extracted {
            extraction: Extraction::Structured {
                font_size_pt,
                margin_mm,
                declared_font: self.declared_font.clone(),
            },
            warnings,
        })
    }
}

impl MetricSource for VirtualPage {
    fn source(&self) -> SourceKind {
        SourceKind::Virtual
    }

    fn extract(&self, config: &FontPrintConfig) -> FontPrintResult<Extracted> {
        let defaults = &config.virtual_defaults;
        let mut warnings = Vec::new();
        let mut pick = |field: &str, value: Option<f64>, fallback: f64| match value {
            Some(v) if v.is_finite() => v,
            Some(_) => {
                warnings.push(LayoutWarning::NonFiniteMetric {
                    field: field.to_string(),
                });
                finite_or_zero(fallback)
            }
            None => finite_or_zero(fallback),
        };

        let font_size_px = pick("font_size_px", self.font_size_px, defaults.font_size_px);
        let line_gap_px = pick("line_gap_px", self.line_gap_px, defaults.line_gap_px);
        let margin_mm = pick("margin_mm", self.margin_mm, defaults.margin_mm);
        let aspect = self.aspect.filter(|a| a.is_finite() && *a > 0.0);

        Ok(Extracted {
            extraction: Extraction::Virtual {
                font_size_px,
                line_gap_px,
                margin_mm,
                aspect,
            },
            warnings,
        })
    }
}

impl LayoutInput {
    pub fn as_metric_source(&self) -> &dyn MetricSource {
        match self {
            LayoutInput::Recognized(page) => page,
            LayoutInput::Structured(page) => page,
            LayoutInput::Virtual(page) => page,
        }
    }
}

/// Median aspect of the most frequent single-character boxes
fn glyph_signatures(boxes: &[GlyphBox], limit: usize) -> Vec<GlyphSignature> {
    let mut by_glyph: BTreeMap<char, Vec<f64>> = BTreeMap::new();
    for glyph in boxes {
        let mut chars = glyph.text.trim().chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            by_glyph.entry(c).or_default().push(glyph.aspect());
        }
    }

    let mut signatures: Vec<GlyphSignature> = by_glyph
        .into_iter()
        .map(|(c, aspects)| GlyphSignature {
            glyph: c.to_string(),
            count: aspects.len(),
            aspect: round_to(median(&aspects), 3),
        })
        .collect();

    // BTreeMap order already sorts by glyph; stable sort keeps that on count ties
    signatures.sort_by(|a, b| b.count.cmp(&a.count));
    signatures.truncate(limit);
    signatures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{GlyphBox, PageMarginsTwips, Surface};

    fn page(boxes: Vec<GlyphBox>) -> RecognizedPage {
        RecognizedPage {
            boxes,
            surface: Surface::new(1000.0, 1400.0),
        }
    }

    fn recognized(extracted: &Extracted) -> (RawMetrics, usize) {
        match &extracted.extraction {
            Extraction::Recognized {
                metrics, box_count, ..
            } => (*metrics, *box_count),
            other => panic!("expected recognized extraction, got {:?}", other),
        }
    }

    #[test]
    fn test_font_size_ignores_heading_outlier() {
        let heights = [14.0, 14.0, 15.0, 14.0, 30.0];
        let boxes = heights
            .iter()
            .enumerate()
            .map(|(i, h)| GlyphBox::new(100.0, 100.0 + i as f64 * 40.0, 160.0, 100.0 + i as f64 * 40.0 + h, "word"))
            .collect();

        let extracted = page(boxes).extract(&FontPrintConfig::default()).unwrap();
        let (metrics, box_count) = recognized(&extracted);
        assert_eq!(metrics.font_size_px, 14.0);
        assert_eq!(box_count, 5);
    }

    #[test]
    fn test_line_gap_and_margins() {
        // Three lines 40px apart, two words each with a little vertical jitter
        let boxes = vec![
            GlyphBox::new(30.0, 93.0, 200.0, 107.0, "The"),
            GlyphBox::new(210.0, 94.0, 970.0, 108.0, "quick"),
            GlyphBox::new(30.0, 133.0, 400.0, 147.0, "brown"),
            GlyphBox::new(410.0, 135.0, 900.0, 149.0, "fox"),
            GlyphBox::new(30.0, 173.0, 500.0, 187.0, "jumps"),
            GlyphBox::new(510.0, 174.0, 700.0, 188.0, "over"),
        ];

        let extracted = page(boxes).extract(&FontPrintConfig::default()).unwrap();
        let (metrics, _) = recognized(&extracted);
        assert_eq!(metrics.font_size_px, 14.0);
        assert_eq!(metrics.line_gap_px, 40.0);
        assert_eq!(metrics.left_margin_px, 30.0);
        assert_eq!(metrics.right_margin_px, 30.0);
        assert_eq!(metrics.top_margin_px, 93.0);
        assert_eq!(metrics.bottom_margin_px, 1400.0 - 188.0);
        assert_eq!(extracted.extraction.line_gap_px(), Some(40.0));
        assert!(extracted.warnings.is_empty());
    }

    #[test]
    fn test_margin_mm_uses_dpi() {
        let boxes = vec![GlyphBox::new(300.0, 300.0, 700.0, 330.0, "only")];
        let extracted = page(boxes).extract(&FontPrintConfig::default()).unwrap();
        let margins = extracted.extraction.margin_mm().unwrap();
        assert!((margins.left - 25.4).abs() < 1e-9);
        assert!((margins.top - 25.4).abs() < 1e-9);
        // one line only: no spacing measured
        assert_eq!(extracted.extraction.line_gap_px(), None);
    }

    #[test]
    fn test_empty_boxes_yield_no_layout_data() {
        let extracted = page(vec![]).extract(&FontPrintConfig::default()).unwrap();
        assert_eq!(
            extracted.extraction,
            Extraction::NoLayoutData {
                source: SourceKind::Recognized
            }
        );
        assert_eq!(extracted.warnings, vec![LayoutWarning::EmptyInput]);
        assert_eq!(extracted.extraction.vector_fields(), vec![0.0; 6]);
        assert_eq!(extracted.extraction.font_size_px(), None);
        assert_eq!(extracted.extraction.margin_mm(), None);
    }

    #[test]
    fn test_low_confidence_boxes_dropped() {
        let mut config = FontPrintConfig::default();
        config.extraction.min_confidence = 0.5;
        let boxes = vec![
            GlyphBox::new(10.0, 10.0, 20.0, 24.0, "a").with_confidence(0.2),
            GlyphBox::new(10.0, 50.0, 20.0, 62.0, "b"),
        ];

        let extracted = page(boxes).extract(&config).unwrap();
        let (metrics, box_count) = recognized(&extracted);
        assert_eq!(box_count, 1);
        assert_eq!(metrics.font_size_px, 12.0);
        assert!(matches!(
            extracted.warnings[0],
            LayoutWarning::DiscardedBoxes { count: 1, .. }
        ));
    }

    #[test]
    fn test_glyph_signatures_ranked_by_frequency() {
        let boxes = vec![
            GlyphBox::new(0.0, 0.0, 9.0, 9.0, "e"),
            GlyphBox::new(10.0, 0.0, 19.0, 9.0, "e"),
            GlyphBox::new(20.0, 0.0, 24.0, 9.0, "l"),
            GlyphBox::new(30.0, 0.0, 39.0, 9.0, "a"),
            GlyphBox::new(40.0, 0.0, 90.0, 9.0, "word"),
        ];

        let mut config = FontPrintConfig::default();
        config.extraction.glyph_signature_limit = 2;
        let extracted = page(boxes).extract(&config).unwrap();
        let signatures = extracted.extraction.glyph_signatures();
        assert_eq!(signatures.len(), 2);
        assert_eq!(signatures[0].glyph, "e");
        assert_eq!(signatures[0].count, 2);
        assert_eq!(signatures[0].aspect, 0.9);
        assert_eq!(signatures[1].glyph, "a");
    }

    #[test]
    fn test_structured_unit_conversion() {
        let structured = StructuredPage {
            margins_twips: Some(PageMarginsTwips {
                left: 1440.0,
                right: 1440.0,
                top: 720.0,
                bottom: 720.0,
            }),
            font_sizes_half_points: vec![24.0, 24.0, 22.0, 26.0],
            declared_font: Some("Calibri".to_string()),
        };

        let extracted = structured.extract(&FontPrintConfig::default()).unwrap();
        let fields = extracted.extraction.vector_fields();
        assert_eq!(fields[0], 12.0);
        assert!((fields[1] - 25.4016).abs() < 1e-9);
        assert!((fields[3] - 12.7008).abs() < 1e-9);
        assert_eq!(extracted.extraction.font_size_px(), Some(16.0));
        assert_eq!(extracted.extraction.line_gap_px(), None);
        assert_eq!(extracted.extraction.aspect(), None);
    }

    #[test]
    fn test_structured_without_paragraphs_is_empty() {
        let extracted = StructuredPage::default()
            .extract(&FontPrintConfig::default())
            .unwrap();
        assert!(!extracted.extraction.has_layout());
        assert_eq!(extracted.extraction.vector_fields(), vec![0.0; 5]);
    }

    #[test]
    fn test_virtual_uses_defaults() {
        let virtual_page = VirtualPage {
            font_size_px: Some(18.0),
            ..VirtualPage::default()
        };
        let extracted = virtual_page.extract(&FontPrintConfig::default()).unwrap();
        assert_eq!(extracted.extraction.vector_fields(), vec![18.0, 6.0, 25.4]);
    }

    #[test]
    fn test_bottom_left_origin_on_unbounded_surface_discards_boxes() {
        let flipped = RecognizedPage {
            boxes: vec![GlyphBox::new(30.0, 100.0, 200.0, 114.0, "word")],
            surface: Surface {
                width: 1000.0,
                height: f64::INFINITY,
                origin: crate::layout::CoordOrigin::BottomLeft,
            },
        };

        let extracted = flipped.extract(&FontPrintConfig::default()).unwrap();
        assert!(!extracted.extraction.has_layout());
        assert!(matches!(
            extracted.warnings[0],
            LayoutWarning::DiscardedBoxes { count: 1, .. }
        ));
        assert_eq!(extracted.warnings.last(), Some(&LayoutWarning::EmptyInput));
    }

    #[test]
    fn test_sanitize_replaces_non_finite() {
        let mut warnings = Vec::new();
        let metrics = RawMetrics {
            font_size_px: f64::NAN,
            line_gap_px: 3.0,
            left_margin_px: f64::INFINITY,
            right_margin_px: 1.0,
            top_margin_px: 1.0,
            bottom_margin_px: 1.0,
            aspect: 0.0,
        }
        .sanitized(&mut warnings);

        assert_eq!(metrics.font_size_px, 0.0);
        assert_eq!(metrics.left_margin_px, 0.0);
        assert_eq!(metrics.aspect, 1.0);
        assert_eq!(warnings.len(), 3);
    }
}
