use serde::{Deserialize, Serialize};

use crate::classifier::{style_rank, FontCandidate};
use crate::config::NormalizationConfig;
use crate::extractor::{Extraction, GlyphSignature, Margins};
use crate::layout::SourceKind;
use crate::stats::round_to;

/// Fixed-order, fixed-precision layout vector
pub type FeatureVector = Vec<f64>;

/// Structured feature record stored on every print
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Features {
    pub font_candidates: Vec<FontCandidate>,
    pub avg_font_size_px: Option<f64>,
    pub line_gap_px: Option<f64>,
    pub margin_mm: Option<Margins>,
    #[serde(default)]
    pub glyph_signatures: Vec<GlyphSignature>,
}

/// Round each field and zero anything non-finite. Idempotent.
pub fn normalize_vector(fields: &[f64], config: &NormalizationConfig) -> FeatureVector {
    fields.iter().map(|v| round_to(*v, config.decimals)).collect()
}

/// Quantize candidate scores like the vector and re-rank them.
///
/// Raw scores move with sub-pixel glyph noise; the rounded ones are what the
/// hash sees. Ties fall back to declaration order, never to raw order.
pub fn normalize_candidates(
    candidates: Vec<FontCandidate>,
    config: &NormalizationConfig,
) -> Vec<FontCandidate> {
    let mut candidates: Vec<FontCandidate> = candidates
        .into_iter()
        .map(|c| FontCandidate {
            score: round_to(c.score, config.decimals),
            name: c.name,
        })
        .collect();
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| style_rank(&a.name).cmp(&style_rank(&b.name)))
    });
    candidates
}

/// Canonical vector for an extraction; always the source's fixed length
pub fn build_vector(extraction: &Extraction, config: &NormalizationConfig) -> FeatureVector {
    let mut vector = normalize_vector(&extraction.vector_fields(), config);
    vector.resize(extraction.source().vector_len(), 0.0);
    vector
}

/// Feature record with the same quantization applied to its scalars
pub fn build_features(
    extraction: &Extraction,
    font_candidates: Vec<FontCandidate>,
    config: &NormalizationConfig,
) -> Features {
    let round = |v: f64| round_to(v, config.decimals);
    Features {
        font_candidates: normalize_candidates(font_candidates, config),
        avg_font_size_px: extraction.font_size_px().map(round),
        line_gap_px: extraction.line_gap_px().map(round),
        margin_mm: extraction.margin_mm().map(|m| Margins {
            left: round(m.left),
            right: round(m.right),
            top: round(m.top),
            bottom: round(m.bottom),
        }),
        glyph_signatures: extraction.glyph_signatures().to_vec(),
    }
}

/// Zero vector for a source with no measurable layout
pub fn empty_vector(source: SourceKind) -> FeatureVector {
    vec![0.0; source.vector_len()]
}
