use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, warn};

use crate::config::SimilarityConfig;
use crate::extractor::LayoutWarning;
use crate::fontprint::FontPrint;
use crate::hasher::HASHED_CANDIDATES;
use crate::stats::round_to;

const UNAVAILABLE: &str = "unavailable";

/// Scalar difference between two prints; absence is never reported as `0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delta {
    Value(f64),
    Unavailable,
}

impl Delta {
    pub fn between(left: Option<f64>, right: Option<f64>, decimals: u32) -> Self {
        match (left, right) {
            (Some(l), Some(r)) if l.is_finite() && r.is_finite() => Delta::Value(round_to(l - r, decimals)),
            _ => Delta::Unavailable,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Delta::Value(v) => Some(*v),
            Delta::Unavailable => None,
        }
    }
}

impl Serialize for Delta {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Delta::Value(v) => serializer.serialize_f64(*v),
            Delta::Unavailable => serializer.serialize_str(UNAVAILABLE),
        }
    }
}

impl<'de> Deserialize<'de> for Delta {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(v) => Ok(Delta::Value(v)),
            Raw::Text(s) if s == UNAVAILABLE => Ok(Delta::Unavailable),
            Raw::Text(s) => Err(serde::de::Error::custom(format!(
                "expected a number or \"{}\", got \"{}\"",
                UNAVAILABLE, s
            ))),
        }
    }
}

/// Result of comparing two prints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub similarity: f64,
    pub font_overlap: Vec<String>,
    pub font_size_delta: Delta,
    pub line_gap_delta: Delta,
    /// Non-fatal conditions met while comparing (vectors of different length)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<LayoutWarning>,
}

/// Cosine similarity after zero-padding the shorter vector.
///
/// A zero norm on either side yields `0`. The result is clamped to `[0, 1]`;
/// layout vectors are non-negative so the clamp only absorbs float drift.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        debug!("Zero-padding vectors of length {} and {}", a.len(), b.len());
    }
    let len = a.len().max(b.len());
    let component = |v: &[f64], i: usize| v.get(i).copied().filter(|x| x.is_finite()).unwrap_or(0.0);

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for i in 0..len {
        let x = component(a, i);
        let y = component(b, i);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

/// Candidate names present in both top-3 lists, in `left`'s order
pub fn font_overlap(left: &FontPrint, right: &FontPrint, limit: usize) -> Vec<String> {
    let right_names: Vec<&str> = right
        .features
        .font_candidates
        .iter()
        .take(HASHED_CANDIDATES)
        .map(|c| c.name.as_str())
        .collect();

    left.features
        .font_candidates
        .iter()
        .take(HASHED_CANDIDATES)
        .filter(|c| right_names.contains(&c.name.as_str()))
        .map(|c| c.name.clone())
        .take(limit)
        .collect()
}

/// Similarity score plus per-field diff report
pub fn compare(left: &FontPrint, right: &FontPrint, config: &SimilarityConfig) -> Comparison {
    let mut warnings = Vec::new();
    if left.vector.len() != right.vector.len() {
        warn!(
            "Comparing {} vector of length {} with {} vector of length {}, zero-padding",
            left.source,
            left.vector.len(),
            right.source,
            right.vector.len()
        );
        warnings.push(LayoutWarning::DimensionMismatch {
            left: left.vector.len(),
            right: right.vector.len(),
        });
    }

    let comparison = Comparison {
        similarity: cosine_similarity(&left.vector, &right.vector),
        font_overlap: font_overlap(left, right, config.overlap_limit),
        font_size_delta: Delta::between(
            left.features.avg_font_size_px,
            right.features.avg_font_size_px,
            config.delta_decimals,
        ),
        line_gap_delta: Delta::between(
            left.features.line_gap_px,
            right.features.line_gap_px,
            config.delta_decimals,
        ),
        warnings,
    };

    debug!(
        "Compared {} with {}: similarity {:.3}",
        left.id, right.id, comparison.similarity
    );
    comparison
}
