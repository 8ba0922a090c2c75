use serde::{Deserialize, Serialize};

use crate::config::ClassifierConfig;

pub const SERIF_LIKE: &str = "Serif-like";
pub const SANS_LIKE: &str = "Sans-like";
pub const MONO_LIKE: &str = "Mono-like";

/// Declaration order, used to break score ties
pub const STYLE_ORDER: [&str; 3] = [SERIF_LIKE, SANS_LIKE, MONO_LIKE];

/// A coarse font-style guess. Never a font identification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontCandidate {
    pub name: String,
    pub score: f64,
}

impl FontCandidate {
    fn new(name: &str, score: f64) -> Self {
        Self {
            name: name.to_string(),
            score,
        }
    }
}

/// Rank style candidates from the median glyph aspect ratio.
///
/// Narrow glyphs lean serif, wide glyphs lean sans. Between the two pivots
/// both raw scores are small and split the normalized weight almost evenly.
/// Only when the pivots meet do both raw scores reach zero, leaving the
/// fixed mono score alone above a zero/zero tie.
pub fn classify(aspect: f64, config: &ClassifierConfig) -> Vec<FontCandidate> {
    let serif_score = (config.serif_pivot - aspect).clamp(0.0, 1.0);
    let sans_score = (aspect - config.sans_pivot).clamp(0.0, 1.0);

    let mut norm = serif_score + sans_score;
    if norm == 0.0 || !norm.is_finite() {
        norm = 1.0;
    }

    let mut candidates = vec![
        FontCandidate::new(SERIF_LIKE, finite(serif_score / norm)),
        FontCandidate::new(SANS_LIKE, finite(sans_score / norm * config.sans_penalty)),
        FontCandidate::new(MONO_LIKE, config.mono_score),
    ];

    // stable: ties keep Serif, Sans, Mono order
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates
}

/// Position in [`STYLE_ORDER`]; unknown names sort after the known styles
pub fn style_rank(name: &str) -> usize {
    STYLE_ORDER
        .iter()
        .position(|style| *style == name)
        .unwrap_or(STYLE_ORDER.len())
}

fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
