use serde::{Deserialize, Serialize};
use std::path::Path;
use anyhow::{Result, anyhow};

/// Tunable policy for the whole pipeline. Every heuristic constant lives here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct FontPrintConfig {
    pub extraction: ExtractionConfig,
    pub classifier: ClassifierConfig,
    pub normalization: NormalizationConfig,
    pub similarity: SimilarityConfig,
    pub virtual_defaults: VirtualDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionConfig {
    /// A box center further than this from the previous accepted line starts a new line
    pub line_merge_threshold_px: f64,

    /// Line gaps at or below this are treated as duplicate-line artifacts
    pub min_line_gap_px: f64,

    /// Resolution the recognizer rendered the page at, used for px -> mm
    pub recognition_dpi: f64,

    /// Boxes with a reported confidence below this are ignored
    pub min_confidence: f64,

    /// Maximum number of per-character glyph signatures kept
    pub glyph_signature_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Aspect below which glyphs lean serif
    pub serif_pivot: f64,

    /// Aspect above which glyphs lean sans
    pub sans_pivot: f64,

    /// Multiplier applied to the sans score
    pub sans_penalty: f64,

    /// Fixed monospace score
    pub mono_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Decimal places kept in the canonical vector
    pub decimals: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Maximum number of shared candidate names reported
    pub overlap_limit: usize,

    /// Decimal places kept in scalar deltas
    pub delta_decimals: u32,
}

/// Layout assumed for virtual sources when the caller leaves fields out
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VirtualDefaults {
    pub font_size_px: f64,
    pub line_gap_px: f64,
    pub margin_mm: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            line_merge_threshold_px: 4.0,
            min_line_gap_px: 1.0,
            recognition_dpi: 300.0,
            min_confidence: 0.0,
            glyph_signature_limit: 8,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            serif_pivot: 1.1,
            sans_pivot: 0.9,
            sans_penalty: 0.9,
            mono_score: 0.1,
        }
    }
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self { decimals: 1 }
    }
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            overlap_limit: 3,
            delta_decimals: 1,
        }
    }
}

impl Default for VirtualDefaults {
    fn default() -> Self {
        Self {
            font_size_px: 16.0,
            line_gap_px: 6.0,
            margin_mm: 25.4,
        }
    }
}

impl FontPrintConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow!("Failed to read config file: {}", e))?;

        let config: FontPrintConfig = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    pub fn load_from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Override individual constants from `FONTPRINT_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        if let Some(value) = env_f64("FONTPRINT_LINE_THRESHOLD_PX") {
            self.extraction.line_merge_threshold_px = value;
        }

        if let Some(value) = env_f64("FONTPRINT_RECOGNITION_DPI") {
            self.extraction.recognition_dpi = value;
        }

        if let Some(value) = env_f64("FONTPRINT_SANS_PENALTY") {
            self.classifier.sans_penalty = value;
        }

        if let Some(value) = env_f64("FONTPRINT_MONO_SCORE") {
            self.classifier.mono_score = value;
        }

        if let Ok(decimals) = std::env::var("FONTPRINT_DECIMALS") {
            if let Ok(value) = decimals.parse::<u32>() {
                self.normalization.decimals = value;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.extraction.recognition_dpi.is_finite() && self.extraction.recognition_dpi > 0.0) {
            return Err(anyhow!(
                "recognition_dpi must be positive, got {}",
                self.extraction.recognition_dpi
            ));
        }
        if self.extraction.line_merge_threshold_px < 0.0 {
            return Err(anyhow!("line_merge_threshold_px must not be negative"));
        }
        if self.normalization.decimals > 6 {
            return Err(anyhow!(
                "normalization.decimals above 6 defeats quantization (got {})",
                self.normalization.decimals
            ));
        }
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| anyhow!("Failed to write config file: {}", e))?;

        Ok(())
    }
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<f64>().ok())
        .filter(|value| value.is_finite())
}
