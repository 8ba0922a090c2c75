use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classifier::{classify, FontCandidate};
use crate::config::{FontPrintConfig, NormalizationConfig};
use crate::error::{FontPrintError, FontPrintResult};
use crate::extractor::{Extracted, Extraction, LayoutWarning, MetricSource};
use crate::hasher::fingerprint_hash;
use crate::layout::{LayoutInput, SourceKind};
use crate::normalizer::{
    build_features, build_vector, normalize_candidates, normalize_vector, FeatureVector, Features,
};
use crate::repository::FingerprintRepository;
use crate::stats::round_to;

/// Complete layout fingerprint for one document. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontPrint {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub source: SourceKind,
    pub features: Features,
    pub fingerprint_hash: String,
    pub vector: FeatureVector,
    #[serde(default)]
    pub extras: Map<String, Value>,
}

impl FontPrint {
    fn assemble(
        source: SourceKind,
        vector: FeatureVector,
        features: Features,
        extras: Map<String, Value>,
    ) -> FontPrintResult<Self> {
        let fingerprint_hash = fingerprint_hash(source, &vector, &features.font_candidates)?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            source,
            features,
            fingerprint_hash,
            vector,
            extras,
        })
    }

    /// Print from an already-measured vector; scalar features stay unavailable
    pub fn from_vector(
        source: SourceKind,
        vector: Vec<f64>,
        font_candidates: Vec<FontCandidate>,
        config: &NormalizationConfig,
    ) -> FontPrintResult<Self> {
        let vector = normalize_vector(&vector, config);
        let features = Features {
            font_candidates: normalize_candidates(font_candidates, config),
            avg_font_size_px: None,
            line_gap_px: None,
            margin_mm: None,
            glyph_signatures: Vec::new(),
        };
        let mut extras = Map::new();
        extras.insert("reliability".to_string(), json!(source.reliability()));
        Self::assemble(source, vector, features, extras)
    }

    /// Two prints describe the same layout when their content hashes match
    pub fn same_layout(&self, other: &FontPrint) -> bool {
        self.fingerprint_hash == other.fingerprint_hash
    }

    /// Whether any layout was measured at all
    pub fn has_layout_data(&self) -> bool {
        self.vector.iter().any(|v| *v != 0.0)
    }

    pub fn warnings(&self) -> Vec<LayoutWarning> {
        self.extras
            .get("warnings")
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    pub fn to_json_pretty(&self) -> FontPrintResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| FontPrintError::serialization(format!("fontprint {}", self.id), e))
    }

    pub fn from_json(json: &str) -> FontPrintResult<Self> {
        serde_json::from_str(json).map_err(|e| FontPrintError::serialization("fontprint", e))
    }
}

/// Extract -> classify / normalize -> hash pipeline
#[derive(Debug, Clone, Default)]
pub struct FontPrinter {
    config: FontPrintConfig,
}

impl FontPrinter {
    pub fn new(config: FontPrintConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FontPrintConfig {
        &self.config
    }

    pub fn fingerprint(&self, input: &LayoutInput) -> FontPrintResult<FontPrint> {
        self.fingerprint_source(input.as_metric_source())
    }

    pub fn fingerprint_source(&self, source: &dyn MetricSource) -> FontPrintResult<FontPrint> {
        let Extracted {
            extraction,
            warnings,
        } = source.extract(&self.config)?;
        debug!("Extracted {} layout (has data: {})", extraction.source(), extraction.has_layout());

        let candidates = extraction
            .aspect()
            .map(|aspect| classify(aspect, &self.config.classifier))
            .unwrap_or_default();

        let vector = build_vector(&extraction, &self.config.normalization);
        let features = build_features(&extraction, candidates, &self.config.normalization);
        let extras = extras_for(&extraction, &warnings);

        if !warnings.is_empty() {
            warn!("{} layout degraded: {:?}", extraction.source(), warnings);
        }

        let print = FontPrint::assemble(extraction.source(), vector, features, extras)?;
        info!(
            "FontPrint {} ({}) hash {}",
            print.id, print.source, print.fingerprint_hash
        );
        Ok(print)
    }

    /// Imported vector quantized with this printer's normalization
    pub fn from_vector(
        &self,
        source: SourceKind,
        vector: Vec<f64>,
        font_candidates: Vec<FontCandidate>,
    ) -> FontPrintResult<FontPrint> {
        FontPrint::from_vector(source, vector, font_candidates, &self.config.normalization)
    }

    /// Build a print and hand it to the injected repository
    pub fn fingerprint_into(
        &self,
        input: &LayoutInput,
        repository: &mut dyn FingerprintRepository,
    ) -> FontPrintResult<FontPrint> {
        let print = self.fingerprint(input)?;
        repository.append(print.clone())?;
        Ok(print)
    }
}

fn extras_for(extraction: &Extraction, warnings: &[LayoutWarning]) -> Map<String, Value> {
    let mut extras = Map::new();
    extras.insert("reliability".to_string(), json!(extraction.source().reliability()));

    if let Some(aspect) = extraction.aspect() {
        extras.insert("aspect".to_string(), json!(round_to(aspect, 3)));
    }

    match extraction {
        Extraction::Recognized {
            box_count,
            gap_samples,
            ..
        } => {
            extras.insert("box_count".to_string(), json!(box_count));
            extras.insert("line_gap_samples".to_string(), json!(gap_samples));
        }
        Extraction::Structured {
            declared_font: Some(font),
            ..
        } => {
            extras.insert("declared_font".to_string(), json!(font));
        }
        _ => {}
    }

    if !warnings.is_empty() {
        extras.insert(
            "warnings".to_string(),
            serde_json::to_value(warnings).unwrap_or(Value::Null),
        );
    }
    extras
}
