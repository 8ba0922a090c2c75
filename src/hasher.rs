//! Content identity for fingerprints.
//!
//! The hash covers the source category, the canonical vector and the top
//! three font candidates, serialized as JSON with a fixed field order and
//! digested with BLAKE3 (256-bit, lowercase hex). It identifies a print for
//! deduplication; it is not a secret and carries no confidentiality.

use serde::Serialize;
use tracing::debug;

use crate::classifier::FontCandidate;
use crate::error::{FontPrintError, FontPrintResult};
use crate::layout::SourceKind;

/// Number of font candidates that take part in the identity
pub const HASHED_CANDIDATES: usize = 3;

#[derive(Serialize)]
struct CanonicalCandidate<'a> {
    name: &'a str,
    score: f64,
}

/// Field order here is the canonical key order
#[derive(Serialize)]
struct CanonicalPrint<'a> {
    source: SourceKind,
    vector: &'a [f64],
    candidates: Vec<CanonicalCandidate<'a>>,
}

/// Deterministic serialization of the hashed triple
pub fn canonical_json(
    source: SourceKind,
    vector: &[f64],
    candidates: &[FontCandidate],
) -> FontPrintResult<String> {
    let canonical = CanonicalPrint {
        source,
        vector,
        candidates: candidates
            .iter()
            .take(HASHED_CANDIDATES)
            .map(|c| CanonicalCandidate {
                name: &c.name,
                score: c.score,
            })
            .collect(),
    };

    serde_json::to_string(&canonical)
        .map_err(|e| FontPrintError::hashing_unavailable(format!("canonical serialization failed: {}", e)))
}

/// Hex-encoded BLAKE3 digest of the canonical triple
pub fn fingerprint_hash(
    source: SourceKind,
    vector: &[f64],
    candidates: &[FontCandidate],
) -> FontPrintResult<String> {
    let canonical = canonical_json(source, vector, candidates)?;
    let hash = blake3::hash(canonical.as_bytes()).to_hex().to_string();
    debug!("Hashed {} -> {}", canonical, hash);
    Ok(hash)
}
