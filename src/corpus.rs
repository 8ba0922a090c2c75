use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::SimilarityConfig;
use crate::fontprint::FontPrint;
use crate::similarity::{compare, Comparison};

/// One stored print ranked against a probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusMatch {
    pub id: String,
    pub fingerprint_hash: String,
    pub comparison: Comparison,
}

/// Rank `corpus` by similarity to `probe`, best first.
///
/// Each comparison is independent, so the corpus is scanned in parallel.
/// Ties are broken by id to keep the ranking reproducible.
pub fn nearest_matches(
    probe: &FontPrint,
    corpus: &[FontPrint],
    limit: usize,
    config: &SimilarityConfig,
) -> Vec<CorpusMatch> {
    let mut matches: Vec<CorpusMatch> = corpus
        .par_iter()
        .filter(|candidate| candidate.id != probe.id)
        .map(|candidate| CorpusMatch {
            id: candidate.id.clone(),
            fingerprint_hash: candidate.fingerprint_hash.clone(),
            comparison: compare(probe, candidate, config),
        })
        .collect();

    matches.sort_by(|a, b| {
        b.comparison
            .similarity
            .total_cmp(&a.comparison.similarity)
            .then_with(|| a.id.cmp(&b.id))
    });
    matches.truncate(limit);

    info!(
        "Ranked {} stored prints against {}, kept {}",
        corpus.len(),
        probe.id,
        matches.len()
    );
    matches
}
