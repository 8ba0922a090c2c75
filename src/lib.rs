//! Reproducible typographic layout fingerprints.
//!
//! A [`FontPrint`] reduces a page's glyph boxes (or declared layout metadata)
//! to a short quantized vector, a coarse font-style guess and a content hash,
//! and [`similarity::compare`] scores two prints against each other.
//!
//! ```text
//! LayoutInput -> extractor -> classifier / normalizer -> hasher -> FontPrint
//! ```

pub mod classifier;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod error;
pub mod extractor;
pub mod fontprint;
pub mod hasher;
pub mod layout;
pub mod logging;
pub mod normalizer;
pub mod repository;
pub mod similarity;
pub mod stats;

pub use classifier::{classify, FontCandidate};
pub use config::FontPrintConfig;
pub use error::{FontPrintError, FontPrintResult};
pub use extractor::{Extraction, LayoutWarning, MetricSource, RawMetrics};
pub use fontprint::{FontPrint, FontPrinter};
pub use layout::{GlyphBox, LayoutInput, SourceKind, Surface};
pub use repository::{FingerprintRepository, JsonFileRepository, MemoryRepository};
pub use similarity::{compare, cosine_similarity, Comparison, Delta};
