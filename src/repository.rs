use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{FontPrintError, FontPrintResult};
use crate::fontprint::FontPrint;

/// Storage capability injected into whatever orchestrates extraction + storage
pub trait FingerprintRepository {
    /// Store a print. Returns `false` when a print with the same hash is already stored.
    fn append(&mut self, print: FontPrint) -> FontPrintResult<bool>;

    fn list(&self) -> FontPrintResult<Vec<FontPrint>>;

    /// Remove by id. Returns whether anything was removed.
    fn remove(&mut self, id: &str) -> FontPrintResult<bool>;
}

/// Vec-backed repository for tests and short-lived batches
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    prints: Vec<FontPrint>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FingerprintRepository for MemoryRepository {
    fn append(&mut self, print: FontPrint) -> FontPrintResult<bool> {
        if self.prints.iter().any(|p| p.same_layout(&print)) {
            debug!("Skipping duplicate fingerprint {}", print.fingerprint_hash);
            return Ok(false);
        }
        self.prints.push(print);
        Ok(true)
    }

    fn list(&self) -> FontPrintResult<Vec<FontPrint>> {
        Ok(self.prints.clone())
    }

    fn remove(&mut self, id: &str) -> FontPrintResult<bool> {
        let before = self.prints.len();
        self.prints.retain(|p| p.id != id);
        Ok(self.prints.len() != before)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CorpusFile {
    version: u32,
    fontprints: Vec<FontPrint>,
}

const CORPUS_VERSION: u32 = 1;

/// Whole-corpus JSON document on disk. Every write replaces the file atomically.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> FontPrintResult<Vec<FontPrint>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| FontPrintError::repository(self.path.display().to_string(), e))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let corpus: CorpusFile = serde_json::from_str(&content).map_err(|e| {
            FontPrintError::serialization(format!("corpus {}", self.path.display()), e)
        })?;
        Ok(corpus.fontprints)
    }

    fn store(&self, fontprints: Vec<FontPrint>) -> FontPrintResult<()> {
        let count = fontprints.len();
        let corpus = CorpusFile {
            version: CORPUS_VERSION,
            fontprints,
        };
        let content = serde_json::to_string_pretty(&corpus)
            .map_err(|e| FontPrintError::serialization("corpus", e))?;

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        std::fs::write(&tmp_path, content)
            .map_err(|e| FontPrintError::repository(tmp_path.display().to_string(), e))?;
        std::fs::rename(&tmp_path, &self.path)
            .map_err(|e| FontPrintError::repository(self.path.display().to_string(), e))?;

        debug!("Wrote {} fingerprints to {}", count, self.path.display());
        Ok(())
    }
}

impl FingerprintRepository for JsonFileRepository {
    fn append(&mut self, print: FontPrint) -> FontPrintResult<bool> {
        let mut fontprints = self.load()?;
        if fontprints.iter().any(|p| p.same_layout(&print)) {
            info!(
                "Fingerprint {} already stored in {}",
                print.fingerprint_hash,
                self.path.display()
            );
            return Ok(false);
        }
        fontprints.push(print);
        self.store(fontprints)?;
        Ok(true)
    }

    fn list(&self) -> FontPrintResult<Vec<FontPrint>> {
        self.load()
    }

    fn remove(&mut self, id: &str) -> FontPrintResult<bool> {
        let mut fontprints = self.load()?;
        let before = fontprints.len();
        fontprints.retain(|p| p.id != id);
        if fontprints.len() == before {
            return Ok(false);
        }
        self.store(fontprints)?;
        Ok(true)
    }
}
