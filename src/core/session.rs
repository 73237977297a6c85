//! The current CSV snapshot and the file-token guard around loading it

use log::debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::coordinator::ImportError;
use crate::core::parser::{parse, strip_bom, ParsedDataset};

/// Raw text of one loaded file together with its parsed dataset.
///
/// Immutable; a new load replaces the whole snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvSnapshot {
    raw: String,
    dataset: ParsedDataset,
    source: Option<PathBuf>,
}

impl CsvSnapshot {
    pub fn new(raw: String, source: Option<PathBuf>) -> Self {
        let dataset = parse(&raw);
        Self {
            raw,
            dataset,
            source,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn dataset(&self) -> &ParsedDataset {
        &self.dataset
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn has_rows(&self) -> bool {
        !self.dataset.is_empty()
    }
}

/// Read and parse a CSV file.
///
/// Invalid UTF-8 is replaced rather than rejected, and a leading byte-order
/// mark is dropped, so it never reaches the endpoint.
pub async fn read_snapshot(path: &Path) -> Result<CsvSnapshot, ImportError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| ImportError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(CsvSnapshot::new(decode_text(&bytes), Some(path.to_path_buf())))
}

/// Decode file bytes as text
pub fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.contains(char::REPLACEMENT_CHARACTER) {
        debug!("file is not valid UTF-8; undecodable bytes were replaced");
    }
    strip_bom(&text).to_string()
}

/// Identifies one file load; later loads get larger tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileToken(u64);

/// Holder of the current snapshot
#[derive(Debug, Default)]
pub struct ImportSession {
    issued: u64,
    snapshot: Option<Arc<CsvSnapshot>>,
}

impl ImportSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a load. Only the most recently issued token may complete.
    pub fn begin_load(&mut self) -> FileToken {
        self.issued += 1;
        FileToken(self.issued)
    }

    /// Install `snapshot` if `token` is still the newest load.
    ///
    /// Returns `false` and drops the snapshot when a newer load was started.
    pub fn finish_load(&mut self, token: FileToken, snapshot: CsvSnapshot) -> bool {
        if token != FileToken(self.issued) {
            debug!(
                "discarding stale file load {:?} (latest is {})",
                token, self.issued
            );
            return false;
        }
        self.snapshot = Some(Arc::new(snapshot));
        true
    }

    pub fn snapshot(&self) -> Option<Arc<CsvSnapshot>> {
        self.snapshot.clone()
    }
}
