// Aggregator
//
// Merges per-chunk match-collection documents into one AggregatedResults.
//
// Files are merged in argument order. A chunk that is unset, missing, empty,
// unreadable or malformed is skipped and reported; it never aborts the run.
// Each input file is read exactly once.

use crate::model::AggregatedResults;
use ipmerge_common::checksum::compute_checksum;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ============================================================================
// Chunk status
// ============================================================================

/// Why a chunk did not contribute to the merged mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No path given for this slot
    Unset,
    Missing,
    /// File has no content besides whitespace
    Empty,
    Unreadable(String),
    Malformed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unset => write!(f, "no path given"),
            SkipReason::Missing => write!(f, "file does not exist"),
            SkipReason::Empty => write!(f, "file is empty"),
            SkipReason::Unreadable(e) => write!(f, "file could not be read: {}", e),
            SkipReason::Malformed(e) => write!(f, "file is not a match collection document: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkStatus {
    Merged {
        /// Number of sequence ids the chunk contributed to
        sequences: usize,
        /// SHA-256 of the chunk bytes
        checksum: String,
    },
    Skipped(SkipReason),
}

/// Outcome for one input slot, in argument order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkReport {
    pub path: Option<PathBuf>,
    pub status: ChunkStatus,
}

impl ChunkReport {
    pub fn is_merged(&self) -> bool {
        matches!(self.status, ChunkStatus::Merged { .. })
    }
}

/// Merged mapping plus per-chunk status
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub results: AggregatedResults,
    pub chunks: Vec<ChunkReport>,
}

impl Aggregation {
    pub fn merged(&self) -> impl Iterator<Item = &ChunkReport> {
        self.chunks.iter().filter(|c| c.is_merged())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &ChunkReport> {
        self.chunks.iter().filter(|c| !c.is_merged())
    }

    fn absorb(&mut self, path: Option<&Path>, outcome: Result<(AggregatedResults, String), SkipReason>) {
        let status = match outcome {
            Ok((chunk, checksum)) => {
                debug!(
                    path = %display_path(path),
                    sequences = chunk.len(),
                    "Merged match chunk"
                );
                let sequences = chunk.len();
                self.results.merge(chunk);
                ChunkStatus::Merged { sequences, checksum }
            },
            Err(reason) => {
                warn!(path = %display_path(path), reason = %reason, "Skipping match chunk");
                ChunkStatus::Skipped(reason)
            },
        };

        self.chunks.push(ChunkReport {
            path: path.map(Path::to_path_buf),
            status,
        });
    }

    fn log_summary(&self) {
        info!(
            chunks = self.chunks.len(),
            merged = self.merged().count(),
            skipped = self.skipped().count(),
            sequences = self.results.len(),
            "Aggregation complete"
        );
    }
}

fn display_path(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "<unset>".to_string())
}

// ============================================================================
// Reading and parsing
// ============================================================================

/// Treat `None` and empty paths alike
fn usable_path(path: &Option<PathBuf>) -> Option<&Path> {
    path.as_deref().filter(|p| !p.as_os_str().is_empty())
}

fn classify_read_error(err: std::io::Error) -> SkipReason {
    match err.kind() {
        ErrorKind::NotFound => SkipReason::Missing,
        _ => SkipReason::Unreadable(err.to_string()),
    }
}

/// Parse the bytes of one chunk document
pub fn parse_chunk(bytes: &[u8]) -> Result<(AggregatedResults, String), SkipReason> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(SkipReason::Empty);
    }

    let chunk: AggregatedResults =
        serde_json::from_slice(bytes).map_err(|e| SkipReason::Malformed(e.to_string()))?;

    let checksum =
        compute_checksum(&mut &bytes[..]).map_err(|e| SkipReason::Unreadable(e.to_string()))?;

    Ok((chunk, checksum))
}

fn read_chunk(path: Option<&Path>) -> Result<(AggregatedResults, String), SkipReason> {
    let path = path.ok_or(SkipReason::Unset)?;
    let bytes = std::fs::read(path).map_err(classify_read_error)?;
    parse_chunk(&bytes)
}

// ============================================================================
// Public API
// ============================================================================

/// Merge chunk documents in argument order
///
/// For every sequence id the first chunk that mentions it creates its list and
/// later chunks append to it. Never fails; check [`Aggregation::chunks`] for
/// inputs that were skipped.
pub fn aggregate(paths: &[Option<PathBuf>]) -> Aggregation {
    let mut aggregation = Aggregation::default();

    for path in paths {
        let path = usable_path(path);
        aggregation.absorb(path, read_chunk(path));
    }

    aggregation.log_summary();
    aggregation
}

/// Same result as [`aggregate`], reading the files concurrently
///
/// Reads run on the tokio runtime; parsing and merging still happen in argument
/// order once every read has finished.
pub async fn aggregate_concurrent(paths: &[Option<PathBuf>]) -> Aggregation {
    let reads = paths.iter().map(|path| async move {
        match usable_path(path) {
            Some(p) => Some(tokio::fs::read(p).await),
            None => None,
        }
    });
    let contents = futures::future::join_all(reads).await;

    let mut aggregation = Aggregation::default();

    for (path, content) in paths.iter().zip(contents) {
        let outcome = match content {
            None => Err(SkipReason::Unset),
            Some(Err(e)) => Err(classify_read_error(e)),
            Some(Ok(bytes)) => parse_chunk(&bytes),
        };
        aggregation.absorb(usable_path(path), outcome);
    }

    aggregation.log_summary();
    aggregation
}
