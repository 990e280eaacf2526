//! Sequence ingestion
//!
//! Turns a FASTA collection into [`SequenceRecord`]s keyed by identifier. The
//! content hash is [`sequence_digest`]: uppercase hexadecimal MD5 of the residues
//! exactly as read.

use ipmerge_common::checksum::sequence_digest;
use ipmerge_common::{IpmError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;
use tracing::debug;

/// One input sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRecord {
    /// First whitespace-delimited token of the header
    pub id: String,

    /// Full header line without the leading '>'
    pub description: String,

    pub sequence: String,

    /// Content hash of `sequence`
    pub md5: String,

    pub length: usize,
}

impl SequenceRecord {
    pub fn new(header: &str, sequence: String) -> Self {
        let description = header.trim().to_string();
        let id = description
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();

        Self {
            id,
            description,
            md5: sequence_digest(&sequence),
            length: sequence.chars().count(),
            sequence,
        }
    }
}

/// Parse FASTA records from a file
pub fn parse_fasta_file(path: impl AsRef<Path>) -> Result<Vec<SequenceRecord>> {
    let file = std::fs::File::open(path)?;
    parse_fasta(std::io::BufReader::new(file))
}

/// Parse FASTA records from a reader, preserving input order
///
/// Residue lines are concatenated with all whitespace removed. Identifiers must be
/// unique within one batch.
pub fn parse_fasta<R: BufRead>(reader: R) -> Result<Vec<SequenceRecord>> {
    let mut records = Vec::new();
    let mut seen = HashSet::new();
    let mut current: Option<(String, String)> = None;

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;

        if let Some(header) = line.strip_prefix('>') {
            if let Some((header, residues)) = current.take() {
                push_record(&mut records, &mut seen, &header, residues)?;
            }
            current = Some((header.to_string(), String::new()));
            continue;
        }

        if line.trim().is_empty() || line.starts_with(';') {
            continue;
        }

        match current.as_mut() {
            Some((_, residues)) => residues.extend(line.chars().filter(|c| !c.is_whitespace())),
            None => {
                return Err(IpmError::Parse(format!(
                    "Residues before the first FASTA header at line {}",
                    line_number + 1
                )))
            },
        }
    }

    if let Some((header, residues)) = current.take() {
        push_record(&mut records, &mut seen, &header, residues)?;
    }

    debug!(sequences = records.len(), "Parsed FASTA records");

    Ok(records)
}

fn push_record(
    records: &mut Vec<SequenceRecord>,
    seen: &mut HashSet<String>,
    header: &str,
    residues: String,
) -> Result<()> {
    let record = SequenceRecord::new(header, residues);

    if record.id.is_empty() {
        return Err(IpmError::Parse(format!("FASTA header without identifier: >{}", header)));
    }
    if !seen.insert(record.id.clone()) {
        return Err(IpmError::DuplicateSequence(record.id));
    }

    records.push(record);
    Ok(())
}
