//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

/// Write `content` to `name` inside `dir` and return the path as an input slot
pub fn write_chunk(dir: &TempDir, name: &str, content: &str) -> Option<PathBuf> {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).expect("Failed to create fixture");
    file.write_all(content.as_bytes()).expect("Failed to write fixture");
    Some(path)
}

/// Chunk document with one Pfam match per (sequence id, accession) pair
pub fn pfam_chunk(hits: &[(&str, &str)]) -> String {
    let mut doc = serde_json::Map::new();
    for (sequence_id, accession) in hits {
        let collection = doc
            .entry(sequence_id.to_string())
            .or_insert_with(|| serde_json::json!({}));
        collection[*accession] = serde_json::json!({
            "accession": accession,
            "memberDb": "Pfam",
            "version": "37.0",
            "locations": [{"start": 10, "end": 50, "evalue": 1.2e-10}]
        });
    }
    serde_json::Value::Object(doc).to_string()
}
