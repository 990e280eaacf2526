// Match Record Model
//
// The canonical per-sequence, per-signature match structure. Every upstream
// producer emits chunk documents in this shape, and the aggregator, union and
// cross-reference resolver all read and return it.
//
// Chunk document (JSON):
//   {
//     "seq1": { "PF00001": { "accession": "PF00001.21", "memberDb": "Pfam", ... } },
//     "seq2": [ { ... }, { ... } ]
//   }
//
// A sequence id maps either to one collection (signature accession -> Match) or to
// a list of collections. Both shapes are normalized to a list on ingestion.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// ============================================================================
// Locations and matches
// ============================================================================

/// A coordinate span where a signature hits a sequence (1-based, inclusive)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub start: u64,
    pub end: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evalue: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bias: Option<f64>,

    /// Run-length alignment string, see [`crate::alignment`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cigar_alignment: Option<String>,

    /// Canonical location among overlapping ones
    #[serde(default)]
    pub representative: bool,

    /// Producer-specific fields, carried through unchanged
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Location {
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end,
            score: None,
            evalue: None,
            bias: None,
            cigar_alignment: None,
            representative: false,
            extra: serde_json::Map::new(),
        }
    }

    /// Number of residues covered
    pub fn len(&self) -> u64 {
        (self.end + 1).saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One hit of a signature against a sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// Signature accession, possibly with a version suffix (e.g. "PF00051.21")
    pub accession: String,

    /// Member database name (e.g. "Pfam", "PROSITE patterns")
    pub member_db: String,

    /// Member database release
    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_ac: Option<String>,

    #[serde(default)]
    pub locations: Vec<Location>,

    /// Attached by the entry join
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<Entry>,

    /// Producer-specific fields, carried through unchanged
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Match {
    pub fn new(
        accession: impl Into<String>,
        member_db: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            accession: accession.into(),
            member_db: member_db.into(),
            version: version.into(),
            name: None,
            description: None,
            model_ac: None,
            locations: Vec::new(),
            entry: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Accession with any version suffix removed ("PF00051.21" -> "PF00051")
    pub fn base_accession(&self) -> &str {
        strip_version(&self.accession)
    }

    /// (member_db, accession, version) triple identifying the producing signature
    pub fn signature_key(&self) -> (&str, &str, &str) {
        (&self.member_db, &self.accession, &self.version)
    }

    /// Order locations by ascending start, then end
    pub fn normalize_locations(&mut self) {
        self.locations.sort_by_key(|l| (l.start, l.end));
    }

    /// Accession of the attached entry, if it is set and non-empty
    pub fn entry_accession(&self) -> Option<&str> {
        self.entry
            .as_ref()
            .map(|e| e.accession.as_str())
            .filter(|a| !a.is_empty())
    }
}

/// Text before the first `.` of an accession
pub fn strip_version(accession: &str) -> &str {
    accession.split('.').next().unwrap_or(accession)
}

// ============================================================================
// Entries and cross-references
// ============================================================================

/// InterPro-like entry attached to a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub accession: String,

    /// Curated entry description
    pub description: String,

    pub signature_description: String,

    #[serde(default)]
    pub go_xrefs: Vec<GoXref>,

    #[serde(default)]
    pub pathway_xrefs: Vec<PathwayXref>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Entry {
    pub fn new(
        accession: impl Into<String>,
        description: impl Into<String>,
        signature_description: impl Into<String>,
    ) -> Self {
        Self {
            accession: accession.into(),
            description: description.into(),
            signature_description: signature_description.into(),
            go_xrefs: Vec::new(),
            pathway_xrefs: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Gene Ontology category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoCategory {
    BiologicalProcess,
    CellularComponent,
    MolecularFunction,
}

impl GoCategory {
    /// Map the single-letter aspect code (P, C, F)
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "P" => Some(GoCategory::BiologicalProcess),
            "C" => Some(GoCategory::CellularComponent),
            "F" => Some(GoCategory::MolecularFunction),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GoCategory::BiologicalProcess => "BIOLOGICAL_PROCESS",
            GoCategory::CellularComponent => "CELLULAR_COMPONENT",
            GoCategory::MolecularFunction => "MOLECULAR_FUNCTION",
        }
    }
}

impl fmt::Display for GoCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const GO_DATABASE_NAME: &str = "GO";

/// GO term cross-reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoXref {
    pub name: String,
    pub database_name: String,
    pub category: GoCategory,
    pub id: String,
}

impl GoXref {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: GoCategory) -> Self {
        Self {
            name: name.into(),
            database_name: GO_DATABASE_NAME.to_string(),
            category,
            id: id.into(),
        }
    }
}

/// Pathway cross-reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathwayXref {
    pub id: String,
    pub database_name: String,
    pub name: String,
}

// ============================================================================
// Aggregated results
// ============================================================================

/// Matches found for one sequence by one producer, keyed by signature accession
pub type MatchCollection = BTreeMap<String, Match>;

/// Value under a sequence id in a chunk document
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChunkValue {
    One(MatchCollection),
    Many(Vec<MatchCollection>),
}

impl ChunkValue {
    fn into_collections(self) -> Vec<MatchCollection> {
        match self {
            ChunkValue::One(collection) => vec![collection],
            ChunkValue::Many(collections) => collections,
        }
    }
}

/// Sequence id -> ordered list of match collections
///
/// Sequence ids keep the order in which they were first seen; collections under
/// an id keep the order in which they were added. The value under an id is always
/// a list, no matter how many inputs contributed to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedResults {
    order: Vec<String>,
    by_sequence: HashMap<String, Vec<MatchCollection>>,
}

impl AggregatedResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct sequences
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, sequence_id: &str) -> bool {
        self.by_sequence.contains_key(sequence_id)
    }

    /// Append one collection under a sequence id
    pub fn push(&mut self, sequence_id: impl Into<String>, mut collection: MatchCollection) {
        collection.values_mut().for_each(Match::normalize_locations);
        self.entry(sequence_id.into()).push(collection);
    }

    /// Append several collections under a sequence id, creating it even if empty
    pub fn extend_sequence(
        &mut self,
        sequence_id: impl Into<String>,
        collections: impl IntoIterator<Item = MatchCollection>,
    ) {
        let list = self.entry(sequence_id.into());
        for mut collection in collections {
            collection.values_mut().for_each(Match::normalize_locations);
            list.push(collection);
        }
    }

    /// Append everything from `other`, after this mapping's own values
    pub fn merge(&mut self, other: AggregatedResults) {
        for (sequence_id, collections) in other {
            self.extend_sequence(sequence_id, collections);
        }
    }

    fn entry(&mut self, sequence_id: String) -> &mut Vec<MatchCollection> {
        if !self.by_sequence.contains_key(&sequence_id) {
            self.order.push(sequence_id.clone());
        }
        self.by_sequence.entry(sequence_id).or_default()
    }

    pub fn get(&self, sequence_id: &str) -> Option<&[MatchCollection]> {
        self.by_sequence.get(sequence_id).map(Vec::as_slice)
    }

    /// Sequence ids in order of first appearance
    pub fn sequence_ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[MatchCollection])> {
        self.order.iter().filter_map(|id| {
            self.by_sequence
                .get(id)
                .map(|collections| (id.as_str(), collections.as_slice()))
        })
    }

    /// Every match of one sequence, in collection order
    pub fn matches<'a>(&'a self, sequence_id: &str) -> impl Iterator<Item = &'a Match> + 'a {
        self.by_sequence
            .get(sequence_id)
            .into_iter()
            .flat_map(|collections| collections.iter().flat_map(|c| c.values()))
    }

    /// Every match of every sequence
    pub fn all_matches(&self) -> impl Iterator<Item = &Match> {
        self.by_sequence
            .values()
            .flat_map(|collections| collections.iter().flat_map(|c| c.values()))
    }

    pub fn all_matches_mut(&mut self) -> impl Iterator<Item = &mut Match> {
        self.by_sequence
            .values_mut()
            .flat_map(|collections| collections.iter_mut().flat_map(|c| c.values_mut()))
    }

    /// Total number of matches across all sequences
    pub fn match_count(&self) -> usize {
        self.all_matches().count()
    }
}

impl IntoIterator for AggregatedResults {
    type Item = (String, Vec<MatchCollection>);
    type IntoIter = std::vec::IntoIter<(String, Vec<MatchCollection>)>;

    fn into_iter(mut self) -> Self::IntoIter {
        self.order
            .into_iter()
            .map(|id| {
                let collections = self.by_sequence.remove(&id).unwrap_or_default();
                (id, collections)
            })
            .collect::<Vec<_>>()
            .into_iter()
    }
}

impl Serialize for AggregatedResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (sequence_id, collections) in self.iter() {
            map.serialize_entry(sequence_id, collections)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AggregatedResults {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ResultsVisitor;

        impl<'de> Visitor<'de> for ResultsVisitor {
            type Value = AggregatedResults;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of sequence ids to match collections")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut results = AggregatedResults::new();
                while let Some((sequence_id, value)) = access.next_entry::<String, ChunkValue>()? {
                    results.extend_sequence(sequence_id, value.into_collections());
                }
                Ok(results)
            }
        }

        deserializer.deserialize_map(ResultsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pfam_match(accession: &str) -> Match {
        let mut m = Match::new(accession, "Pfam", "37.0");
        m.locations = vec![Location::new(40, 90), Location::new(5, 30), Location::new(5, 20)];
        m
    }

    #[test]
    fn test_strip_version() {
        assert_eq!(strip_version("PF00051.21"), "PF00051");
        assert_eq!(strip_version("PS50011"), "PS50011");
        assert_eq!(strip_version("G3DSA:3.40.50.300"), "G3DSA:3");
        assert_eq!(strip_version(""), "");
    }

    #[test]
    fn test_go_category_from_code() {
        assert_eq!(GoCategory::from_code("P"), Some(GoCategory::BiologicalProcess));
        assert_eq!(GoCategory::from_code("C"), Some(GoCategory::CellularComponent));
        assert_eq!(GoCategory::from_code("F"), Some(GoCategory::MolecularFunction));
        assert_eq!(GoCategory::from_code("X"), None);
        assert_eq!(GoCategory::MolecularFunction.to_string(), "MOLECULAR_FUNCTION");
    }

    #[test]
    fn test_go_xref_serialization() {
        let xref = GoXref::new("GO:0000001", "test process", GoCategory::BiologicalProcess);
        let value = serde_json::to_value(&xref).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "name": "test process",
                "databaseName": "GO",
                "category": "BIOLOGICAL_PROCESS",
                "id": "GO:0000001"
            })
        );
    }

    #[test]
    fn test_push_normalizes_locations() {
        let mut results = AggregatedResults::new();
        results.push("seq1", MatchCollection::from([("PF00001".to_string(), pfam_match("PF00001.2"))]));

        let m = results.matches("seq1").next().unwrap();
        let starts: Vec<(u64, u64)> = m.locations.iter().map(|l| (l.start, l.end)).collect();
        assert_eq!(starts, vec![(5, 20), (5, 30), (40, 90)]);
    }

    #[test]
    fn test_location_len() {
        assert_eq!(Location::new(10, 19).len(), 10);
        assert_eq!(Location::new(7, 7).len(), 1);
    }

    #[test]
    fn test_deserialize_single_and_list_values() {
        let doc = r#"{
            "seq2": {"PF00001": {"accession": "PF00001.2", "memberDb": "Pfam"}},
            "seq1": [
                {"PS00001": {"accession": "PS00001", "memberDb": "PROSITE patterns"}},
                {"PF00002": {"accession": "PF00002", "memberDb": "Pfam", "locations": [{"start": 3, "end": 9}]}}
            ]
        }"#;
        let results: AggregatedResults = serde_json::from_str(doc).unwrap();

        assert_eq!(results.sequence_ids().collect::<Vec<_>>(), vec!["seq2", "seq1"]);
        assert_eq!(results.get("seq2").unwrap().len(), 1);
        assert_eq!(results.get("seq1").unwrap().len(), 2);
        assert_eq!(results.match_count(), 3);

        let location = &results.matches("seq1").nth(1).unwrap().locations[0];
        assert!(!location.representative);
        assert_eq!(location.cigar_alignment, None);
    }

    #[test]
    fn test_serialize_keeps_first_appearance_order() {
        let mut results = AggregatedResults::new();
        results.push("zeta", MatchCollection::new());
        results.push("alpha", MatchCollection::new());
        results.push("zeta", MatchCollection::new());

        let json = serde_json::to_string(&results).unwrap();
        assert_eq!(json, r#"{"zeta":[{},{}],"alpha":[{}]}"#);

        let back: AggregatedResults = serde_json::from_str(&json).unwrap();
        assert_eq!(back, results);
    }

    #[test]
    fn test_into_iter_order() {
        let mut results = AggregatedResults::new();
        results.push("b", MatchCollection::new());
        results.push("a", MatchCollection::new());
        let ids: Vec<String> = results.into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
