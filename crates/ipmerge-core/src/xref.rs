// Cross-Reference Resolver
//
// Three enrichment passes over an aggregated mapping:
//   1. entry join    signature accession (version stripped) -> entry
//   2. GO join       entry accession -> GO ids -> (name, category)
//   3. pathway join  entry accession -> pathway ids -> (database, name)
//
// The GO and pathway joins only accept an `EntryResolved` mapping, which only
// `join_entries` produces, so they can never run before the entry join.
// A missing key at any lookup level means "no enrichment" and is never an error.

use crate::config::LookupPaths;
use crate::model::{AggregatedResults, Entry, GoCategory, GoXref, PathwayXref};
use ipmerge_common::{IpmError, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, trace};

// ============================================================================
// Lookup tables
// ============================================================================

/// Entry annotation for one signature, stored as a 3-element array
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "(String, String, String)")]
pub struct EntryAnnotation {
    pub interpro_description: String,
    pub signature_description: String,
    pub entry_accession: String,
}

impl From<(String, String, String)> for EntryAnnotation {
    fn from((interpro_description, signature_description, entry_accession): (String, String, String)) -> Self {
        Self {
            interpro_description,
            signature_description,
            entry_accession,
        }
    }
}

/// Version-stripped signature accession -> entry annotation
pub type EntryTable = HashMap<String, EntryAnnotation>;

/// GO term name and single-letter category, stored as `[name, code]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "(String, String)")]
pub struct GoTermInfo {
    pub name: String,
    pub category_code: String,
}

impl From<(String, String)> for GoTermInfo {
    fn from((name, category_code): (String, String)) -> Self {
        Self { name, category_code }
    }
}

/// Pathway database and name, stored as `[database, name]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "(String, String)")]
pub struct PathwayInfo {
    pub database_name: String,
    pub name: String,
}

impl From<(String, String)> for PathwayInfo {
    fn from((database_name, name): (String, String)) -> Self {
        Self { database_name, name }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GoTables {
    pub entry_to_go: HashMap<String, Vec<String>>,
    pub terms: HashMap<String, GoTermInfo>,
}

impl GoTables {
    /// GO cross-references of one entry; unknown ids and categories are dropped
    pub fn xrefs_for(&self, entry_accession: &str) -> Vec<GoXref> {
        let Some(go_ids) = self.entry_to_go.get(entry_accession) else {
            trace!(entry = entry_accession, "No GO terms for entry");
            return Vec::new();
        };

        go_ids
            .iter()
            .filter_map(|go_id| {
                let Some(info) = self.terms.get(go_id) else {
                    trace!(entry = entry_accession, go_id = %go_id, "GO term missing from term table");
                    return None;
                };
                let Some(category) = GoCategory::from_code(&info.category_code) else {
                    debug!(go_id = %go_id, code = %info.category_code, "Unknown GO category code");
                    return None;
                };
                Some(GoXref::new(go_id.clone(), info.name.clone(), category))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathwayTables {
    pub entry_to_pathways: HashMap<String, Vec<String>>,
    pub pathways: HashMap<String, PathwayInfo>,
}

impl PathwayTables {
    /// Pathway cross-references of one entry; unknown pathway ids are dropped
    pub fn xrefs_for(&self, entry_accession: &str) -> Vec<PathwayXref> {
        let Some(pathway_ids) = self.entry_to_pathways.get(entry_accession) else {
            trace!(entry = entry_accession, "No pathways for entry");
            return Vec::new();
        };

        pathway_ids
            .iter()
            .filter_map(|id| {
                let info = self.pathways.get(id)?;
                Some(PathwayXref {
                    id: id.clone(),
                    database_name: info.database_name.clone(),
                    name: info.name.clone(),
                })
            })
            .collect()
    }
}

/// All lookup tables used by the resolver
#[derive(Debug, Clone, Default)]
pub struct XrefTables {
    pub entries: EntryTable,
    pub go: Option<GoTables>,
    pub pathways: Option<PathwayTables>,
}

fn load_json_table<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path).map_err(|e| IpmError::lookup_table(path, e))?;
    let table = serde_json::from_slice(&bytes).map_err(|e| IpmError::lookup_table(path, e))?;
    debug!(path = %path.display(), "Loaded lookup table");
    Ok(table)
}

impl XrefTables {
    /// Load every configured table; GO and pathway tables are optional pairs
    pub fn load(paths: &LookupPaths) -> Result<Self> {
        let entries_path = paths
            .entries
            .as_deref()
            .ok_or_else(|| IpmError::Config("No entries table configured".to_string()))?;
        let entries: EntryTable = load_json_table(entries_path)?;

        let go = match (&paths.entry2go, &paths.go_terms) {
            (Some(entry2go), Some(terms)) => Some(GoTables {
                entry_to_go: load_json_table(entry2go)?,
                terms: load_json_table(terms)?,
            }),
            _ => None,
        };

        let pathways = match (&paths.entry2pathways, &paths.pathways) {
            (Some(entry2pathways), Some(pathways)) => Some(PathwayTables {
                entry_to_pathways: load_json_table(entry2pathways)?,
                pathways: load_json_table(pathways)?,
            }),
            _ => None,
        };

        info!(
            entries = entries.len(),
            go = go.is_some(),
            pathways = pathways.is_some(),
            "Loaded cross-reference tables"
        );

        Ok(Self { entries, go, pathways })
    }
}

// ============================================================================
// Joins
// ============================================================================

/// Aggregated results on which the entry join has run
#[derive(Debug, Clone, PartialEq)]
pub struct EntryResolved(AggregatedResults);

impl EntryResolved {
    pub fn results(&self) -> &AggregatedResults {
        &self.0
    }

    pub fn into_inner(self) -> AggregatedResults {
        self.0
    }

    /// Distinct non-empty entry accessions, in no particular order
    pub fn entry_accessions(&self) -> HashSet<String> {
        self.0
            .all_matches()
            .filter_map(|m| m.entry_accession())
            .map(str::to_string)
            .collect()
    }
}

/// Attach entry annotations by version-stripped signature accession
///
/// Matches without an annotation are left unchanged. Re-attaching the entry a
/// match already carries keeps its collected cross-references.
pub fn join_entries(mut results: AggregatedResults, entries: &EntryTable) -> EntryResolved {
    let mut attached = 0usize;
    let mut missed = 0usize;

    for m in results.all_matches_mut() {
        let Some(annotation) = entries.get(m.base_accession()) else {
            trace!(accession = %m.accession, "No entry annotation for signature");
            missed += 1;
            continue;
        };

        match m.entry.as_mut() {
            Some(entry) if entry.accession == annotation.entry_accession => {
                entry.description = annotation.interpro_description.clone();
                entry.signature_description = annotation.signature_description.clone();
            },
            _ => {
                m.entry = Some(Entry::new(
                    annotation.entry_accession.clone(),
                    annotation.interpro_description.clone(),
                    annotation.signature_description.clone(),
                ));
            },
        }
        attached += 1;
    }

    debug!(attached, missed, "Entry join complete");
    EntryResolved(results)
}

fn attach_go(entry: &mut Entry, xrefs: &[GoXref]) {
    for xref in xrefs {
        if !entry.go_xrefs.iter().any(|x| x.id == xref.id) {
            entry.go_xrefs.push(xref.clone());
        }
    }
}

fn attach_pathways(entry: &mut Entry, xrefs: &[PathwayXref]) {
    for xref in xrefs {
        if !entry.pathway_xrefs.iter().any(|x| x.id == xref.id) {
            entry.pathway_xrefs.push(xref.clone());
        }
    }
}

/// Apply per-entry GO and pathway cross-references to every match with an entry
fn apply_xrefs(
    mut resolved: EntryResolved,
    go: Option<&HashMap<String, Vec<GoXref>>>,
    pathways: Option<&HashMap<String, Vec<PathwayXref>>>,
) -> EntryResolved {
    for m in resolved.0.all_matches_mut() {
        let Some(entry) = m.entry.as_mut().filter(|e| !e.accession.is_empty()) else {
            continue;
        };
        if let Some(xrefs) = go.and_then(|go| go.get(&entry.accession)) {
            attach_go(entry, xrefs);
        }
        if let Some(xrefs) = pathways.and_then(|p| p.get(&entry.accession)) {
            attach_pathways(entry, xrefs);
        }
    }
    resolved
}

fn go_lookup(accessions: &HashSet<String>, tables: &GoTables) -> HashMap<String, Vec<GoXref>> {
    accessions
        .iter()
        .map(|acc| (acc.clone(), tables.xrefs_for(acc)))
        .filter(|(_, xrefs)| !xrefs.is_empty())
        .collect()
}

fn pathway_lookup(
    accessions: &HashSet<String>,
    tables: &PathwayTables,
) -> HashMap<String, Vec<PathwayXref>> {
    accessions
        .iter()
        .map(|acc| (acc.clone(), tables.xrefs_for(acc)))
        .filter(|(_, xrefs)| !xrefs.is_empty())
        .collect()
}

/// Append GO cross-references to every match whose entry has an accession
pub fn join_go_terms(resolved: EntryResolved, tables: &GoTables) -> EntryResolved {
    let lookup = go_lookup(&resolved.entry_accessions(), tables);
    debug!(entries_with_go = lookup.len(), "GO join complete");
    apply_xrefs(resolved, Some(&lookup), None)
}

/// Append pathway cross-references to every match whose entry has an accession
pub fn join_pathways(resolved: EntryResolved, tables: &PathwayTables) -> EntryResolved {
    let lookup = pathway_lookup(&resolved.entry_accessions(), tables);
    debug!(entries_with_pathways = lookup.len(), "Pathway join complete");
    apply_xrefs(resolved, None, Some(&lookup))
}

// ============================================================================
// Resolver
// ============================================================================

/// Runs the entry, GO and pathway joins over aggregated results
#[derive(Debug, Clone)]
pub struct Resolver {
    tables: Arc<XrefTables>,
}

impl Resolver {
    pub fn new(tables: XrefTables) -> Self {
        Self {
            tables: Arc::new(tables),
        }
    }

    pub fn tables(&self) -> &XrefTables {
        &self.tables
    }

    /// Entry join, then GO join, then pathway join
    pub fn resolve(&self, results: AggregatedResults) -> AggregatedResults {
        let mut resolved = join_entries(results, &self.tables.entries);

        if let Some(go) = &self.tables.go {
            resolved = join_go_terms(resolved, go);
        }
        if let Some(pathways) = &self.tables.pathways {
            resolved = join_pathways(resolved, pathways);
        }

        resolved.into_inner()
    }

    /// Same result as [`Resolver::resolve`], running the GO and pathway lookups
    /// in parallel on blocking tasks once the entry join has finished
    pub async fn resolve_concurrent(&self, results: AggregatedResults) -> Result<AggregatedResults> {
        let resolved = join_entries(results, &self.tables.entries);
        let accessions = Arc::new(resolved.entry_accessions());

        let go_task = tokio::task::spawn_blocking({
            let tables = Arc::clone(&self.tables);
            let accessions = Arc::clone(&accessions);
            move || tables.go.as_ref().map(|go| go_lookup(&accessions, go))
        });

        let pathway_task = tokio::task::spawn_blocking({
            let tables = Arc::clone(&self.tables);
            let accessions = Arc::clone(&accessions);
            move || {
                tables
                    .pathways
                    .as_ref()
                    .map(|pathways| pathway_lookup(&accessions, pathways))
            }
        });

        let (go, pathways) = tokio::join!(go_task, pathway_task);
        let go = go.map_err(|e| IpmError::Task(e.to_string()))?;
        let pathways = pathways.map_err(|e| IpmError::Task(e.to_string()))?;

        Ok(apply_xrefs(resolved, go.as_ref(), pathways.as_ref()).into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Match, MatchCollection};

    fn results_with(accessions: &[&str]) -> AggregatedResults {
        let mut results = AggregatedResults::new();
        let collection: MatchCollection = accessions
            .iter()
            .map(|acc| (acc.to_string(), Match::new(*acc, "Pfam", "37.0")))
            .collect();
        results.push("seq1", collection);
        results
    }

    fn entry_table() -> EntryTable {
        HashMap::from([(
            "PF00001".to_string(),
            EntryAnnotation::from((
                "7TM GPCR, rhodopsin-like".to_string(),
                "7 transmembrane receptor".to_string(),
                "IPR000001".to_string(),
            )),
        )])
    }

    fn go_tables() -> GoTables {
        GoTables {
            entry_to_go: HashMap::from([(
                "IPR000001".to_string(),
                vec!["GO:0000001".to_string(), "GO:9999999".to_string(), "GO:0000002".to_string()],
            )]),
            terms: HashMap::from([
                ("GO:0000001".to_string(), GoTermInfo::from(("test process".to_string(), "P".to_string()))),
                ("GO:0000002".to_string(), GoTermInfo::from(("odd term".to_string(), "Z".to_string()))),
            ]),
        }
    }

    fn pathway_tables() -> PathwayTables {
        PathwayTables {
            entry_to_pathways: HashMap::from([(
                "IPR000001".to_string(),
                vec!["R-HSA-1".to_string(), "R-HSA-missing".to_string()],
            )]),
            pathways: HashMap::from([(
                "R-HSA-1".to_string(),
                PathwayInfo::from(("Reactome".to_string(), "Signalling".to_string())),
            )]),
        }
    }

    #[test]
    fn test_entry_annotation_from_array() {
        let table: EntryTable =
            serde_json::from_str(r#"{"PF00001": ["desc", "sig desc", "IPR000001"]}"#).unwrap();
        assert_eq!(table["PF00001"].entry_accession, "IPR000001");
        assert_eq!(table["PF00001"].signature_description, "sig desc");
    }

    #[test]
    fn test_join_entries_strips_version() {
        let resolved = join_entries(results_with(&["PF00001.21"]), &entry_table());
        let m = resolved.results().matches("seq1").next().unwrap();
        let entry = m.entry.as_ref().unwrap();
        assert_eq!(entry.accession, "IPR000001");
        assert_eq!(entry.description, "7TM GPCR, rhodopsin-like");
        assert_eq!(entry.signature_description, "7 transmembrane receptor");
    }

    #[test]
    fn test_join_entries_miss_leaves_match_unchanged() {
        let results = results_with(&["PF99999.1"]);
        let resolved = join_entries(results.clone(), &entry_table());
        assert_eq!(resolved.into_inner(), results);
    }

    #[test]
    fn test_join_entries_idempotent() {
        let once = join_entries(results_with(&["PF00001.21", "PF12345"]), &entry_table()).into_inner();
        let twice = join_entries(once.clone(), &entry_table()).into_inner();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_join_entries_keeps_collected_xrefs() {
        let resolved = join_entries(results_with(&["PF00001"]), &entry_table());
        let with_go = join_go_terms(resolved, &go_tables()).into_inner();
        let again = join_entries(with_go.clone(), &entry_table()).into_inner();
        assert_eq!(again, with_go);
    }

    #[test]
    fn test_join_go_terms() {
        let resolved = join_entries(results_with(&["PF00001"]), &entry_table());
        let results = join_go_terms(resolved, &go_tables()).into_inner();

        let entry = results.matches("seq1").next().unwrap().entry.clone().unwrap();
        assert_eq!(
            entry.go_xrefs,
            vec![GoXref::new("GO:0000001", "test process", GoCategory::BiologicalProcess)]
        );
        assert!(entry.pathway_xrefs.is_empty());
    }

    #[test]
    fn test_join_go_terms_idempotent() {
        let resolved = join_entries(results_with(&["PF00001"]), &entry_table());
        let once = join_go_terms(resolved, &go_tables());
        let twice = join_go_terms(once.clone(), &go_tables());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_join_pathways_separate_list() {
        let resolved = join_entries(results_with(&["PF00001"]), &entry_table());
        let results = join_pathways(resolved, &pathway_tables()).into_inner();

        let entry = results.matches("seq1").next().unwrap().entry.clone().unwrap();
        assert!(entry.go_xrefs.is_empty());
        assert_eq!(entry.pathway_xrefs.len(), 1);
        assert_eq!(entry.pathway_xrefs[0].id, "R-HSA-1");
        assert_eq!(entry.pathway_xrefs[0].database_name, "Reactome");
    }

    #[test]
    fn test_xref_joins_skip_matches_without_entry() {
        let resolved = join_entries(results_with(&["PF55555"]), &entry_table());
        let before = resolved.clone();
        let after = join_pathways(join_go_terms(resolved, &go_tables()), &pathway_tables());
        assert_eq!(before, after);
    }

    #[test]
    fn test_empty_entry_accession_is_ignored() {
        let mut table = entry_table();
        table.insert(
            "PF00002".to_string(),
            EntryAnnotation::from(("".to_string(), "unintegrated".to_string(), "".to_string())),
        );
        let mut go = go_tables();
        go.entry_to_go.insert(String::new(), vec!["GO:0000001".to_string()]);

        let resolved = join_entries(results_with(&["PF00002"]), &table);
        let results = join_go_terms(resolved, &go).into_inner();
        let entry = results.matches("seq1").next().unwrap().entry.clone().unwrap();
        assert!(entry.go_xrefs.is_empty());
    }

    #[test]
    fn test_resolver_sequential() {
        let resolver = Resolver::new(XrefTables {
            entries: entry_table(),
            go: Some(go_tables()),
            pathways: Some(pathway_tables()),
        });
        let results = resolver.resolve(results_with(&["PF00001.3", "PF42"]));

        let matches: Vec<&Match> = results.matches("seq1").collect();
        let enriched = matches.iter().find(|m| m.accession == "PF00001.3").unwrap();
        let entry = enriched.entry.as_ref().unwrap();
        assert_eq!(entry.go_xrefs.len(), 1);
        assert_eq!(entry.pathway_xrefs.len(), 1);

        let plain = matches.iter().find(|m| m.accession == "PF42").unwrap();
        assert!(plain.entry.is_none());
    }

    #[tokio::test]
    async fn test_resolver_concurrent_matches_sequential() {
        let resolver = Resolver::new(XrefTables {
            entries: entry_table(),
            go: Some(go_tables()),
            pathways: Some(pathway_tables()),
        });
        let input = results_with(&["PF00001.3", "PF42"]);

        let sequential = resolver.resolve(input.clone());
        let concurrent = resolver.resolve_concurrent(input).await.unwrap();
        assert_eq!(sequential, concurrent);
    }

    #[tokio::test]
    async fn test_resolver_concurrent_without_xref_tables() {
        let resolver = Resolver::new(XrefTables {
            entries: entry_table(),
            ..Default::default()
        });
        let results = resolver.resolve_concurrent(results_with(&["PF00001"])).await.unwrap();
        let entry = results.matches("seq1").next().unwrap().entry.clone().unwrap();
        assert_eq!(entry.accession, "IPR000001");
        assert!(entry.go_xrefs.is_empty());
    }
}
