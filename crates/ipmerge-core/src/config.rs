// Pipeline Configuration
//
// Environment-based configuration for the resolver lookup tables and output options.
// Command-line flags override these values.

use ipmerge_common::{IpmError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Locations of the cross-reference lookup tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupPaths {
    /// Signature accession -> [interpro description, signature description, entry accession]
    pub entries: Option<PathBuf>,

    /// Entry accession -> [GO id, ...]
    pub entry2go: Option<PathBuf>,

    /// GO id -> [name, category letter]
    pub go_terms: Option<PathBuf>,

    /// Entry accession -> [pathway id, ...]
    pub entry2pathways: Option<PathBuf>,

    /// Pathway id -> [database name, pathway name]
    pub pathways: Option<PathBuf>,
}

/// Configuration for a pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub lookups: LookupPaths,

    /// Read chunks and run GO/pathway lookups concurrently
    pub concurrent: bool,

    /// Pretty-print JSON output
    pub pretty: bool,
}

fn path_var(name: &str) -> Option<PathBuf> {
    env::var(name).ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

fn bool_var(name: &str) -> bool {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(false)
}

impl PipelineConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - IPMERGE_ENTRIES
    /// - IPMERGE_ENTRY2GO
    /// - IPMERGE_GO_TERMS
    /// - IPMERGE_ENTRY2PATHWAYS
    /// - IPMERGE_PATHWAYS
    /// - IPMERGE_CONCURRENT
    /// - IPMERGE_PRETTY
    pub fn from_env() -> Self {
        Self {
            lookups: LookupPaths {
                entries: path_var("IPMERGE_ENTRIES"),
                entry2go: path_var("IPMERGE_ENTRY2GO"),
                go_terms: path_var("IPMERGE_GO_TERMS"),
                entry2pathways: path_var("IPMERGE_ENTRY2PATHWAYS"),
                pathways: path_var("IPMERGE_PATHWAYS"),
            },
            concurrent: bool_var("IPMERGE_CONCURRENT"),
            pretty: bool_var("IPMERGE_PRETTY"),
        }
    }

    /// Validate configuration
    ///
    /// GO and pathway tables come in pairs; giving only half of a pair is an error.
    pub fn validate(&self) -> Result<()> {
        let lookups = &self.lookups;

        if lookups.entry2go.is_some() != lookups.go_terms.is_some() {
            return Err(IpmError::Config(
                "GO lookups need both the entry2go and go_terms tables".to_string(),
            ));
        }

        if lookups.entry2pathways.is_some() != lookups.pathways.is_some() {
            return Err(IpmError::Config(
                "Pathway lookups need both the entry2pathways and pathways tables".to_string(),
            ));
        }

        let wants_xrefs = lookups.entry2go.is_some() || lookups.entry2pathways.is_some();
        if wants_xrefs && lookups.entries.is_none() {
            return Err(IpmError::Config(
                "GO and pathway lookups run after the entry join and need the entries table"
                    .to_string(),
            ));
        }

        Ok(())
    }
}
