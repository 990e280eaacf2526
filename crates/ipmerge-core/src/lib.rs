//! ipmerge Core Library
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//!
//! Aggregation and cross-reference resolution for protein match records.
//!
//! # Components
//!
//! - **alignment**: run-length codec for per-residue alignment states
//! - **model**: matches, locations, entries and the aggregated mapping
//! - **aggregate**: merges per-chunk match documents per sequence
//! - **union**: precalculated results first, freshly analysed results after
//! - **xref**: entry, GO term and pathway joins
//! - **sequence**: FASTA ingestion with content hashing
//!
//! # Example
//!
//! ```no_run
//! use ipmerge_core::aggregate::aggregate;
//! use ipmerge_core::xref::{Resolver, XrefTables};
//! use ipmerge_core::config::PipelineConfig;
//!
//! fn run() -> ipmerge_common::Result<()> {
//!     let config = PipelineConfig::from_env();
//!     let resolver = Resolver::new(XrefTables::load(&config.lookups)?);
//!
//!     let aggregation = aggregate(&[Some("chunk1.json".into()), Some("chunk2.json".into())]);
//!     let resolved = resolver.resolve(aggregation.results);
//!     println!("{}", serde_json::to_string(&resolved)?);
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod alignment;
pub mod config;
pub mod model;
pub mod sequence;
pub mod union;
pub mod xref;

pub use aggregate::{aggregate, aggregate_concurrent, Aggregation, ChunkStatus, SkipReason};
pub use model::{AggregatedResults, Entry, GoCategory, GoXref, Location, Match, MatchCollection, PathwayXref};
pub use union::{union, union_concurrent, union_results};
pub use xref::{join_entries, join_go_terms, join_pathways, EntryResolved, Resolver, XrefTables};
