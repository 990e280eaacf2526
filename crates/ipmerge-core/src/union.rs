//! Union of precalculated and freshly analysed results
//!
//! Precalculated (lookup service) chunks are merged before freshly analysed ones,
//! so for any sequence present in both, the precalculated collections come first.

use crate::aggregate::{aggregate, aggregate_concurrent, Aggregation};
use crate::model::AggregatedResults;
use std::path::PathBuf;

fn chained(precalculated: &[Option<PathBuf>], analysed: &[Option<PathBuf>]) -> Vec<Option<PathBuf>> {
    precalculated.iter().chain(analysed).cloned().collect()
}

/// Aggregate `precalculated` followed by `analysed`
pub fn union(precalculated: &[Option<PathBuf>], analysed: &[Option<PathBuf>]) -> Aggregation {
    aggregate(&chained(precalculated, analysed))
}

/// Concurrent counterpart of [`union`]
pub async fn union_concurrent(
    precalculated: &[Option<PathBuf>],
    analysed: &[Option<PathBuf>],
) -> Aggregation {
    aggregate_concurrent(&chained(precalculated, analysed)).await
}

/// Union of two in-memory mappings with the same ordering rule
pub fn union_results(precalculated: AggregatedResults, analysed: AggregatedResults) -> AggregatedResults {
    let mut merged = precalculated;
    merged.merge(analysed);
    merged
}
