//! ipmerge Common Library
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//!
//! Shared error handling, logging and checksum utilities for the ipmerge workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the workspace error type and result alias
//! - **Logging**: `tracing` subscriber setup driven by `LOG_*` environment variables
//! - **Checksums**: sequence content digests and file checksums
//!
//! # Example
//!
//! ```no_run
//! use ipmerge_common::checksum::sequence_digest;
//!
//! let digest = sequence_digest("MKVLAAGIV");
//! assert_eq!(digest.len(), 32);
//! ```

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{IpmError, Result};
