//! ipmerge - match aggregation and cross-reference resolution

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ipmerge_common::logging::{init_logging, LogConfig};
use ipmerge_core::aggregate::{aggregate, aggregate_concurrent};
use ipmerge_core::alignment;
use ipmerge_core::config::PipelineConfig;
use ipmerge_core::sequence::parse_fasta_file;
use ipmerge_core::union::{union, union_concurrent};
use ipmerge_core::xref::{Resolver, XrefTables};
use ipmerge_core::AggregatedResults;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "ipmerge")]
#[command(author, version, about = "Merge and cross-reference protein match records")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Write the result document here instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true, env = "IPMERGE_PRETTY")]
    pretty: bool,

    /// Read chunks and run cross-reference lookups concurrently
    #[arg(long, global = true, env = "IPMERGE_CONCURRENT")]
    concurrent: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge match chunk documents per sequence
    Aggregate {
        /// Chunk documents, merged in the given order
        chunks: Vec<PathBuf>,
    },

    /// Merge precalculated and freshly analysed chunks, precalculated first
    Union {
        #[arg(long, num_args = 0..)]
        precalc: Vec<PathBuf>,

        #[arg(long, num_args = 0..)]
        analysed: Vec<PathBuf>,
    },

    /// Attach entry, GO and pathway cross-references to aggregated results
    Resolve {
        /// Aggregated results document
        input: PathBuf,

        #[arg(long, env = "IPMERGE_ENTRIES")]
        entries: Option<PathBuf>,

        #[arg(long, env = "IPMERGE_ENTRY2GO")]
        entry2go: Option<PathBuf>,

        #[arg(long, env = "IPMERGE_GO_TERMS")]
        go_terms: Option<PathBuf>,

        #[arg(long, env = "IPMERGE_ENTRY2PATHWAYS")]
        entry2pathways: Option<PathBuf>,

        #[arg(long, env = "IPMERGE_PATHWAYS")]
        pathways: Option<PathBuf>,
    },

    /// Hash the sequences of a FASTA file
    Hash {
        fasta: PathBuf,
    },

    /// Run-length encode or decode alignment strings
    Cigar {
        #[command(subcommand)]
        action: CigarAction,
    },
}

#[derive(Subcommand, Debug)]
enum CigarAction {
    /// Alignment string -> run-length string
    Encode { alignment: String },

    /// Residues + run-length string -> alignment string
    Decode { residues: String, runs: String },
}

fn slots(paths: Vec<PathBuf>) -> Vec<Option<PathBuf>> {
    paths.into_iter().map(Some).collect()
}

fn write_output<T: Serialize>(value: &T, output: Option<&Path>, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };

    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Wrote result document");
        },
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json)?;
        },
    }

    Ok(())
}

fn write_text(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, format!("{}\n", text))
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => writeln!(std::io::stdout().lock(), "{}", text)?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("ipmerge")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let mut config = PipelineConfig::from_env();
    config.pretty |= cli.pretty;
    config.concurrent |= cli.concurrent;
    let output = cli.output.as_deref();

    match cli.command {
        Command::Aggregate { chunks } => {
            let chunks = slots(chunks);
            let aggregation = if config.concurrent {
                aggregate_concurrent(&chunks).await
            } else {
                aggregate(&chunks)
            };
            write_output(&aggregation.results, output, config.pretty)?;
        },
        Command::Union { precalc, analysed } => {
            let (precalc, analysed) = (slots(precalc), slots(analysed));
            let aggregation = if config.concurrent {
                union_concurrent(&precalc, &analysed).await
            } else {
                union(&precalc, &analysed)
            };
            write_output(&aggregation.results, output, config.pretty)?;
        },
        Command::Resolve {
            input,
            entries,
            entry2go,
            go_terms,
            entry2pathways,
            pathways,
        } => {
            let lookups = &mut config.lookups;
            lookups.entries = entries.or(lookups.entries.take());
            lookups.entry2go = entry2go.or(lookups.entry2go.take());
            lookups.go_terms = go_terms.or(lookups.go_terms.take());
            lookups.entry2pathways = entry2pathways.or(lookups.entry2pathways.take());
            lookups.pathways = pathways.or(lookups.pathways.take());
            config.validate()?;

            let bytes = std::fs::read(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let results: AggregatedResults = serde_json::from_slice(&bytes)
                .with_context(|| format!("{} is not an aggregated results document", input.display()))?;

            let resolver = Resolver::new(XrefTables::load(&config.lookups)?);
            let resolved = if config.concurrent {
                resolver.resolve_concurrent(results).await?
            } else {
                resolver.resolve(results)
            };

            info!(sequences = resolved.len(), matches = resolved.match_count(), "Resolution complete");
            write_output(&resolved, output, config.pretty)?;
        },
        Command::Hash { fasta } => {
            let records = parse_fasta_file(&fasta)
                .with_context(|| format!("Failed to read FASTA {}", fasta.display()))?;
            info!(sequences = records.len(), "Hashed sequences");
            write_output(&records, output, config.pretty)?;
        },
        Command::Cigar { action } => {
            let text = match action {
                CigarAction::Encode { alignment } => alignment::encode_alignment(&alignment)?,
                CigarAction::Decode { residues, runs } => alignment::decode(&residues, &runs)?,
            };
            write_text(&text, output)?;
        },
    }

    Ok(())
}
