//! Logging Configuration and Initialization
//!
//! `tracing` setup for the ipmerge binary. Events go to stderr, to a daily log
//! file, or both, as text or JSON. stdout stays free for result documents.
//!
//! Library code only emits structured events, for example:
//!
//! ```rust,ignore
//! warn!(path = %path.display(), reason = %reason, "Skipping match chunk");
//! ```
//!
//! # Example
//!
//! ```no_run
//! use ipmerge_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     let _guard = init_logging(&config)?;
//!     tracing::info!("Pipeline started");
//!     Ok(())
//! }
//! ```

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{
        self,
        format::{DefaultFields, FmtSpan, Format},
    },
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Where log events are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogTarget {
    #[default]
    Stderr,
    File,
    Both,
}

impl LogTarget {
    fn stderr(self) -> bool {
        self != LogTarget::File
    }

    fn file(self) -> bool {
        self != LogTarget::Stderr
    }
}

impl FromStr for LogTarget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "stderr" | "console" => Ok(LogTarget::Stderr),
            "file" => Ok(LogTarget::File),
            "both" => Ok(LogTarget::Both),
            _ => Err(anyhow!("unknown log target '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow!("unknown log format '{}'", s)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub target: LogTarget,
    pub format: LogFormat,

    /// Directory for daily log files
    pub log_dir: PathBuf,

    /// File name prefix ("ipmerge" -> "ipmerge.2026-10-16")
    pub log_file_prefix: String,

    /// Extra `EnvFilter` directives, e.g. "ipmerge_core::xref=trace"
    pub directives: Vec<String>,

    /// Include file and line of each event
    pub with_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            target: LogTarget::Stderr,
            format: LogFormat::Text,
            log_dir: PathBuf::from("./logs"),
            log_file_prefix: "ipmerge".to_string(),
            directives: Vec::new(),
            with_location: false,
        }
    }
}

fn env_value<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| anyhow!("{}={}: {}", name, raw, e)),
        Err(_) => Ok(None),
    }
}

impl LogConfig {
    /// Defaults overridden by the environment, see [`LogConfig::merge_env`]
    pub fn from_env() -> Result<Self> {
        Self::default().merge_env()
    }

    /// Override fields with whichever of these variables are set:
    ///
    /// - `LOG_LEVEL`: trace, debug, info, warn, error
    /// - `LOG_TARGET`: stderr, file, both
    /// - `LOG_FORMAT`: text, json
    /// - `LOG_DIR`, `LOG_FILE_PREFIX`
    /// - `LOG_FILTER`: comma-separated filter directives
    /// - `LOG_LOCATION`: true/false
    pub fn merge_env(mut self) -> Result<Self> {
        if let Some(level) = env_value("LOG_LEVEL")? {
            self.level = level;
        }
        if let Some(target) = env_value("LOG_TARGET")? {
            self.target = target;
        }
        if let Some(format) = env_value("LOG_FORMAT")? {
            self.format = format;
        }
        if let Some(dir) = env_value::<PathBuf>("LOG_DIR")? {
            self.log_dir = dir;
        }
        if let Some(prefix) = env_value::<String>("LOG_FILE_PREFIX")? {
            self.log_file_prefix = prefix;
        }
        if let Some(filter) = env_value::<String>("LOG_FILTER")? {
            self.directives = split_directives(&filter);
        }
        if let Some(location) = env_value("LOG_LOCATION")? {
            self.with_location = location;
        }
        Ok(self)
    }

    pub fn builder() -> LogConfigBuilder {
        LogConfigBuilder::default()
    }
}

fn split_directives(filter: &str) -> Vec<String> {
    filter
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Default)]
pub struct LogConfigBuilder {
    config: LogConfig,
}

impl LogConfigBuilder {
    pub fn level(mut self, level: Level) -> Self {
        self.config.level = level;
        self
    }

    pub fn log_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.log_file_prefix = prefix.into();
        self
    }

    pub fn build(self) -> LogConfig {
        self.config
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;
type FmtLayer<W> = fmt::Layer<Registry, DefaultFields, Format, W>;

fn format_layer<W>(layer: FmtLayer<W>, format: LogFormat) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

/// Install the global subscriber
///
/// Call once at startup. Hold the returned guard until exit when file output is
/// enabled; dropping it flushes the file writer.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let mut filter = EnvFilter::from_default_env().add_directive(config.level.into());
    for directive in &config.directives {
        filter = filter.add_directive(
            directive
                .parse()
                .with_context(|| format!("Invalid filter directive '{}'", directive))?,
        );
    }

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = None;

    if config.target.stderr() {
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_file(config.with_location)
            .with_line_number(config.with_location)
            .with_span_events(FmtSpan::CLOSE);
        layers.push(format_layer(layer, config.format));
    }

    if config.target.file() {
        std::fs::create_dir_all(&config.log_dir).with_context(|| {
            format!("Failed to create log directory {}", config.log_dir.display())
        })?;

        let appender = tracing_appender::rolling::daily(&config.log_dir, &config.log_file_prefix);
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        guard = Some(file_guard);

        let layer = fmt::layer()
            .with_writer(writer)
            .with_file(config.with_location)
            .with_line_number(config.with_location)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false);
        layers.push(format_layer(layer, config.format));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
