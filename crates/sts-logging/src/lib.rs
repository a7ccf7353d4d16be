//! JSONL and console logging for the STS entity layer
//!
//! A harness run spins up switches, hosts and controller processes side by
//! side; this crate sets up one subscriber for all of them.
//!
//! # Features
//!
//! - **JSONL Output**: Structured JSON lines on the console by default
//! - **Entity Context**: [`EntityContextGuard`] names the switch, host or
//!   controller a scope is working on; records logged in the scope carry it
//!   through an `entity` span
//! - **File Output**: Daily/hourly rotation via tracing-appender
//! - **Per-target filters**: e.g. silence `sts::controller_output`
//!
//! # Quick Start
//!
//! ```ignore
//! use sts_logging::{LogConfig, StsSubscriberBuilder};
//!
//! // Pretty console output for local runs
//! let _guard = StsSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .try_init()?;
//! ```

pub mod config;
pub mod context;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};
pub use context::{EntityContextData, EntityContextGuard, EntityKind};
pub use tracing_appender::non_blocking::WorkerGuard;

use std::fs::{self, File};

use thiserror::Error;
use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Errors raised while installing the global subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to create rolling log appender: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    #[error("Invalid filter directive: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("A global subscriber is already installed: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Builder for configuring and installing the global subscriber
///
/// By default console output is JSONL. Use [`LogConfig::development()`] for
/// human-readable output.
pub struct StsSubscriberBuilder {
    config: LogConfig,
}

impl StsSubscriberBuilder {
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Install the subscriber globally
    ///
    /// The returned guard flushes the file writer when dropped and must be
    /// held for as long as logging should reach the file.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(self.config.filter_directives())?,
        };

        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut guard = None;

        if self.config.console.enabled {
            layers.push(self.console_layer());
        }

        if let Some(file_config) = &self.config.file {
            let (writer, file_guard) = file_writer(file_config)?;
            layers.push(self.jsonl_layer(writer));
            guard = Some(file_guard);
        }

        Registry::default().with(layers).with(env_filter).try_init()?;
        Ok(guard)
    }

    fn console_layer(&self) -> BoxedLayer {
        if self.config.console.pretty {
            tracing_subscriber::fmt::layer()
                .with_ansi(self.config.console.ansi)
                .with_target(true)
                .boxed()
        } else {
            self.jsonl_layer(std::io::stdout)
        }
    }

    fn jsonl_layer<W>(&self, writer: W) -> BoxedLayer
    where
        W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
    {
        let jsonl = &self.config.jsonl;
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(jsonl.include_spans)
            .flatten_event(jsonl.flatten_events)
            .with_file(jsonl.include_location)
            .with_line_number(jsonl.include_location)
            .with_writer(writer)
            .boxed()
    }
}

impl Default for StsSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// File writer: truncates for `Never` rotation, appends for the others
fn file_writer(file_config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    let rotation = match file_config.rotation {
        RotationStrategy::Never => {
            fs::create_dir_all(&file_config.directory)?;
            let path = file_config
                .directory
                .join(format!("{}.log", file_config.prefix));
            return Ok(tracing_appender::non_blocking(File::create(path)?));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };

    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(&file_config.prefix)
        .filename_suffix("log")
        .build(&file_config.directory)?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize logging with default settings (JSONL to console)
pub fn init_default() -> Result<(), LoggingError> {
    StsSubscriberBuilder::new().try_init().map(|_| ())
}

/// Initialize logging for development (verbose, pretty console output)
pub fn init_development() -> Result<(), LoggingError> {
    StsSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .try_init()
        .map(|_| ())
}

/// Initialize logging for tests; a second call is a no-op
pub fn init_testing() {
    let _ = StsSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}
