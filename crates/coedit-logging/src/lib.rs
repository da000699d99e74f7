//! Tracing setup for coedit
//!
//! # Features
//!
//! - **JSONL Output**: structured JSON lines for log aggregation (default)
//! - **Pretty Console**: human-readable output for development
//! - **Participant Context**: tag spans with the participant an engine acts for
//! - **File Rotation**: daily/hourly log rotation via tracing-appender
//!
//! # Quick Start
//!
//! ```no_run
//! use coedit_logging::{CoeditSubscriberBuilder, LogConfig};
//!
//! // Development mode with pretty human-readable output
//! let _guard = CoeditSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .try_init()
//!     .expect("logging already initialized");
//! ```
//!
//! # Participant Context
//!
//! ```no_run
//! use coedit_core::ParticipantId;
//! use coedit_logging::ParticipantContextGuard;
//!
//! let alice = ParticipantId::new("alice").unwrap();
//! let _guard = ParticipantContextGuard::new(&alice);
//!
//! // Spans opened in this scope carry participant "alice"
//! let _span = tracing::info_span!("editing").entered();
//! ```

pub mod config;
pub mod context;
pub mod layers;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};
pub use context::{ParticipantContextData, ParticipantContextGuard};
pub use layers::{ParticipantContextExtension, ParticipantContextLayer};

use std::fs::{self, File};

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Errors setting up logging
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid filter directive {directive:?}: {reason}")]
    InvalidDirective { directive: String, reason: String },

    #[error("Failed to open log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Global subscriber already set: {0}")]
    AlreadyInitialized(String),
}

type Base = Layered<ParticipantContextLayer, Layered<EnvFilter, Registry>>;
type BoxedLayer = Box<dyn Layer<Base> + Send + Sync>;

/// Builder for configuring and installing the global subscriber.
///
/// Console output is JSONL by default; use [`LogConfig::development`] for
/// pretty output.
pub struct CoeditSubscriberBuilder {
    config: LogConfig,
}

impl CoeditSubscriberBuilder {
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

    /// Build the level filter: `RUST_LOG` if set, otherwise the configured
    /// default plus per-target levels.
    pub fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }

        let mut filter = EnvFilter::new(&self.config.default_level);
        for (target, level) in &self.config.targets {
            let directive = format!("{target}={level}");
            let parsed = directive.parse::<Directive>().map_err(|e| {
                LoggingError::InvalidDirective {
                    directive: directive.clone(),
                    reason: e.to_string(),
                }
            })?;
            filter = filter.add_directive(parsed);
        }
        Ok(filter)
    }

    /// Install the subscriber globally.
    ///
    /// The returned guard flushes file output and must be kept alive for as
    /// long as logging is needed. It is `None` without file output.
    ///
    /// # Errors
    ///
    /// Fails if a global subscriber is already set, a filter directive is
    /// invalid, or the log file cannot be opened.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let filter = self.env_filter()?;
        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut guard = None;

        if self.config.console.enabled {
            layers.push(self.console_layer());
        }
        if let Some(file) = &self.config.file {
            let (writer, file_guard) = file_writer(file)?;
            layers.push(self.jsonl_layer(writer));
            guard = Some(file_guard);
        }

        Registry::default()
            .with(filter)
            .with(ParticipantContextLayer::new())
            .with(layers)
            .try_init()
            .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

        Ok(guard)
    }

    /// Install the subscriber globally.
    ///
    /// # Panics
    ///
    /// Panics if [`try_init`](Self::try_init) fails.
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => panic!("failed to initialize logging: {e}"),
        }
    }

    fn console_layer(&self) -> BoxedLayer {
        let console = &self.config.console;
        if console.pretty {
            tracing_subscriber::fmt::layer()
                .with_ansi(console.ansi)
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
            .with_thread_ids(jsonl.include_thread_info)
            .with_thread_names(jsonl.include_thread_info)
            .with_writer(writer)
            .boxed()
    }
}

impl Default for CoeditSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    fs::create_dir_all(&config.directory)?;
    let rotation = match config.rotation {
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
        RotationStrategy::Never => {
            let path = config.directory.join(format!("{}.log", config.prefix));
            return Ok(tracing_appender::non_blocking(File::create(path)?));
        }
    };
    let appender = RollingFileAppender::new(rotation, &config.directory, &config.prefix);
    Ok(tracing_appender::non_blocking(appender))
}

/// Install JSONL console logging with default settings
pub fn init_default() -> Result<(), LoggingError> {
    CoeditSubscriberBuilder::new().try_init().map(drop)
}

/// Install verbose pretty console logging
pub fn init_development() -> Result<(), LoggingError> {
    CoeditSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .try_init()
        .map(drop)
}

/// Install minimal logging for tests. Safe to call from every test.
pub fn init_testing() {
    let _ = CoeditSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creation() {
        let builder = CoeditSubscriberBuilder::new();
        assert_eq!(builder.config.default_level, "info");
        assert!(!builder.config.console.pretty); // JSONL by default
    }

    #[test]
    fn test_builder_with_config() {
        let builder = CoeditSubscriberBuilder::new().with_config(LogConfig::development());
        assert_eq!(builder.config.default_level, "debug");
        assert!(builder.config.console.pretty);
    }

    #[test]
    fn test_builder_with_level_and_console() {
        let builder = CoeditSubscriberBuilder::new()
            .with_level("trace")
            .with_console(false);
        assert_eq!(builder.config.default_level, "trace");
        assert!(!builder.config.console.enabled);
    }

    #[test]
    fn test_invalid_target_directive() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let builder = CoeditSubscriberBuilder::new()
            .with_config(LogConfig::default().with_target("coedit_sync", "not-a-level"));
        assert!(matches!(
            builder.env_filter(),
            Err(LoggingError::InvalidDirective { .. })
        ));
    }

    #[test]
    fn test_file_writer_never_rotation() {
        let directory = std::env::temp_dir().join(format!("coedit-logging-{}", uuid::Uuid::new_v4()));
        let config = FileConfig {
            directory: directory.clone(),
            prefix: "test".to_string(),
            rotation: RotationStrategy::Never,
        };

        let (_writer, guard) = file_writer(&config).unwrap();
        drop(guard);
        assert!(directory.join("test.log").exists());
        let _ = fs::remove_dir_all(directory);
    }
}
