//! Centralized logging initialization.
//!
//! The `LoggerManager` validates the logging configuration and installs the
//! global `tracing` subscriber with console and/or systemd journald layers.
//! The filter honors `RUST_LOG` when present and otherwise falls back to the
//! configured level.

use std::io;

use thiserror::Error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};
use validator::{Validate, ValidationErrors};

use crate::{
    config::logger::{ConsoleConfig, LogFormat, LoggerConfig},
    print_warn,
};

/// Errors that can occur during logger configuration or initialization.
#[derive(Error, Debug)]
pub enum LoggerError {
    /// Validation errors from the logger configuration struct.
    #[error("Logger configuration validation error: {0}")]
    ValidationError(#[from] ValidationErrors),

    /// IO error, typically during journald socket operations.
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// No output layers were successfully configured.
    #[error("No logging layers were configured or successfully initialized")]
    NoLayersConfigured,
}

/// Manages logging configuration and global subscriber initialization.
pub struct LoggerManager {
    config: LoggerConfig,
}

impl LoggerManager {
    /// Creates a new `LoggerManager`, validating the provided configuration.
    pub fn new(config: LoggerConfig) -> Result<Self, LoggerError> {
        config.validate()?;
        Ok(LoggerManager { config })
    }

    /// Initializes the global `tracing` subscriber.
    ///
    /// Must be called once at startup before any tracing macros run. When
    /// journald is enabled but its socket is unavailable (non-systemd
    /// environments, containers), the failure degrades to a warning as long
    /// as the console layer is present.
    pub fn init(&mut self) -> Result<(), LoggerError> {
        let mut layers = Vec::new();

        if let Some(console) = self.config.console.as_ref().filter(|c| c.enabled) {
            layers.push(self.console_layer(console));
        }

        if let Some(journald) = self.config.journald.as_ref().filter(|j| j.enabled) {
            match self.journald_layer() {
                Ok(layer) => layers.push(layer),
                Err(e) => {
                    print_warn!(
                        "Failed to initialize journald logger '{}': {}",
                        journald.identifier,
                        e
                    );
                }
            }
        }

        if layers.is_empty() {
            return Err(LoggerError::NoLayersConfigured);
        }

        tracing_subscriber::registry().with(layers).init();
        Ok(())
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.config.level))
    }

    /// Constructs a console output layer according to the configuration.
    fn console_layer(
        &self,
        config: &ConsoleConfig,
    ) -> Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync> {
        let writer = io::stdout;
        match config.format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_target(config.show_target)
                .with_ansi(config.ansi_colors)
                .with_writer(writer)
                .with_filter(self.filter())
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .pretty()
                .with_target(config.show_target)
                .with_ansi(config.ansi_colors)
                .with_writer(writer)
                .with_filter(self.filter())
                .boxed(),
            LogFormat::Compact => fmt::layer()
                .compact()
                .with_target(config.show_target)
                .with_ansi(config.ansi_colors)
                .with_writer(writer)
                .with_filter(self.filter())
                .boxed(),
        }
    }

    /// Constructs a journald output layer.
    fn journald_layer(
        &self,
    ) -> Result<Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>, LoggerError> {
        let layer = tracing_journald::layer()?;
        Ok(layer.with_filter(self.filter()).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::logger::JournaldConfig;

    #[test]
    fn manager_rejects_invalid_config() {
        let config = LoggerConfig {
            level: "loud".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            LoggerManager::new(config),
            Err(LoggerError::ValidationError(_))
        ));
    }

    #[test]
    fn all_outputs_disabled_is_an_error() {
        let config = LoggerConfig {
            console: None,
            journald: Some(JournaldConfig {
                enabled: false,
                identifier: "brewbee".into(),
            }),
            ..Default::default()
        };
        let mut manager = LoggerManager::new(config).unwrap();
        assert!(matches!(
            manager.init(),
            Err(LoggerError::NoLayersConfigured)
        ));
    }
}
