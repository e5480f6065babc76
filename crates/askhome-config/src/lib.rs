//! Shared configuration for the askhome smart-home dispatcher.
//!
//! Configuration is layered by [`ortho_config`]: built-in defaults first, then
//! an optional configuration file, `ASKHOME_*` environment variables and
//! finally command-line flags. Only the ambient concerns live here; appliance
//! detail defaults are supplied in code when the dispatcher is built.

mod defaults;
mod logging;

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, default_log_filter, default_log_filter_string, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved configuration shared by the library and its host wrappers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "ASKHOME")]
#[serde(default)]
pub struct Config {
    /// Tracing filter expression, for example `askhome=debug`.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Output format for tracing events.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns the aggregated loader error when any layer fails to parse.
    pub fn from_environment() -> Result<Self, Arc<OrthoError>> {
        Self::load()
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format for tracing events.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}
