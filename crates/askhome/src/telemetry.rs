//! Tracing setup for hosts that embed the dispatcher.
//!
//! Dispatch events are emitted under the `askhome::dispatch` target: inbound
//! and outbound envelopes at debug, domain errors at info and fatal handler
//! failures at warn. Unless the configured filter already has a directive for
//! this crate, [`dispatch_filter`] adds `askhome::dispatch=info`, so a quiet
//! global filter such as `warn` still reports the errors sent back to the
//! platform.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::Subscriber;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::filter::{Directive, ParseError};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::EnvFilter;

use askhome_config::{Config, LogFormat};

use crate::DISPATCH_TARGET;

/// Level the dispatch target is enabled at when the filter does not say.
pub const DISPATCH_DEFAULT_LEVEL: &str = "info";

static GLOBAL_SUBSCRIBER: OnceCell<()> = OnceCell::new();

/// Boxed subscriber produced from a [`Config`].
pub type BoxedSubscriber = Box<dyn Subscriber + Send + Sync>;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured log filter expression does not parse.
    #[error("invalid log filter {filter:?}: {source}")]
    Filter {
        /// Rejected filter expression.
        filter: String,
        /// Parser failure.
        #[source]
        source: ParseError,
    },
    /// Another global subscriber is already installed.
    #[error("failed to install the global subscriber: {0}")]
    Install(#[from] SetGlobalDefaultError),
}

/// Parses `filter`, adding the dispatch directive when the crate is not
/// configured explicitly.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when the expression does not parse.
pub fn dispatch_filter(filter: &str) -> Result<EnvFilter, TelemetryError> {
    let rejected = |source| TelemetryError::Filter {
        filter: filter.to_owned(),
        source,
    };
    let env_filter = EnvFilter::try_new(filter).map_err(rejected)?;
    if names_this_crate(filter) {
        return Ok(env_filter);
    }
    let directive: Directive = format!("{DISPATCH_TARGET}={DISPATCH_DEFAULT_LEVEL}")
        .parse()
        .map_err(rejected)?;
    Ok(env_filter.add_directive(directive))
}

fn names_this_crate(filter: &str) -> bool {
    filter
        .split(',')
        .any(|directive| directive.trim_start().starts_with(env!("CARGO_PKG_NAME")))
}

/// Builds a subscriber for `config` that writes to `writer` without colour.
///
/// Hosts that ship logs somewhere other than stderr, and tests capturing
/// dispatch events, install the result with
/// [`tracing::subscriber::with_default`] or as the global default.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when the configured filter is invalid.
pub fn subscriber<W>(config: &Config, writer: W) -> Result<BoxedSubscriber, TelemetryError>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    build_subscriber(config, writer, false)
}

/// Installs a stderr subscriber as the global default on first use.
///
/// Later calls are no-ops, so a function host may call this at the top of
/// every invocation.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when the filter is invalid and
/// [`TelemetryError::Install`] when another global subscriber exists.
pub fn initialise(config: &Config) -> Result<(), TelemetryError> {
    GLOBAL_SUBSCRIBER
        .get_or_try_init(|| {
            let stderr_subscriber =
                build_subscriber(config, io::stderr, io::stderr().is_terminal())?;
            tracing::subscriber::set_global_default(stderr_subscriber)?;
            Ok(())
        })
        .map(|_| ())
}

fn build_subscriber<W>(
    config: &Config,
    writer: W,
    ansi: bool,
) -> Result<BoxedSubscriber, TelemetryError>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let builder = fmt::Subscriber::builder()
        .with_env_filter(dispatch_filter(config.log_filter())?)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_timer(fmt::time::UtcTime::rfc_3339());
    let built: BoxedSubscriber = match config.log_format() {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    };
    Ok(built)
}
