/*!
 * Logging and tracing initialization
 */

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LogLevel;
use crate::error::{Result, SkiffError};

/// Initialize structured logging on stderr. `RUST_LOG` overrides everything.
pub fn init_logging(level: LogLevel, verbose: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(level, verbose)))
        .map_err(|e| SkiffError::Config(format!("Failed to create log filter: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}

/// The default filter directive for this crate's events. `verbose` wins over
/// the configured level.
fn filter_directive(level: LogLevel, verbose: bool) -> String {
    let level = if verbose {
        Level::DEBUG
    } else {
        level.to_tracing_level()
    };
    format!("skiff={}", level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_follows_configured_level() {
        assert_eq!(filter_directive(LogLevel::Warn, false), "skiff=WARN");
        assert_eq!(filter_directive(LogLevel::Trace, false), "skiff=TRACE");
    }

    #[test]
    fn test_verbose_overrides_configured_level() {
        assert_eq!(filter_directive(LogLevel::Error, true), "skiff=DEBUG");
        assert_eq!(filter_directive(LogLevel::Info, false), "skiff=INFO");
    }
}
