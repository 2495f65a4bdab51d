//! Logging initialization using `tracing` and `tracing-subscriber`.
//!
//! Output is controlled by:
//! - [`EnvFilter`]: the `RUST_LOG` filter directives
//! - [`LogFormat`]: the `COGMOSAIC_FORMAT` output format (json, full, compact, bare, pretty)

use std::str::FromStr;

use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

/// Log output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, single-line logs.
    Full,
    /// A variant of [`LogFormat::Full`] optimized for short line lengths.
    Compact,
    /// Short lines without timestamps, targets or ANSI colors.
    Bare,
    /// Multi-line logs for local development.
    Pretty,
    /// Newline-delimited JSON.
    Json,
}

impl LogFormat {
    /// Install the global subscriber for this format.
    ///
    /// Sets the dispatcher directly so that `tracing-subscriber` does not
    /// install a second `LogTracer` next to the `log` bridge.
    pub fn init(self, env_filter: EnvFilter) {
        let dispatch = match self {
            Self::Full => tracing_subscriber::fmt()
                .with_span_events(FmtSpan::NONE)
                .with_env_filter(env_filter)
                .finish()
                .into(),
            Self::Compact => tracing_subscriber::fmt()
                .compact()
                .with_span_events(FmtSpan::NONE)
                .with_env_filter(env_filter)
                .finish()
                .into(),
            Self::Pretty => tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(env_filter)
                .finish()
                .into(),
            Self::Bare => tracing_subscriber::fmt()
                .compact()
                .with_span_events(FmtSpan::NONE)
                .without_time()
                .with_target(false)
                .with_ansi(false)
                .with_env_filter(env_filter)
                .finish()
                .into(),
            Self::Json => tracing_subscriber::fmt()
                .json()
                .with_span_events(FmtSpan::NONE)
                .with_env_filter(env_filter)
                .finish()
                .into(),
        };
        if let Err(e) = tracing::dispatcher::set_global_default(dispatch) {
            eprintln!("Warning: unable to set the global log subscriber: {e}");
        }
    }
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Compact
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "compact" => Ok(Self::Compact),
            "pretty" | "verbose" => Ok(Self::Pretty),
            "bare" => Ok(Self::Bare),
            "json" | "jsonl" => Ok(Self::Json),
            _ => Err(format!(
                "Invalid log format '{s}'. Valid options: json, full, compact, bare or pretty"
            )),
        }
    }
}

/// Forward `log` records, e.g. from `actix-server`, into `tracing`.
fn init_log_bridge(env_filter: &EnvFilter) {
    let mut log_builder = tracing_log::LogTracer::builder()
        .with_interest_cache(tracing_log::InterestCacheConfig::default());
    if let Some(Some(max_level)) = env_filter.max_level_hint().map(LevelFilter::into_level) {
        let max_level = match max_level {
            Level::TRACE => log::LevelFilter::Trace,
            Level::DEBUG => log::LevelFilter::Debug,
            Level::INFO => log::LevelFilter::Info,
            Level::WARN => log::LevelFilter::Warn,
            Level::ERROR => log::LevelFilter::Error,
        };
        log_builder = log_builder.with_max_level(max_level);
    }
    if let Err(e) = log_builder.init() {
        eprintln!("Warning: unable to forward log records to tracing: {e}");
    }
}

/// Initialize the global tracing subscriber for the given filter and format.
///
/// An invalid filter falls back to `debug`, an invalid format to [`LogFormat::default`].
pub fn init_tracing(filter: &str, format: Option<String>) {
    let env_filter = EnvFilter::from_str(filter).unwrap_or_else(|_| {
        eprintln!("Warning: Invalid log filter '{filter}', logging everything at debug level");
        EnvFilter::new("debug")
    });

    let log_format = format
        .and_then(|s| {
            s.parse::<LogFormat>()
                .map_err(|e| {
                    eprintln!("Warning: {e}");
                    eprintln!(
                        "Falling back to default format ({:?})",
                        LogFormat::default()
                    );
                })
                .ok()
        })
        .unwrap_or_default();

    init_log_bridge(&env_filter);
    log_format.init(env_filter);
}

/// Mirror the level given for `replacement` (e.g. `cogmosaic=`) onto `cogmosaic_core`,
/// unless the filter already names the core crate.
#[must_use]
pub fn ensure_core_log_level_matches(
    env_filter: Option<String>,
    replacement: &'static str,
) -> String {
    let Some(rust_log) = env_filter else {
        return format!("{replacement}info,cogmosaic_core=info");
    };
    if rust_log.contains("cogmosaic_core=") {
        return rust_log;
    }
    match rust_log
        .split(',')
        .find_map(|directive| directive.strip_prefix(replacement))
    {
        Some(level) => format!("{rust_log},cogmosaic_core={level}"),
        None => rust_log,
    }
}
