//! Log macros and subscriber setup shared by every herald crate
//!
//! Events are grouped under three spans: `internal` for dispatcher
//! bookkeeping, and `outgoing`/`incoming` for the SMTP conversation.

use std::str::FromStr;

use tracing::metadata::LevelFilter;
use tracing_subscriber::{
    Layer, filter::FilterFn, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

/// Environment variable that overrides the default level
pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";

#[macro_export]
macro_rules! log {
    ($level:expr, $span:expr, $($msg:expr),*) => {{
        let span = $crate::tracing::span!($level, $span);
        let _enter = span.enter();

        $crate::tracing::event!($level, $($msg),*)
    }};
}

/// A command line written to the mail server
#[macro_export]
macro_rules! outgoing {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::log!($crate::tracing::Level::$level, "outgoing", $($msg),*)
    };

    ($($msg:expr),*) => {
        $crate::outgoing!(level = TRACE, $($msg),*)
    };
}

/// A reply read back from the mail server
#[macro_export]
macro_rules! incoming {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::log!($crate::tracing::Level::$level, "incoming", $($msg),*)
    };

    ($($msg:expr),*) => {
        $crate::incoming!(level = TRACE, $($msg),*)
    };
}

/// Queue, pool and controller events
#[macro_export]
macro_rules! internal {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::log!($crate::tracing::Level::$level, "internal", $($msg),*)
    };

    ($($msg:expr),*) => {
        $crate::internal!(level = TRACE, $($msg),*)
    };
}

const fn default_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    }
}

/// Resolve the configured level, falling back to `default` when it is unset
/// or unparseable
fn resolve_level(configured: Option<&str>, default: LevelFilter) -> LevelFilter {
    let Some(configured) = configured else {
        return default;
    };

    LevelFilter::from_str(configured.trim()).unwrap_or_else(|_| {
        eprintln!("Ignoring {LOG_LEVEL_VAR}={configured}, logging at {default}");
        default
    })
}

/// Only events from the herald crates reach the output; dependency noise
/// such as rustls handshakes is dropped.
fn is_herald_target(target: &str) -> bool {
    target
        .split("::")
        .next()
        .is_some_and(|krate| krate == "herald" || krate.starts_with("herald_"))
}

/// Install the global subscriber.
///
/// `LOG_LEVEL` picks the level; without it debug builds log at TRACE and
/// release builds at INFO.
pub fn init() {
    let configured = std::env::var(LOG_LEVEL_VAR).ok();
    let level = resolve_level(configured.as_deref(), default_level());

    tracing_subscriber::Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(false)
                .with_line_number(false)
                .compact()
                .with_ansi(true)
                .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                .with_filter(level)
                .with_filter(FilterFn::new(|metadata| is_herald_target(metadata.target()))),
        )
        .init();
}
