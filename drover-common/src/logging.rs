use std::str::FromStr;

use tracing::metadata::LevelFilter;
use tracing_subscriber::{
    Layer, filter::FilterFn, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

/// Initialise the global tracing subscriber.
///
/// Events are written to stdout as one JSON record per line (timestamp,
/// severity, event name, field bag) so downstream tooling can ingest the
/// audit trail directly. Set `LOG_FORMAT=pretty` for a human-readable
/// compact layout instead, and `LOG_LEVEL` to override the default level.
pub fn init() {
    let default = if cfg!(debug_assertions) {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let level = std::env::var("LOG_LEVEL").map_or(default, |level| {
        LevelFilter::from_str(level.as_str()).unwrap_or_else(|_| {
            eprintln!("Invalid log level specified {level}, defaulting to {default}");
            default
        })
    });

    let only_drover = FilterFn::new(|metadata| metadata.target().starts_with("drover"));
    let registry = tracing_subscriber::Registry::default();

    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("pretty")) {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_file(false)
                    .with_line_number(false)
                    .compact()
                    .with_ansi(true)
                    .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                    .with_filter(level)
                    .with_filter(only_drover),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_file(false)
                    .with_line_number(false)
                    .with_ansi(false)
                    .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                    .with_filter(level)
                    .with_filter(only_drover),
            )
            .init();
    }
}
