// ============================================================================
// Logging Setup
// Console subscriber for binaries embedding the engine
// ============================================================================
//
// The library itself only emits `tracing` records: submissions open an
// `info` span carrying `submission_id`, settlements log at `info`,
// verification and resting at `debug`, rejections and faults at `warn`.
// Installing a subscriber is left to the binary; `init_logging` is a
// ready-made one behind the `logging` feature.

use tracing::Level;

/// Level from a config string, `info` when unrecognised
pub fn parse_level(level: &str) -> Level {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install a global `fmt` subscriber. Returns `false` if one was already set.
#[cfg(feature = "logging")]
pub fn init_logging(level: &str) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(parse_level(level))
        .with_target(true)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}
