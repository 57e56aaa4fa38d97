//! Diagnostic-aware logging configuration service.
//!
//! Without `RUST_LOG`, only WARN and ERROR logs are output unless `-v` is
//! passed or diagnostics are enabled, which raise the level at runtime.
//! With `RUST_LOG`, its filters decide and the diagnostics toggle is a flag only.

use lazy_static::lazy_static;
use log::LevelFilter;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

lazy_static! {
    /// Global diagnostics enabled state
    static ref DIAGNOSTICS_ENABLED: AtomicBool = AtomicBool::new(false);
    /// Level chosen on the command line, restored when diagnostics are turned off
    static ref BASE_LEVEL: AtomicUsize = AtomicUsize::new(LevelFilter::Warn as usize);
    /// Set when `RUST_LOG` drove the setup; its filters then own the max level
    static ref ENV_FILTERED: AtomicBool = AtomicBool::new(false);
}

pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Initialize the logging system.
/// Call this once at startup; later calls are ignored.
pub fn init_logging(verbosity: u8, diagnostics: bool) {
    let base = level_for(verbosity);
    let rust_log = std::env::var("RUST_LOG").ok();

    let mut builder = env_logger::Builder::new();
    // Let everything through the logger itself, the max level does the filtering
    builder
        .filter_level(LevelFilter::Trace)
        .format_timestamp_millis()
        .format_module_path(false);
    if let Some(filters) = &rust_log {
        builder.parse_filters(filters);
    }
    if builder.try_init().is_err() {
        return;
    }

    BASE_LEVEL.store(base as usize, Ordering::SeqCst);
    ENV_FILTERED.store(rust_log.is_some(), Ordering::SeqCst);
    set_diagnostics_enabled(diagnostics);
}

/// Set whether diagnostic logging is enabled.
/// When disabled, the level falls back to what `-v` asked for.
/// Under `RUST_LOG` only the flag changes.
pub fn set_diagnostics_enabled(enabled: bool) {
    DIAGNOSTICS_ENABLED.store(enabled, Ordering::SeqCst);
    let env_filtered = ENV_FILTERED.load(Ordering::SeqCst);
    if let Some(level) = max_level_for(enabled, base_level(), env_filtered) {
        log::set_max_level(level);
    }
}

/// Check if diagnostics are currently enabled.
pub fn is_diagnostics_enabled() -> bool {
    DIAGNOSTICS_ENABLED.load(Ordering::SeqCst)
}

fn base_level() -> LevelFilter {
    match BASE_LEVEL.load(Ordering::SeqCst) {
        0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn max_level_for(diagnostics: bool, base: LevelFilter, env_filtered: bool) -> Option<LevelFilter> {
    (!env_filtered).then(|| effective_level(diagnostics, base))
}

fn effective_level(diagnostics: bool, base: LevelFilter) -> LevelFilter {
    if diagnostics {
        base.max(LevelFilter::Debug)
    } else {
        base
    }
}
