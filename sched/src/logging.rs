//! Logging macros for the scheduling core with verbosity level control.
//!
//! Events are routed through `tracing`; the verbosity check happens before the
//! event is built, so a silent manager pays one integer comparison per call.
//! Verbosity levels:
//! - 0: SILENT (only warnings)
//! - 1: CHANGES (rebuilds, recalculations, rejected edits)
//! - 2: CHECKS (per-task start/finish decisions)
//! - 3: DEBUG (units intervals, graph internals)

/// Verbosity level constants.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Log at CHANGES level (verbosity >= 1).
///
/// Used for: graph rebuilds, pass boundaries, rejected edits.
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHANGES {
            ::tracing::info!($($arg)*);
        }
    };
}

/// Log at CHECKS level (verbosity >= 2).
///
/// Used for: per-task scheduling results, critical flag flips.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            ::tracing::debug!($($arg)*);
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
///
/// Used for: units interval sweeps, dependency edges, calendar walks.
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            ::tracing::trace!($($arg)*);
        }
    };
}
