//! Logging macros for the solver with verbosity level control.
//!
//! Nothing is emitted unless `SolverConfig::verbosity` reaches the macro's
//! level. Events go through `tracing`, so the caller decides where they end up.
//! - 0: SILENT
//! - 1: IMPROVEMENTS (new incumbents, termination)
//! - 2: CHECKS (pruned branches, rejected candidates)
//! - 3: DEBUG (per-node search internals)

pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_IMPROVEMENTS: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Log at IMPROVEMENTS level (verbosity >= 1).
#[macro_export]
macro_rules! log_improvement {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_IMPROVEMENTS {
            ::tracing::info!($($arg)*);
        }
    };
}

/// Log at CHECKS level (verbosity >= 2).
///
/// Used for: bound pruning, infeasible branches.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            ::tracing::debug!($($arg)*);
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            ::tracing::trace!($($arg)*);
        }
    };
}
