//! Exact on-call rota optimizer.
//!
//! Assigns exactly one person to every day of a date horizon, respecting leave
//! and a cooldown window between a person's duties, and minimizes the sample
//! variance of per-person shift counts with a branch-and-bound search.
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use rota_rust::{solve, LeaveSet, RosterModel, SolveStatus};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
//! let mut leave = LeaveSet::new();
//! leave.add_period("John", start, NaiveDate::from_ymd_opt(2024, 2, 3).unwrap());
//!
//! let people = ["John", "Peter", "Mary", "Josh"];
//! let model = RosterModel::with_default_cooldown(&people, start, end, &leave)?;
//! let result = solve(&model, None, None);
//! assert_eq!(result.status, SolveStatus::Optimal);
//! for row in result.rows(&model) {
//!     println!("{} {} {}", row.date, row.weekday, row.person);
//! }
//! # Ok::<(), rota_rust::ConfigurationError>(())
//! ```

// Allow clippy warning triggered by PyO3 macro expansion
#![cfg_attr(feature = "python", allow(clippy::useless_conversion))]

#[cfg(feature = "python")]
use pyo3::prelude::*;

pub mod calendar;
mod config;
pub mod constraints;
pub mod incumbent;
mod interner;
pub mod leave;
pub mod logging;
mod models;
pub mod objective;
#[cfg(feature = "python")]
mod python;
pub mod search;

pub use calendar::{ConfigurationError, RosterModel, DEFAULT_COOLDOWN_DAYS};
pub use config::SolverConfig;
pub use constraints::{can_assign, verify, Violation};
pub use incumbent::{
    CancellationToken, ChannelObserver, Improvement, ImprovementObserver, Incumbent,
    IncumbentTracker,
};
pub use interner::{PersonIdx, PersonInterner};
pub use leave::{LeavePeriods, LeaveSet};
pub use models::{
    weekday_name, Assignment, PartialAssignment, ScheduleRow, SearchStats, SolveResult,
    SolveStatus, StopReason,
};
pub use objective::{sample_variance, ShiftTally};
pub use search::{solve, Solver};

/// The rota.rust Python module.
#[cfg(feature = "python")]
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Data types
    m.add_class::<python::PyScheduleRow>()?;
    m.add_class::<python::PySolveResult>()?;

    // Config types
    m.add_class::<python::PySolverConfig>()?;

    // Algorithms
    m.add_function(wrap_pyfunction!(python::solve_roster, m)?)?;

    Ok(())
}
