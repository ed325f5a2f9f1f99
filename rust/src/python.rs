//! PyO3 bindings for the rota solver.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use pyo3::exceptions::{PyKeyboardInterrupt, PyValueError};
use pyo3::prelude::*;

use crate::calendar::{RosterModel, DEFAULT_COOLDOWN_DAYS};
use crate::config::SolverConfig;
use crate::incumbent::{CancellationToken, Improvement, ImprovementObserver};
use crate::leave::LeaveSet;
use crate::models::{Assignment, ScheduleRow, SolveResult};
use crate::search::Solver;

/// Time between checks for a pending KeyboardInterrupt during a solve.
const SIGNAL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Solver configuration (PyO3 wrapper).
#[pyclass(name = "SolverConfig")]
#[derive(Clone, Debug)]
pub struct PySolverConfig {
    #[pyo3(get, set)]
    pub verbosity: u8,
    #[pyo3(get, set)]
    pub time_limit_secs: Option<f64>,
    #[pyo3(get, set)]
    pub node_limit: Option<u64>,
    #[pyo3(get, set)]
    pub workers: usize,
}

#[pymethods]
impl PySolverConfig {
    #[new]
    #[pyo3(signature = (verbosity=0, time_limit_secs=None, node_limit=None, workers=1))]
    fn new(
        verbosity: u8,
        time_limit_secs: Option<f64>,
        node_limit: Option<u64>,
        workers: usize,
    ) -> Self {
        Self {
            verbosity,
            time_limit_secs,
            node_limit,
            workers,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "SolverConfig(verbosity={}, time_limit_secs={:?}, node_limit={:?}, workers={})",
            self.verbosity, self.time_limit_secs, self.node_limit, self.workers
        )
    }
}

impl PySolverConfig {
    fn to_config(&self) -> PyResult<SolverConfig> {
        let mut config = SolverConfig::default()
            .with_verbosity(self.verbosity)
            .with_workers(self.workers);
        if let Some(secs) = self.time_limit_secs {
            let limit = Duration::try_from_secs_f64(secs).map_err(|_| {
                PyValueError::new_err(format!("Invalid time limit: {secs} seconds"))
            })?;
            config = config.with_time_limit(limit);
        }
        if let Some(nodes) = self.node_limit {
            config = config.with_node_limit(nodes);
        }
        Ok(config)
    }
}

/// One day of the rota.
#[pyclass(name = "ScheduleRow")]
#[derive(Clone, Debug)]
pub struct PyScheduleRow {
    #[pyo3(get)]
    pub date: NaiveDate,
    #[pyo3(get)]
    pub weekday: String,
    #[pyo3(get)]
    pub person: String,
}

#[pymethods]
impl PyScheduleRow {
    fn __repr__(&self) -> String {
        format!(
            "ScheduleRow(date={}, weekday={:?}, person={:?})",
            self.date, self.weekday, self.person
        )
    }
}

impl From<ScheduleRow> for PyScheduleRow {
    fn from(row: ScheduleRow) -> Self {
        Self {
            date: row.date,
            weekday: row.weekday.to_string(),
            person: row.person,
        }
    }
}

/// Outcome of `solve_roster`.
#[pyclass(name = "SolveResult")]
#[derive(Clone, Debug)]
pub struct PySolveResult {
    /// "optimal", "best_effort" or "infeasible".
    #[pyo3(get)]
    pub status: String,
    #[pyo3(get)]
    pub objective: Option<f64>,
    #[pyo3(get)]
    pub rows: Vec<PyScheduleRow>,
    #[pyo3(get)]
    pub shift_counts: HashMap<String, u32>,
    #[pyo3(get)]
    pub stop_reason: String,
    #[pyo3(get)]
    pub nodes: u64,
    #[pyo3(get)]
    pub improvements: u64,
    #[pyo3(get)]
    pub elapsed_secs: f64,
}

#[pymethods]
impl PySolveResult {
    fn __repr__(&self) -> String {
        format!(
            "SolveResult(status={:?}, objective={:?}, days={}, nodes={})",
            self.status,
            self.objective,
            self.rows.len(),
            self.nodes
        )
    }
}

impl PySolveResult {
    fn new(result: SolveResult, model: &RosterModel) -> Self {
        let shift_counts = match &result.assignment {
            Some(assignment) => model
                .persons()
                .iter()
                .cloned()
                .zip(assignment.shift_counts(model.person_count()))
                .collect(),
            None => HashMap::new(),
        };
        Self {
            status: result.status.as_str().to_string(),
            objective: result.objective,
            rows: result.rows(model).into_iter().map(Into::into).collect(),
            shift_counts,
            stop_reason: format!("{:?}", result.stats.stop_reason),
            nodes: result.stats.nodes,
            improvements: result.stats.improvements,
            elapsed_secs: result.stats.elapsed.as_secs_f64(),
        }
    }
}

/// Forwards improvements to an optional Python callback. A callback that
/// raises cancels the search.
struct PyObserver<'a> {
    model: &'a RosterModel,
    callback: Option<PyObject>,
    cancel: CancellationToken,
    /// First exception raised by the callback; re-raised after the solve.
    error: Mutex<Option<PyErr>>,
}

impl PyObserver<'_> {
    fn fail(&self, err: PyErr) {
        let mut slot = self.error.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(err);
        }
        self.cancel.cancel();
    }

    fn rows(&self, assignment: &Assignment) -> Vec<PyScheduleRow> {
        assignment
            .rows(self.model)
            .into_iter()
            .map(Into::into)
            .collect()
    }
}

impl ImprovementObserver for PyObserver<'_> {
    fn on_improvement(&self, improvement: &Improvement) {
        Python::with_gil(|py| {
            if let Some(callback) = &self.callback {
                let args = (
                    improvement.objective,
                    improvement.sequence,
                    self.rows(&improvement.assignment),
                );
                if let Err(err) = callback.call1(py, args) {
                    self.fail(err);
                }
            }
        });
    }
}

/// Build a minimum-imbalance on-call rota.
///
/// # Arguments
/// * `persons` - Ordered list of unique person names
/// * `start` / `end` - Inclusive date range to cover
/// * `leave` - Dict mapping person name to the dates they are unavailable
/// * `cooldown_days` - Window length W: at most one duty per person in any W consecutive days
/// * `config` - Solver configuration (verbosity, limits, workers)
/// * `on_improvement` - Called as `on_improvement(objective, sequence, rows)` for every
///   strictly better rota found
///
/// # Returns
/// * SolveResult; a KeyboardInterrupt during the search yields status "best_effort"
///   within about 50 ms plus the time to reach the next search check
///
/// # Raises
/// * ValueError for configuration errors (empty roster, uncoverable date, ...)
#[pyfunction]
#[pyo3(signature = (persons, start, end, leave=None, cooldown_days=DEFAULT_COOLDOWN_DAYS, config=None, on_improvement=None))]
#[allow(clippy::too_many_arguments)]
pub fn solve_roster(
    py: Python<'_>,
    persons: Vec<String>,
    start: NaiveDate,
    end: NaiveDate,
    leave: Option<HashMap<String, Vec<NaiveDate>>>,
    cooldown_days: usize,
    config: Option<PySolverConfig>,
    on_improvement: Option<PyObject>,
) -> PyResult<PySolveResult> {
    let leave = leave.map(LeaveSet::from_days).unwrap_or_default();
    let model = RosterModel::new(&persons, start, end, &leave, cooldown_days)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    let solver = match config {
        Some(config) => Solver::new(config.to_config()?),
        None => Solver::default(),
    };

    let cancel = CancellationToken::new();
    let observer = PyObserver {
        model: &model,
        callback: on_improvement,
        cancel: cancel.clone(),
        error: Mutex::new(None),
    };
    // The search runs on a worker thread; this thread sleeps without the GIL
    // between signal checks so the observer can take it.
    let interrupted = || {
        py.allow_threads(|| thread::sleep(SIGNAL_POLL_INTERVAL));
        match py.check_signals() {
            Ok(()) => false,
            Err(err) if err.is_instance_of::<PyKeyboardInterrupt>(py) => true,
            Err(err) => {
                observer.fail(err);
                true
            }
        }
    };
    let result = solver.solve_interruptible(&model, Some(&observer), &cancel, interrupted);

    let error = observer
        .error
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(err) = error {
        return Err(err);
    }
    Ok(PySolveResult::new(result, &model))
}
