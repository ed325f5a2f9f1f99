//! Solve entry point: wires the tracker, runs the search and classifies the result.

use std::panic;
use std::thread;

use crate::calendar::RosterModel;
use crate::config::SolverConfig;
use crate::incumbent::{CancellationToken, ImprovementObserver, IncumbentTracker};
use crate::models::{SolveResult, SolveStatus};
use crate::{log_checks, log_improvement};

use super::engine::{BranchAndBound, Flow};
use super::parallel::search_parallel;
use super::state::SearchState;

/// Exact rota solver.
#[derive(Clone, Debug, Default)]
pub struct Solver {
    config: SolverConfig,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Find an assignment minimizing the sample variance of shift counts.
    ///
    /// `observer` sees every strictly improving incumbent. Cancelling `cancel`
    /// (from any thread, or from inside the observer) ends the search at its
    /// next check with a [`SolveStatus::BestEffort`] result.
    pub fn solve(
        &self,
        model: &RosterModel,
        observer: Option<&dyn ImprovementObserver>,
        cancel: Option<&CancellationToken>,
    ) -> SolveResult {
        let verbosity = self.config.verbosity;
        let token = cancel.cloned().unwrap_or_default();
        let tracker = IncumbentTracker::new(
            model.person_count(),
            model.horizon_len(),
            &self.config,
            observer,
            token,
        );

        log_checks!(
            verbosity,
            "Solving {} day(s) for {} person(s), cooldown {} day(s) ({})",
            model.horizon_len(),
            model.person_count(),
            model.cooldown_days(),
            if model.cooldown_enforced() {
                "enforced"
            } else {
                "longer than horizon"
            }
        );

        let (flow, mut stats) = if self.config.workers > 1 {
            search_parallel(model, &tracker, self.config.workers, verbosity)
        } else {
            let mut engine = BranchAndBound::new(model, &tracker, verbosity);
            let mut state = SearchState::new(model);
            let flow = engine.run(&mut state);
            (flow, engine.into_stats())
        };

        stats.elapsed = tracker.elapsed();
        stats.improvements = tracker.improvements();
        let incumbent = tracker.best_so_far();
        let status = match (flow, &incumbent) {
            (Flow::Stop, _) => {
                stats.stop_reason = tracker.stop_reason();
                SolveStatus::BestEffort
            }
            (Flow::Continue, Some(_)) => SolveStatus::Optimal,
            (Flow::Continue, None) => SolveStatus::Infeasible,
        };

        log_improvement!(
            verbosity,
            "Search finished: {} ({:?}) after {} node(s), {} improvement(s), {:?}",
            status.as_str(),
            stats.stop_reason,
            stats.nodes,
            stats.improvements,
            stats.elapsed
        );

        let (assignment, objective) = match incumbent {
            Some(inc) => (Some(inc.assignment), Some(inc.objective)),
            None => (None, None),
        };
        SolveResult {
            status,
            assignment,
            objective,
            stats,
        }
    }

    /// Solve on a scoped worker thread while the calling thread polls
    /// `interrupted` until the worker finishes.
    ///
    /// The first poll returning true cancels `cancel`, so the worker winds
    /// down with a best-effort result. `interrupted` should block for a short
    /// interval per call; the observer may need the calling thread to be idle
    /// in between (for example to take an interpreter lock).
    pub fn solve_interruptible<P>(
        &self,
        model: &RosterModel,
        observer: Option<&dyn ImprovementObserver>,
        cancel: &CancellationToken,
        mut interrupted: P,
    ) -> SolveResult
    where
        P: FnMut() -> bool,
    {
        thread::scope(|scope| {
            let worker = scope.spawn(|| self.solve(model, observer, Some(cancel)));
            while !worker.is_finished() {
                if interrupted() && !cancel.is_cancelled() {
                    log_checks!(self.config.verbosity, "Interrupt received, cancelling search");
                    cancel.cancel();
                }
            }
            match worker.join() {
                Ok(result) => result,
                Err(payload) => panic::resume_unwind(payload),
            }
        })
    }
}

/// Solve with the default configuration.
pub fn solve(
    model: &RosterModel,
    observer: Option<&dyn ImprovementObserver>,
    cancel: Option<&CancellationToken>,
) -> SolveResult {
    Solver::default().solve(model, observer, cancel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::verify;
    use crate::incumbent::Improvement;
    use crate::leave::LeaveSet;
    use crate::models::{Assignment, StopReason};
    use crate::objective::sample_variance;
    use chrono::{Days, NaiveDate};
    use proptest::prelude::*;
    use std::sync::Mutex;
    use std::thread;
    use std::time::{Duration, Instant};

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    const PEOPLE: [&str; 4] = ["John", "Peter", "Mary", "Josh"];

    fn february_leave() -> LeaveSet {
        let mut leave = LeaveSet::new();
        leave
            .add_period("John", d(2024, 2, 1), d(2024, 2, 3))
            .add_day("Peter", d(2024, 2, 8))
            .add_day("Peter", d(2024, 2, 11))
            .add_period("Mary", d(2024, 2, 26), d(2024, 2, 28))
            .add_day("Josh", d(2024, 2, 15));
        leave
    }

    fn february(leave: &LeaveSet) -> RosterModel {
        RosterModel::new(&PEOPLE, d(2024, 2, 1), d(2024, 2, 28), leave, 3).unwrap()
    }

    #[test]
    fn test_leading_leave_is_balanced() {
        let mut leave = LeaveSet::new();
        leave.add_period("John", d(2024, 2, 1), d(2024, 2, 3));
        let model = february(&leave);

        let result = solve(&model, None, None);
        assert_eq!(result.status, SolveStatus::Optimal);
        assert_eq!(result.objective, Some(0.0));
        let assignment = result.assignment.unwrap();
        assert_eq!(assignment.shift_counts(4), vec![7, 7, 7, 7]);
        assert_eq!(verify(&model, &assignment), Ok(()));
        for day in 0..3 {
            assert_ne!(assignment.person_on(day), Some(0));
        }
        assert_eq!(result.stats.stop_reason, StopReason::Exhausted);
    }

    #[test]
    fn test_full_leave_calendar_notifications() {
        let model = february(&february_leave());
        let seen = Mutex::new(Vec::<Improvement>::new());
        let observer = |imp: &Improvement| seen.lock().unwrap().push(imp.clone());

        let result = solve(&model, Some(&observer), None);
        assert_eq!(result.status, SolveStatus::Optimal);
        assert_eq!(result.objective, Some(0.0));

        let seen = seen.into_inner().unwrap();
        assert!(!seen.is_empty());
        assert_eq!(seen.len() as u64, result.stats.improvements);
        for (i, imp) in seen.iter().enumerate() {
            assert_eq!(imp.sequence, i as u64 + 1);
            assert_eq!(verify(&model, &imp.assignment), Ok(()));
        }
        for pair in seen.windows(2) {
            assert!(pair[1].objective < pair[0].objective);
        }
        let last = seen.last().unwrap();
        assert_eq!(Some(&last.assignment), result.assignment.as_ref());
        assert_eq!(Some(last.objective), result.objective);

        let rows = result.rows(&model);
        assert_eq!(rows.len(), 28);
        assert_eq!(rows[0].date, d(2024, 2, 1));
        assert_eq!(rows[0].weekday, "Thursday");
        assert_ne!(rows[0].person, "John");
        assert_ne!(rows[27].person, "Mary");
    }

    #[test]
    fn test_forced_imbalance() {
        // Three people under a 3-day window must strictly rotate: 4, 3, 3.
        let model = RosterModel::new(
            &["A", "B", "C"],
            d(2024, 3, 1),
            d(2024, 3, 10),
            &LeaveSet::new(),
            3,
        )
        .unwrap();
        let result = solve(&model, None, None);
        assert_eq!(result.status, SolveStatus::Optimal);
        assert!((result.objective.unwrap() - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(
            result.assignment.unwrap().as_slice(),
            &[0, 1, 2, 0, 1, 2, 0, 1, 2, 0]
        );
    }

    #[test]
    fn test_infeasible_without_cancellation() {
        // Two people cannot cover three days when each needs a 3-day gap.
        let model =
            RosterModel::new(&["A", "B"], d(2024, 3, 1), d(2024, 3, 3), &LeaveSet::new(), 3)
                .unwrap();
        let result = solve(&model, None, None);
        assert_eq!(result.status, SolveStatus::Infeasible);
        assert!(result.assignment.is_none());
        assert!(result.objective.is_none());
        assert_eq!(result.stats.stop_reason, StopReason::Exhausted);
        assert_eq!(result.stats.improvements, 0);
    }

    #[test]
    fn test_window_longer_than_horizon_is_relaxed() {
        let model =
            RosterModel::new(&["A", "B"], d(2024, 3, 1), d(2024, 3, 3), &LeaveSet::new(), 5)
                .unwrap();
        let result = solve(&model, None, None);
        assert_eq!(result.status, SolveStatus::Optimal);
        assert_eq!(result.objective, Some(0.5));
    }

    #[test]
    fn test_cancelled_before_start() {
        let model = february(&february_leave());
        let token = CancellationToken::new();
        token.cancel();

        let result = solve(&model, None, Some(&token));
        assert_eq!(result.status, SolveStatus::BestEffort);
        assert!(result.assignment.is_none());
        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
    }

    #[test]
    fn test_cancel_from_observer_keeps_incumbent() {
        let model = RosterModel::new(
            &["A", "B", "C"],
            d(2024, 3, 1),
            d(2024, 3, 4),
            &LeaveSet::new(),
            1,
        )
        .unwrap();
        let token = CancellationToken::new();
        let observer = |_: &Improvement| token.cancel();

        let result = solve(&model, Some(&observer), Some(&token));
        assert_eq!(result.status, SolveStatus::BestEffort);
        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
        assert_eq!(result.stats.improvements, 1);
        let assignment = result.assignment.unwrap();
        assert_eq!(assignment.as_slice(), &[0, 1, 2, 0]);
        assert!((result.objective.unwrap() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_node_limit_is_best_effort() {
        let model = february(&february_leave());
        let solver = Solver::new(SolverConfig::default().with_node_limit(5));
        let token = CancellationToken::new();
        let result = solver.solve(&model, None, Some(&token));
        assert_eq!(result.status, SolveStatus::BestEffort);
        assert_eq!(result.stats.stop_reason, StopReason::NodeLimit);
        assert!(result.assignment.is_none());
        // Limits stop this solve only; the caller's token stays usable.
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_time_limit_is_best_effort() {
        let model = february(&february_leave());
        let solver = Solver::new(SolverConfig::default().with_time_limit(Duration::ZERO));
        let result = solver.solve(&model, None, None);
        assert_eq!(result.status, SolveStatus::BestEffort);
        assert_eq!(result.stats.stop_reason, StopReason::TimeLimit);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let leave = february_leave();
        let model = february(&leave);
        let sequential = solve(&model, None, None);
        let parallel =
            Solver::new(SolverConfig::default().with_workers(4)).solve(&model, None, None);

        assert_eq!(parallel.status, SolveStatus::Optimal);
        assert_eq!(parallel.objective, sequential.objective);
        assert_eq!(verify(&model, parallel.assignment.as_ref().unwrap()), Ok(()));

        let three = RosterModel::new(
            &["A", "B", "C"],
            d(2024, 3, 1),
            d(2024, 3, 10),
            &LeaveSet::new(),
            3,
        )
        .unwrap();
        let parallel =
            Solver::new(SolverConfig::default().with_workers(3)).solve(&three, None, None);
        assert_eq!(parallel.status, SolveStatus::Optimal);
        assert!((parallel.objective.unwrap() - 1.0 / 3.0).abs() < 1e-9);
    }

    /// Nine people over four months with staggered short leave.
    fn nine_person_model() -> RosterModel {
        let names: Vec<String> = (0..9).map(|i| format!("P{i}")).collect();
        let start = d(2024, 1, 1);
        let mut leave = LeaveSet::new();
        for (i, name) in names.iter().enumerate() {
            let first = start + Days::new((i * 13 % 90) as u64);
            leave.add_period(name.as_str(), first, first + Days::new(i as u64 % 4));
        }
        RosterModel::new(&names, start, d(2024, 4, 30), &leave, 4).unwrap()
    }

    /// Four people over 45 days where A and B are both away Feb 10-12: the
    /// 3-day window needs three different people there but only C and D remain.
    fn squeezed_model() -> RosterModel {
        let mut leave = LeaveSet::new();
        leave
            .add_period("A", d(2024, 2, 10), d(2024, 2, 12))
            .add_period("B", d(2024, 2, 10), d(2024, 2, 12))
            .add_day("C", d(2024, 1, 20))
            .add_day("D", d(2024, 1, 27));
        RosterModel::new(&["A", "B", "C", "D"], d(2024, 1, 1), d(2024, 2, 14), &leave, 3)
            .unwrap()
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let model = nine_person_model();
        let token = CancellationToken::new();

        let began = Instant::now();
        let result = thread::scope(|scope| {
            let canceller = token.clone();
            scope.spawn(move || {
                thread::sleep(Duration::from_millis(20));
                canceller.cancel();
            });
            solve(&model, None, Some(&token))
        });

        assert!(began.elapsed() < Duration::from_secs(10));
        assert!(matches!(
            result.status,
            SolveStatus::BestEffort | SolveStatus::Optimal
        ));
        if let Some(assignment) = &result.assignment {
            assert_eq!(verify(&model, assignment), Ok(()));
        }
    }

    #[test]
    fn test_long_infeasible_horizon_is_proved() {
        let model = squeezed_model();
        for workers in [1, 4] {
            // The limit turns a stalled search into a failed assertion.
            let config = SolverConfig::default()
                .with_workers(workers)
                .with_time_limit(Duration::from_secs(10));
            let began = Instant::now();
            let result = Solver::new(config).solve(&model, None, None);

            assert_eq!(result.status, SolveStatus::Infeasible, "workers={workers}");
            assert_eq!(result.stats.stop_reason, StopReason::Exhausted);
            assert!(result.assignment.is_none());
            assert!(result.stats.nodes < 100, "nodes={}", result.stats.nodes);
            assert!(began.elapsed() < Duration::from_secs(5));
        }
    }

    #[test]
    fn test_parallel_cancel_is_best_effort() {
        let parallel = Solver::new(SolverConfig::default().with_workers(4));

        let cancelled = CancellationToken::new();
        cancelled.cancel();
        let began = Instant::now();
        let result = parallel.solve(&february(&february_leave()), None, Some(&cancelled));
        assert!(began.elapsed() < Duration::from_secs(5));
        assert_eq!(result.status, SolveStatus::BestEffort);
        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
        assert!(result.assignment.is_none());

        // Each worker that reports an incumbent waits for the cancellation, so
        // the search cannot run to completion first.
        let model = nine_person_model();
        let token = CancellationToken::new();
        let observer = |_: &Improvement| {
            while !token.is_cancelled() {
                thread::sleep(Duration::from_millis(1));
            }
        };
        let began = Instant::now();
        let result = thread::scope(|scope| {
            let canceller = token.clone();
            scope.spawn(move || {
                thread::sleep(Duration::from_millis(20));
                canceller.cancel();
            });
            parallel.solve(&model, Some(&observer), Some(&token))
        });

        assert!(began.elapsed() < Duration::from_secs(10));
        assert_eq!(result.status, SolveStatus::BestEffort);
        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
        if let Some(assignment) = &result.assignment {
            assert_eq!(verify(&model, assignment), Ok(()));
        }
    }

    #[test]
    fn test_interrupt_poll_cancels_search() {
        let model = RosterModel::new(
            &["A", "B", "C"],
            d(2024, 3, 1),
            d(2024, 3, 4),
            &LeaveSet::new(),
            1,
        )
        .unwrap();
        let token = CancellationToken::new();
        // Hold the worker at its first incumbent until the poll cancels.
        let observer = |_: &Improvement| {
            while !token.is_cancelled() {
                thread::sleep(Duration::from_millis(1));
            }
        };

        let mut polls = 0;
        let result = Solver::default().solve_interruptible(&model, Some(&observer), &token, || {
            thread::sleep(Duration::from_millis(2));
            polls += 1;
            polls >= 3
        });

        assert!(polls >= 3);
        assert!(token.is_cancelled());
        assert_eq!(result.status, SolveStatus::BestEffort);
        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
        assert_eq!(result.assignment.unwrap().as_slice(), &[0, 1, 2, 0]);
    }

    #[test]
    fn test_interrupt_poll_before_any_incumbent() {
        // No cover exists, so nothing is ever reported; the poll alone must
        // end the search if it is still running.
        let model = squeezed_model();
        let token = CancellationToken::new();
        let result = Solver::default().solve_interruptible(&model, None, &token, || {
            thread::sleep(Duration::from_millis(1));
            true
        });
        assert!(result.assignment.is_none());
        assert!(matches!(
            result.status,
            SolveStatus::BestEffort | SolveStatus::Infeasible
        ));
    }

    #[test]
    fn test_interrupt_poll_without_interrupt() {
        let model = february(&february_leave());
        let token = CancellationToken::new();
        let result = Solver::default().solve_interruptible(&model, None, &token, || {
            thread::sleep(Duration::from_millis(1));
            false
        });
        assert!(!token.is_cancelled());
        assert_eq!(result.status, SolveStatus::Optimal);
        assert_eq!(result.objective, Some(0.0));
    }

    /// Minimum sample variance over every complete assignment, by enumeration.
    fn brute_force(model: &RosterModel) -> Option<f64> {
        let n = model.person_count();
        let days = model.horizon_len();
        let mut best: Option<f64> = None;
        let mut digits = vec![0u32; days];
        loop {
            let assignment = Assignment::new(digits.clone());
            if verify(model, &assignment).is_ok() {
                let variance = sample_variance(&assignment.shift_counts(n)).unwrap();
                if best.map_or(true, |b| variance < b) {
                    best = Some(variance);
                }
            }
            let mut i = 0;
            loop {
                if i == days {
                    return best;
                }
                digits[i] += 1;
                if (digits[i] as usize) < n {
                    break;
                }
                digits[i] = 0;
                i += 1;
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_solver_matches_enumeration(
            persons in 2usize..=4,
            days in 1u64..=7,
            window in 1usize..=4,
            leave_cells in prop::collection::vec((0usize..4, 0u64..7), 0..6),
            workers in 1usize..=2,
        ) {
            let names: Vec<String> = (0..persons).map(|i| format!("P{i}")).collect();
            let start = d(2024, 5, 1);
            let mut leave = LeaveSet::new();
            for (person, day) in leave_cells {
                if person < persons && day < days {
                    leave.add_day(names[person].as_str(), start + Days::new(day));
                }
            }
            let end = start + Days::new(days - 1);
            let model = RosterModel::new(&names, start, end, &leave, window);
            prop_assume!(model.is_ok());
            let model = model.unwrap();

            let solver = Solver::new(SolverConfig::default().with_workers(workers));
            let result = solver.solve(&model, None, None);
            match brute_force(&model) {
                None => {
                    prop_assert_eq!(result.status, SolveStatus::Infeasible);
                    prop_assert!(result.assignment.is_none());
                }
                Some(expected) => {
                    prop_assert_eq!(result.status, SolveStatus::Optimal);
                    let assignment = result.assignment.as_ref().unwrap();
                    prop_assert_eq!(verify(&model, assignment), Ok(()));
                    prop_assert!((result.objective.unwrap() - expected).abs() < 1e-9);
                }
            }
        }
    }
}
