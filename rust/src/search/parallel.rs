//! Parallel branch-and-bound over disjoint first-day subtrees.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crate::calendar::RosterModel;
use crate::incumbent::IncumbentTracker;
use crate::log_debug;
use crate::models::SearchStats;

use super::engine::{BranchAndBound, Flow};
use super::state::SearchState;

/// Search with up to `workers` scoped threads.
///
/// The first day's candidates, in branch order, form a shared job queue; each
/// worker claims the next one and searches that subtree with its own state.
/// All workers share the tracker, so a bound improvement found by one prunes
/// the others and a stop request reaches all of them.
pub fn search_parallel(
    model: &RosterModel,
    tracker: &IncumbentTracker<'_>,
    workers: usize,
    verbosity: u8,
) -> (Flow, SearchStats) {
    if tracker.checkpoint() {
        return (Flow::Stop, SearchStats::default());
    }

    let mut root_engine = BranchAndBound::new(model, tracker, verbosity);
    let root = SearchState::new(model);
    let mut first_day = Vec::new();
    root_engine.candidates(&root, &mut first_day);
    let mut stats = root_engine.into_stats();
    stats.nodes += 1;

    let next_job = &AtomicUsize::new(0);
    let first_day = &first_day;
    let worker_count = workers.clamp(1, first_day.len().max(1));
    log_debug!(
        verbosity,
        "Splitting {} first-day subtree(s) across {} worker(s)",
        first_day.len(),
        worker_count
    );

    let outcomes: Vec<(Flow, SearchStats)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..worker_count)
            .map(|_| {
                scope.spawn(move || {
                    let mut engine = BranchAndBound::new(model, tracker, verbosity);
                    let mut state = SearchState::new(model);
                    let flow = loop {
                        let job = next_job.fetch_add(1, Ordering::Relaxed);
                        let Some(&person) = first_day.get(job) else {
                            break Flow::Continue;
                        };
                        if tracker.should_stop() {
                            break Flow::Stop;
                        }
                        if engine.branch(&mut state, person) == Flow::Stop {
                            break Flow::Stop;
                        }
                    };
                    (flow, engine.into_stats())
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(outcome) => outcome,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    let mut flow = Flow::Continue;
    for (worker_flow, worker_stats) in &outcomes {
        if *worker_flow == Flow::Stop {
            flow = Flow::Stop;
        }
        stats.absorb(worker_stats);
        stats.improvements += worker_stats.improvements;
    }
    (flow, stats)
}
