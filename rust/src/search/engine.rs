//! Depth-first branch-and-bound over horizon days.

use crate::calendar::RosterModel;
use crate::constraints::can_assign;
use crate::incumbent::IncumbentTracker;
use crate::interner::PersonIdx;
use crate::models::SearchStats;
use crate::objective::partial_objective_lower_bound;
use crate::{log_checks, log_debug};

use super::feasibility::CompletionMemo;
use super::state::SearchState;

/// Whether the search should keep going after a subtree returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// One search worker. Holds per-depth candidate buffers, its completability
/// cache and local counters; the incumbent and stop flag live in the shared
/// tracker.
pub struct BranchAndBound<'a, 'o> {
    model: &'a RosterModel,
    tracker: &'a IncumbentTracker<'o>,
    verbosity: u8,
    stats: SearchStats,
    completion: CompletionMemo<'a>,
    /// Reusable candidate list per day.
    buffers: Vec<Vec<PersonIdx>>,
}

impl<'a, 'o> BranchAndBound<'a, 'o> {
    pub fn new(model: &'a RosterModel, tracker: &'a IncumbentTracker<'o>, verbosity: u8) -> Self {
        Self {
            model,
            tracker,
            verbosity,
            stats: SearchStats::default(),
            completion: CompletionMemo::new(model),
            buffers: vec![Vec::with_capacity(model.person_count()); model.horizon_len()],
        }
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    pub fn into_stats(self) -> SearchStats {
        self.stats
    }

    /// Search every completion of `state`.
    pub fn run(&mut self, state: &mut SearchState) -> Flow {
        self.descend(state)
    }

    /// Persons allowed on the state's next day, in branch order: fewest
    /// shifts so far first, roster order among equals.
    pub fn candidates(&mut self, state: &SearchState, out: &mut Vec<PersonIdx>) {
        out.clear();
        let day = state.day();
        for person in 0..self.model.person_count() as PersonIdx {
            if can_assign(self.model, state.partial(), day, person) {
                out.push(person);
            } else {
                self.stats.rejected += 1;
            }
        }
        let tally = state.tally();
        out.sort_by_key(|&person| (tally.count(person), person));
    }

    /// Commit `person` on the next day, search the subtree if it can still be
    /// completed and its bound can still beat the incumbent, then undo.
    pub fn branch(&mut self, state: &mut SearchState, person: PersonIdx) -> Flow {
        let day = state.day();
        state.push(person);

        if !self.completion.is_completable(state.partial(), state.day()) {
            self.stats.pruned += 1;
            log_checks!(
                self.verbosity,
                "  Pruned person {} on day {}: no cover exists for the remaining days",
                person,
                day
            );
            state.pop();
            return Flow::Continue;
        }

        let bound = partial_objective_lower_bound(
            self.model,
            state.tally(),
            &state.last_duty,
            state.day(),
        );
        let flow = match bound {
            None => {
                self.stats.pruned += 1;
                log_checks!(
                    self.verbosity,
                    "  Pruned person {} on day {}: remaining days cannot be covered",
                    person,
                    day
                );
                Flow::Continue
            }
            Some(bound) if !self.tracker.improves(bound) => {
                self.stats.pruned += 1;
                log_checks!(
                    self.verbosity,
                    "  Pruned person {} on day {}: bound {} cannot beat incumbent",
                    person,
                    day,
                    bound
                );
                Flow::Continue
            }
            Some(_) => self.descend(state),
        };

        state.pop();
        flow
    }

    fn descend(&mut self, state: &mut SearchState) -> Flow {
        if self.tracker.checkpoint() {
            return Flow::Stop;
        }
        self.stats.nodes += 1;

        if state.is_complete() {
            self.stats.leaves += 1;
            let key = state.tally().sum_of_squares();
            if self.tracker.improves(key) {
                if let Some(assignment) = state.partial().to_complete() {
                    if self.tracker.report_candidate(&assignment, key) {
                        self.stats.improvements += 1;
                    }
                }
            }
            return Flow::Continue;
        }

        let day = state.day();
        let mut candidates = std::mem::take(&mut self.buffers[day]);
        self.candidates(state, &mut candidates);
        log_debug!(
            self.verbosity,
            "Day {}: {} candidate(s) {:?}",
            day,
            candidates.len(),
            candidates
        );

        let mut flow = Flow::Continue;
        for &person in &candidates {
            if self.tracker.should_stop() || self.branch(state, person) == Flow::Stop {
                flow = Flow::Stop;
                break;
            }
        }

        self.buffers[day] = candidates;
        flow
    }
}
