//! Mutable search state for depth-first branch-and-bound.

use crate::calendar::RosterModel;
use crate::interner::PersonIdx;
use crate::models::PartialAssignment;
use crate::objective::ShiftTally;

/// Partial assignment over a decided prefix of the horizon, with the running
/// tallies needed for O(1) objective updates and the bound.
///
/// Days are decided strictly in horizon order: `push` decides `day()` and
/// `pop` undoes the most recent decision.
#[derive(Clone, Debug)]
pub struct SearchState {
    pub(crate) partial: PartialAssignment,
    pub(crate) tally: ShiftTally,
    /// Most recent duty day per person within the decided prefix.
    pub(crate) last_duty: Vec<Option<usize>>,
    /// `last_duty` value overwritten by the decision on each day.
    previous_duty: Vec<Option<usize>>,
    day: usize,
}

impl SearchState {
    pub fn new(model: &RosterModel) -> Self {
        Self {
            partial: PartialAssignment::new(model.horizon_len()),
            tally: ShiftTally::new(model.person_count()),
            last_duty: vec![None; model.person_count()],
            previous_duty: vec![None; model.horizon_len()],
            day: 0,
        }
    }

    /// Next undecided day (equals the horizon length when complete).
    #[inline]
    pub fn day(&self) -> usize {
        self.day
    }

    pub fn is_complete(&self) -> bool {
        self.day == self.partial.len()
    }

    pub fn partial(&self) -> &PartialAssignment {
        &self.partial
    }

    pub fn tally(&self) -> &ShiftTally {
        &self.tally
    }

    /// Decide the next day for `person`.
    #[inline]
    pub fn push(&mut self, person: PersonIdx) {
        let day = self.day;
        self.partial.assign(day, person);
        self.tally.assign(person);
        self.previous_duty[day] = self.last_duty[person as usize];
        self.last_duty[person as usize] = Some(day);
        self.day += 1;
    }

    /// Undo the most recent decision.
    #[inline]
    pub fn pop(&mut self) {
        debug_assert!(self.day > 0);
        self.day -= 1;
        let day = self.day;
        if let Some(person) = self.partial.get(day) {
            self.partial.clear(day);
            self.tally.unassign(person);
            self.last_duty[person as usize] = self.previous_duty[day];
        }
    }
}
