//! Memoized completability of partial assignments.
//!
//! Whether the undecided days `day..D` can still be covered depends only on
//! `day` and on who holds the last `W - 1` decided days: leave is fixed, and
//! shift counts never restrict feasibility. Each such state is settled once
//! by a depth-first search and cached, so an infeasible horizon is proved in
//! time linear in the number of distinct states rather than in the number of
//! partial assignments.

use rustc_hash::FxHashMap;

use crate::calendar::RosterModel;
use crate::interner::PersonIdx;
use crate::models::PartialAssignment;

/// Window slot for days before the start of the horizon.
const BEFORE_HORIZON: u32 = u32::MAX;

/// Cache of completability by `(day, recent assignees)`.
pub struct CompletionMemo<'a> {
    model: &'a RosterModel,
    /// Number of preceding days that constrain the next one.
    reach: usize,
    /// Key layout: `[day, assignee(day - reach), ..., assignee(day - 1)]`.
    known: FxHashMap<Vec<u32>, bool>,
}

impl<'a> CompletionMemo<'a> {
    pub fn new(model: &'a RosterModel) -> Self {
        let reach = if model.cooldown_enforced() {
            model.cooldown_days() - 1
        } else {
            0
        };
        Self {
            model,
            reach,
            known: FxHashMap::default(),
        }
    }

    /// Whether days `day..D` can be covered given the decided prefix of
    /// `partial`.
    pub fn is_completable(&mut self, partial: &PartialAssignment, day: usize) -> bool {
        // Without an enforced window every day has an available person.
        if self.reach == 0 || day >= self.model.horizon_len() {
            return true;
        }
        let mut key = Vec::with_capacity(self.reach + 1);
        key.push(day as u32);
        for back in (1..=self.reach).rev() {
            let holder = day
                .checked_sub(back)
                .and_then(|earlier| partial.get(earlier))
                .unwrap_or(BEFORE_HORIZON);
            key.push(holder);
        }
        self.settle(key)
    }

    /// Number of settled states.
    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    fn settle(&mut self, key: Vec<u32>) -> bool {
        if let Some(&completable) = self.known.get(&key) {
            return completable;
        }
        let day = key[0] as usize;
        if day == self.model.horizon_len() {
            return true;
        }

        let mut completable = false;
        for person in 0..self.model.person_count() as PersonIdx {
            if self.model.is_on_leave(person, day) || key[1..].contains(&person) {
                continue;
            }
            let mut next = Vec::with_capacity(key.len());
            next.push(day as u32 + 1);
            next.extend_from_slice(&key[2..]);
            next.push(person);
            if self.settle(next) {
                completable = true;
                break;
            }
        }

        self.known.insert(key, completable);
        completable
    }
}
