//! Core data types for assignments and solve results.

use chrono::{NaiveDate, Weekday};
use std::time::Duration;

use crate::calendar::RosterModel;
use crate::interner::PersonIdx;

/// A complete assignment: exactly one person per horizon day.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    by_day: Vec<PersonIdx>,
}

impl Assignment {
    pub fn new(by_day: Vec<PersonIdx>) -> Self {
        Self { by_day }
    }

    /// Build from person names in day order. Returns `None` on an unknown name.
    pub fn from_names<S: AsRef<str>>(model: &RosterModel, names: &[S]) -> Option<Self> {
        names
            .iter()
            .map(|name| model.person_index(name.as_ref()))
            .collect::<Option<Vec<_>>>()
            .map(Self::new)
    }

    pub fn len(&self) -> usize {
        self.by_day.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_day.is_empty()
    }

    pub fn person_on(&self, day: usize) -> Option<PersonIdx> {
        self.by_day.get(day).copied()
    }

    pub fn as_slice(&self) -> &[PersonIdx] {
        &self.by_day
    }

    /// Shift count per person in roster order.
    pub fn shift_counts(&self, person_count: usize) -> Vec<u32> {
        let mut counts = vec![0u32; person_count];
        for &person in &self.by_day {
            if let Some(count) = counts.get_mut(person as usize) {
                *count += 1;
            }
        }
        counts
    }

    /// One row per day: date, weekday name and assignee name.
    pub fn rows(&self, model: &RosterModel) -> Vec<ScheduleRow> {
        model
            .dates()
            .iter()
            .zip(&self.by_day)
            .map(|(&date, &person)| ScheduleRow {
                date,
                weekday: weekday_name(date),
                person: model.person_name(person).unwrap_or_default().to_string(),
            })
            .collect()
    }
}

/// Assignment under construction; `None` marks an undecided day.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartialAssignment {
    slots: Vec<Option<PersonIdx>>,
}

impl PartialAssignment {
    pub fn new(horizon_len: usize) -> Self {
        Self {
            slots: vec![None; horizon_len],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn get(&self, day: usize) -> Option<PersonIdx> {
        self.slots.get(day).copied().flatten()
    }

    #[inline]
    pub fn assign(&mut self, day: usize, person: PersonIdx) {
        self.slots[day] = Some(person);
    }

    #[inline]
    pub fn clear(&mut self, day: usize) {
        self.slots[day] = None;
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_some())
    }

    /// Freeze into a complete assignment, if every day is decided.
    pub fn to_complete(&self) -> Option<Assignment> {
        self.slots
            .iter()
            .copied()
            .collect::<Option<Vec<_>>>()
            .map(Assignment::new)
    }
}

impl From<&Assignment> for PartialAssignment {
    fn from(assignment: &Assignment) -> Self {
        Self {
            slots: assignment.by_day.iter().copied().map(Some).collect(),
        }
    }
}

/// Output row handed to report renderers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleRow {
    pub date: NaiveDate,
    pub weekday: &'static str,
    pub person: String,
}

/// Full English weekday name, e.g. "Thursday".
pub fn weekday_name(date: NaiveDate) -> &'static str {
    use chrono::Datelike;
    match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// How a solve ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveStatus {
    /// Search exhausted; the assignment is optimal.
    Optimal,
    /// Stopped early; the assignment, if any, is the best found.
    BestEffort,
    /// Search exhausted without any feasible assignment.
    Infeasible,
}

impl SolveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Optimal => "optimal",
            Self::BestEffort => "best_effort",
            Self::Infeasible => "infeasible",
        }
    }
}

/// Why the search stopped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StopReason {
    #[default]
    Exhausted,
    Cancelled,
    TimeLimit,
    NodeLimit,
}

/// Counters collected during a solve.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Day decisions entered.
    pub nodes: u64,
    /// Candidates rejected by leave or cooldown.
    pub rejected: u64,
    /// Candidates pruned because their lower bound could not beat the incumbent.
    pub pruned: u64,
    /// Complete assignments reached.
    pub leaves: u64,
    /// Incumbent replacements.
    pub improvements: u64,
    pub elapsed: Duration,
    pub stop_reason: StopReason,
}

impl SearchStats {
    pub(crate) fn absorb(&mut self, other: &SearchStats) {
        self.nodes += other.nodes;
        self.rejected += other.rejected;
        self.pruned += other.pruned;
        self.leaves += other.leaves;
    }
}

/// Result of [`crate::solve`].
#[derive(Clone, Debug)]
pub struct SolveResult {
    pub status: SolveStatus,
    pub assignment: Option<Assignment>,
    pub objective: Option<f64>,
    pub stats: SearchStats,
}

impl SolveResult {
    /// Schedule rows for the returned assignment; empty when there is none.
    pub fn rows(&self, model: &RosterModel) -> Vec<ScheduleRow> {
        self.assignment
            .as_ref()
            .map(|a| a.rows(model))
            .unwrap_or_default()
    }
}
