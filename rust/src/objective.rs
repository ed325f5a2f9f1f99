//! Shift-count imbalance objective and its lower bound.
//!
//! The objective is the sample variance of per-person shift counts. For a
//! fixed horizon the counts always sum to the number of days, so the variance
//! is a strictly increasing function of the sum of squared counts. The search
//! compares that integer sum (the "key") and only converts to `f64` for
//! reporting.

use crate::calendar::RosterModel;
use crate::interner::PersonIdx;
use crate::models::PartialAssignment;

/// Running per-person counts with an incrementally maintained sum of squares.
#[derive(Clone, Debug)]
pub struct ShiftTally {
    counts: Vec<u32>,
    sum_sq: u64,
    assigned: u32,
}

impl ShiftTally {
    pub fn new(person_count: usize) -> Self {
        Self {
            counts: vec![0; person_count],
            sum_sq: 0,
            assigned: 0,
        }
    }

    #[inline]
    pub fn assign(&mut self, person: PersonIdx) {
        let count = &mut self.counts[person as usize];
        // (c + 1)^2 - c^2
        self.sum_sq += 2 * u64::from(*count) + 1;
        *count += 1;
        self.assigned += 1;
    }

    #[inline]
    pub fn unassign(&mut self, person: PersonIdx) {
        let count = &mut self.counts[person as usize];
        debug_assert!(*count > 0);
        *count -= 1;
        self.sum_sq -= 2 * u64::from(*count) + 1;
        self.assigned -= 1;
    }

    #[inline]
    pub fn count(&self, person: PersonIdx) -> u32 {
        self.counts[person as usize]
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    #[inline]
    pub fn sum_of_squares(&self) -> u64 {
        self.sum_sq
    }

    pub fn assigned(&self) -> u32 {
        self.assigned
    }

    /// Sample variance of the current counts.
    pub fn variance(&self) -> f64 {
        variance_from_key(self.sum_sq, u64::from(self.assigned), self.counts.len())
    }
}

/// Sample variance from the sum of squares and the sum of counts.
///
/// `(n * sum_sq - total^2) / (n * (n - 1))`. Requires `n >= 2`.
pub fn variance_from_key(sum_sq: u64, total: u64, person_count: usize) -> f64 {
    let n = person_count as f64;
    let numerator = n * sum_sq as f64 - (total as f64) * (total as f64);
    (numerator / (n * (n - 1.0))).max(0.0)
}

/// Sample variance computed directly from counts via the mean.
///
/// Returns `None` for fewer than two counts.
pub fn sample_variance(counts: &[u32]) -> Option<f64> {
    if counts.len() < 2 {
        return None;
    }
    let n = counts.len() as f64;
    let mean = counts.iter().map(|&c| f64::from(c)).sum::<f64>() / n;
    let squared_deviations: f64 = counts
        .iter()
        .map(|&c| {
            let dev = f64::from(c) - mean;
            dev * dev
        })
        .sum();
    Some(squared_deviations / (n - 1.0))
}

/// Lower bound on the final sum of squares reachable from a state whose days
/// `0..decided_days` are decided.
///
/// Each person may take at most the number of remaining days they could cover
/// alone, honouring their leave and their own cooldown from `last_duty`. The
/// remaining days are water-filled onto the lowest counts within those
/// capacities. Returns `None` if the capacities cannot cover the remaining
/// days, in which case no completion is feasible.
pub fn partial_objective_lower_bound(
    model: &RosterModel,
    tally: &ShiftTally,
    last_duty: &[Option<usize>],
    decided_days: usize,
) -> Option<u64> {
    let remaining = (model.horizon_len() - decided_days) as u32;
    if remaining == 0 {
        return Some(tally.sum_of_squares());
    }

    let spacing = model.min_duty_spacing();
    let levels: Vec<(u32, u32)> = tally
        .counts()
        .iter()
        .enumerate()
        .map(|(person, &count)| {
            let earliest = match last_duty[person] {
                Some(last) => decided_days.max(last + spacing),
                None => decided_days,
            };
            let capacity = remaining_capacity(model, person as PersonIdx, earliest, spacing);
            (count, capacity.min(remaining))
        })
        .collect();

    water_fill(&levels, remaining)
}

/// Lower bound for an arbitrary partial assignment whose decided days form a
/// prefix of the horizon.
pub fn lower_bound_for(model: &RosterModel, partial: &PartialAssignment) -> Option<u64> {
    let mut tally = ShiftTally::new(model.person_count());
    let mut last_duty = vec![None; model.person_count()];
    let mut decided = 0;
    while decided < partial.len() {
        let Some(person) = partial.get(decided) else {
            break;
        };
        tally.assign(person);
        last_duty[person as usize] = Some(decided);
        decided += 1;
    }
    partial_objective_lower_bound(model, &tally, &last_duty, decided)
}

/// Maximum duties `person` can take from `from_day` on, taking every free day
/// as early as the spacing allows.
fn remaining_capacity(
    model: &RosterModel,
    person: PersonIdx,
    from_day: usize,
    spacing: usize,
) -> u32 {
    let mut capacity = 0;
    let mut day = from_day;
    while let Some(free) = model.next_available_day(person, day) {
        capacity += 1;
        day = free + spacing;
    }
    capacity
}

/// Minimum of `sum((c + x)^2)` over integer `0 <= x <= cap` with `sum(x) == units`.
///
/// Finds the smallest water level `L` whose fill reaches `units`, fills every
/// person up to `L - 1`, then raises just enough persons from `L - 1` to `L`.
fn water_fill(levels: &[(u32, u32)], units: u32) -> Option<u64> {
    let filled = |level: u32| -> u64 {
        levels
            .iter()
            .map(|&(count, cap)| u64::from(level.saturating_sub(count).min(cap)))
            .sum()
    };

    let capacity: u64 = levels.iter().map(|&(_, cap)| u64::from(cap)).sum();
    if capacity < u64::from(units) {
        return None;
    }
    if units == 0 {
        return Some(levels.iter().map(|&(c, _)| u64::from(c) * u64::from(c)).sum());
    }

    let mut lo = levels.iter().map(|&(count, _)| count).min()?;
    let mut hi = levels.iter().map(|&(count, cap)| count + cap).max()?;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if filled(mid) >= u64::from(units) {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }

    let level = lo;
    let base = level - 1;
    let mut total: u64 = levels
        .iter()
        .map(|&(count, cap)| {
            let height = u64::from(count + base.saturating_sub(count).min(cap));
            height * height
        })
        .sum();
    let raised = u64::from(units) - filled(base);
    total += raised * (2 * u64::from(level) - 1);
    Some(total)
}
