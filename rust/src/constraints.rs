//! Hard-constraint evaluation: coverage, leave exclusion and cooldown.
//!
//! `can_assign` is the incremental check the search consults before committing
//! a branch. `verify` re-checks a complete assignment from scratch by scanning
//! every full window; the two are written independently so tests can compare
//! them.

use chrono::NaiveDate;
use thiserror::Error;

use crate::calendar::RosterModel;
use crate::interner::PersonIdx;
use crate::models::{Assignment, PartialAssignment};

/// A hard-constraint violation found in a complete assignment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("Assignment covers {actual} days but the horizon has {expected}")]
    Coverage { expected: usize, actual: usize },
    #[error("Unknown person index {person} on {date}")]
    UnknownPerson { person: PersonIdx, date: NaiveDate },
    #[error("{person} is on leave on {date}")]
    OnLeave { person: String, date: NaiveDate },
    #[error("{person} has duties on {first} and {second}, closer than the {window}-day cooldown")]
    Cooldown {
        person: String,
        first: NaiveDate,
        second: NaiveDate,
        window: usize,
    },
}

/// Whether `person` may take `day` given the decided days of `assignment`.
///
/// Checks leave first, then the symmetric cooldown window
/// `[day - (W-1), day + (W-1)]` clipped to the horizon. O(W).
pub fn can_assign(
    model: &RosterModel,
    assignment: &PartialAssignment,
    day: usize,
    person: PersonIdx,
) -> bool {
    if model.is_on_leave(person, day) {
        return false;
    }
    if !model.cooldown_enforced() {
        return true;
    }

    let reach = model.cooldown_days() - 1;
    let lo = day.saturating_sub(reach);
    let hi = (day + reach).min(model.horizon_len() - 1);
    (lo..=hi)
        .filter(|&other| other != day)
        .all(|other| assignment.get(other) != Some(person))
}

/// Verify a complete assignment against every hard constraint.
///
/// Reports the first violation in day order.
pub fn verify(model: &RosterModel, assignment: &Assignment) -> Result<(), Violation> {
    let horizon = model.horizon_len();
    if assignment.len() != horizon {
        return Err(Violation::Coverage {
            expected: horizon,
            actual: assignment.len(),
        });
    }

    for (day, &date) in model.dates().iter().enumerate() {
        let Some(person) = assignment.person_on(day) else {
            continue;
        };
        let Some(name) = model.person_name(person) else {
            return Err(Violation::UnknownPerson { person, date });
        };
        if model.is_on_leave(person, day) {
            return Err(Violation::OnLeave {
                person: name.to_string(),
                date,
            });
        }
    }

    let window = model.cooldown_days();
    if horizon < window {
        // No window lies fully inside the horizon.
        return Ok(());
    }
    let dates = model.dates();
    for start in 0..=(horizon - window) {
        let duties = &assignment.as_slice()[start..start + window];
        for (i, person) in duties.iter().enumerate() {
            if let Some(j) = duties[i + 1..].iter().position(|p| p == person) {
                return Err(Violation::Cooldown {
                    person: model.person_name(*person).unwrap_or_default().to_string(),
                    first: dates[start + i],
                    second: dates[start + i + 1 + j],
                    window,
                });
            }
        }
    }

    Ok(())
}
