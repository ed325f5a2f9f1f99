//! Calendar and roster model: the immutable description of a rota problem.

use chrono::NaiveDate;
use thiserror::Error;

use crate::interner::{PersonIdx, PersonInterner};
use crate::leave::LeaveSet;

/// Default minimum spacing window between duties of the same person.
pub const DEFAULT_COOLDOWN_DAYS: usize = 3;

/// Errors detected while building a [`RosterModel`]. No search is attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Roster is empty")]
    EmptyRoster,
    #[error("Person listed more than once: {0}")]
    DuplicatePerson(String),
    #[error("Roster has a single person; shift-count variance is undefined")]
    SinglePerson,
    #[error("Empty horizon: start {start} is after end {end}")]
    EmptyHorizon { start: NaiveDate, end: NaiveDate },
    #[error("Cooldown window must be at least one day")]
    InvalidCooldown,
    #[error("Leave declared for unknown person: {0}")]
    UnknownPerson(String),
    #[error("Leave for {person} on {date} is outside the horizon {start} to {end}")]
    LeaveOutsideHorizon {
        person: String,
        date: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    },
    #[error("Every person is on leave on {0}; the day cannot be covered")]
    UncoverableDate(NaiveDate),
}

/// Horizon, roster, leave and cooldown window for one solve.
///
/// Days are addressed by index `0..horizon_len()`, persons by their roster
/// position. Leave is flattened into a day-major table so lookups are O(1).
#[derive(Clone, Debug)]
pub struct RosterModel {
    persons: PersonInterner,
    dates: Vec<NaiveDate>,
    /// `on_leave[day * n_persons + person]`
    on_leave: Vec<bool>,
    /// `next_free[person * (D + 1) + day]`: first day >= `day` the person is
    /// not on leave, or `D` when there is none.
    next_free: Vec<u32>,
    cooldown_days: usize,
}

impl RosterModel {
    /// Build and validate a model from caller-supplied input.
    pub fn new<S: AsRef<str>>(
        persons: &[S],
        start: NaiveDate,
        end: NaiveDate,
        leave: &LeaveSet,
        cooldown_days: usize,
    ) -> Result<Self, ConfigurationError> {
        if persons.is_empty() {
            return Err(ConfigurationError::EmptyRoster);
        }

        let mut interner = PersonInterner::with_capacity(persons.len());
        for name in persons {
            let (_, added) = interner.intern(name.as_ref());
            if !added {
                return Err(ConfigurationError::DuplicatePerson(
                    name.as_ref().to_string(),
                ));
            }
        }
        if interner.len() == 1 {
            return Err(ConfigurationError::SinglePerson);
        }

        if start > end {
            return Err(ConfigurationError::EmptyHorizon { start, end });
        }
        if cooldown_days == 0 {
            return Err(ConfigurationError::InvalidCooldown);
        }

        let horizon_len = (end - start).num_days() as usize + 1;
        let dates: Vec<NaiveDate> = start.iter_days().take(horizon_len).collect();
        let n = interner.len();

        let mut on_leave = vec![false; horizon_len * n];
        for name in leave.people() {
            let Some(person) = interner.get(name) else {
                return Err(ConfigurationError::UnknownPerson(name.to_string()));
            };
            let Some(periods) = leave.periods_for(name) else {
                continue;
            };
            if let Some((first, last)) = periods.span() {
                let outside = if first < start {
                    Some(first)
                } else if last > end {
                    Some(last)
                } else {
                    None
                };
                if let Some(date) = outside {
                    return Err(ConfigurationError::LeaveOutsideHorizon {
                        person: name.to_string(),
                        date,
                        start,
                        end,
                    });
                }
            }
            for (day, date) in dates.iter().enumerate() {
                if periods.contains(*date) {
                    on_leave[day * n + person as usize] = true;
                }
            }
        }

        for (day, date) in dates.iter().enumerate() {
            if on_leave[day * n..(day + 1) * n].iter().all(|&away| away) {
                return Err(ConfigurationError::UncoverableDate(*date));
            }
        }

        let stride = horizon_len + 1;
        let mut next_free = vec![horizon_len as u32; n * stride];
        for person in 0..n {
            for day in (0..horizon_len).rev() {
                next_free[person * stride + day] = if on_leave[day * n + person] {
                    next_free[person * stride + day + 1]
                } else {
                    day as u32
                };
            }
        }

        Ok(Self {
            persons: interner,
            dates,
            on_leave,
            next_free,
            cooldown_days,
        })
    }

    /// Build a model with the default cooldown window.
    pub fn with_default_cooldown<S: AsRef<str>>(
        persons: &[S],
        start: NaiveDate,
        end: NaiveDate,
        leave: &LeaveSet,
    ) -> Result<Self, ConfigurationError> {
        Self::new(persons, start, end, leave, DEFAULT_COOLDOWN_DAYS)
    }

    #[inline]
    pub fn horizon_len(&self) -> usize {
        self.dates.len()
    }

    #[inline]
    pub fn person_count(&self) -> usize {
        self.persons.len()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn date(&self, day: usize) -> Option<NaiveDate> {
        self.dates.get(day).copied()
    }

    /// Day index of `date`, if it lies inside the horizon.
    pub fn day_of(&self, date: NaiveDate) -> Option<usize> {
        let first = *self.dates.first()?;
        let offset = (date - first).num_days();
        if offset < 0 || offset as usize >= self.dates.len() {
            return None;
        }
        Some(offset as usize)
    }

    /// Person names in roster order.
    pub fn persons(&self) -> &[String] {
        self.persons.names()
    }

    pub fn person_name(&self, person: PersonIdx) -> Option<&str> {
        self.persons.resolve(person)
    }

    pub fn person_index(&self, name: &str) -> Option<PersonIdx> {
        self.persons.get(name)
    }

    #[inline]
    pub fn is_on_leave(&self, person: PersonIdx, day: usize) -> bool {
        self.on_leave
            .get(day * self.persons.len() + person as usize)
            .copied()
            .unwrap_or(false)
    }

    /// Leave lookup by name and date. Unknown names and dates are never on leave.
    pub fn is_on_leave_on(&self, name: &str, date: NaiveDate) -> bool {
        match (self.person_index(name), self.day_of(date)) {
            (Some(person), Some(day)) => self.is_on_leave(person, day),
            _ => false,
        }
    }

    /// First day at or after `from_day` on which `person` is not on leave.
    #[inline]
    pub fn next_available_day(&self, person: PersonIdx, from_day: usize) -> Option<usize> {
        let stride = self.dates.len() + 1;
        let from = from_day.min(self.dates.len());
        let day = self.next_free[person as usize * stride + from] as usize;
        (day < self.dates.len()).then_some(day)
    }

    pub fn cooldown_days(&self) -> usize {
        self.cooldown_days
    }

    /// Whether the cooldown applies at all.
    ///
    /// A window is enforced only when it lies fully inside the horizon, so a
    /// horizon shorter than the window has no enforced window. A one-day
    /// window never constrains anything.
    pub fn cooldown_enforced(&self) -> bool {
        self.cooldown_days > 1 && self.dates.len() >= self.cooldown_days
    }

    /// Minimum distance in days between two duties of the same person.
    #[inline]
    pub fn min_duty_spacing(&self) -> usize {
        if self.cooldown_enforced() {
            self.cooldown_days
        } else {
            1
        }
    }
}
