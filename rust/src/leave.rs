//! Declared leave, kept as sorted non-overlapping periods per person.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

/// Leave periods for one person.
///
/// Maintains the invariant that `periods` is sorted by start date and contains
/// no overlapping or adjacent periods, so lookups are a binary search.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeavePeriods {
    /// Inclusive (start, end) periods.
    periods: Vec<(NaiveDate, NaiveDate)>,
}

impl LeavePeriods {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from unsorted, possibly overlapping periods.
    pub fn from_periods(periods: Vec<(NaiveDate, NaiveDate)>) -> Self {
        let mut leave = Self::new();
        for (start, end) in periods {
            leave.add_period(start, end);
        }
        leave
    }

    /// Add an inclusive period, merging with overlapping or adjacent ones.
    ///
    /// An inverted period (end before start) covers the same days as its
    /// normalized form.
    pub fn add_period(&mut self, start: NaiveDate, end: NaiveDate) {
        let (start, end) = if end < start { (end, start) } else { (start, end) };

        // Stored starts and ends are both ascending, so the periods touching
        // `[start - 1, end + 1]` form one contiguous run `first..last`.
        let day_before = start.pred_opt().unwrap_or(start);
        let day_after = end.succ_opt().unwrap_or(end);
        let first = self.periods.partition_point(|&(_, e)| e < day_before);
        let last = self.periods.partition_point(|&(s, _)| s <= day_after);

        let merged = match self.periods.get(first..last) {
            Some([(run_start, _), .., (_, run_end)]) | Some([(run_start, run_end)]) => {
                (start.min(*run_start), end.max(*run_end))
            }
            _ => (start, end),
        };
        self.periods.splice(first..last, [merged]);
    }

    pub fn add_day(&mut self, date: NaiveDate) {
        self.add_period(date, date);
    }

    /// Whether `date` falls inside any period.
    pub fn contains(&self, date: NaiveDate) -> bool {
        let idx = self.periods.partition_point(|(_, end)| *end < date);
        self.periods
            .get(idx)
            .is_some_and(|(start, _)| *start <= date)
    }

    pub fn periods(&self) -> &[(NaiveDate, NaiveDate)] {
        &self.periods
    }

    /// Earliest and latest leave day, if any.
    pub fn span(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.periods.first(), self.periods.last()) {
            (Some((first, _)), Some((_, last))) => Some((*first, *last)),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

/// Leave declared for the roster, keyed by person name.
#[derive(Clone, Debug, Default)]
pub struct LeaveSet {
    by_person: FxHashMap<String, LeavePeriods>,
}

impl LeaveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from per-person lists of single leave days.
    pub fn from_days<I, S, D>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, D)>,
        S: Into<String>,
        D: IntoIterator<Item = NaiveDate>,
    {
        let mut leave = Self::new();
        for (person, days) in entries {
            let periods = leave.by_person.entry(person.into()).or_default();
            for day in days {
                periods.add_day(day);
            }
        }
        leave
    }

    pub fn add_day(&mut self, person: impl Into<String>, date: NaiveDate) -> &mut Self {
        self.by_person.entry(person.into()).or_default().add_day(date);
        self
    }

    pub fn add_period(
        &mut self,
        person: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> &mut Self {
        self.by_person
            .entry(person.into())
            .or_default()
            .add_period(start, end);
        self
    }

    pub fn periods_for(&self, person: &str) -> Option<&LeavePeriods> {
        self.by_person.get(person)
    }

    pub fn contains(&self, person: &str, date: NaiveDate) -> bool {
        self.by_person
            .get(person)
            .is_some_and(|periods| periods.contains(date))
    }

    /// People with declared leave, sorted by name for stable reporting.
    pub fn people(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_person.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.by_person.values().all(|p| p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_empty_leave() {
        let leave = LeavePeriods::new();
        assert!(!leave.contains(d(2024, 2, 1)));
        assert_eq!(leave.span(), None);
    }

    #[test]
    fn test_adjacent_days_merge() {
        let mut leave = LeavePeriods::new();
        leave.add_day(d(2024, 2, 1));
        leave.add_day(d(2024, 2, 3));
        leave.add_day(d(2024, 2, 2));
        assert_eq!(leave.periods(), &[(d(2024, 2, 1), d(2024, 2, 3))]);
    }

    #[test]
    fn test_overlapping_periods_merge() {
        let leave = LeavePeriods::from_periods(vec![
            (d(2024, 2, 10), d(2024, 2, 15)),
            (d(2024, 2, 1), d(2024, 2, 3)),
            (d(2024, 2, 12), d(2024, 2, 20)),
        ]);
        assert_eq!(
            leave.periods(),
            &[
                (d(2024, 2, 1), d(2024, 2, 3)),
                (d(2024, 2, 10), d(2024, 2, 20))
            ]
        );
        assert_eq!(leave.span(), Some((d(2024, 2, 1), d(2024, 2, 20))));
    }

    #[test]
    fn test_period_swallowing_several() {
        let mut leave = LeavePeriods::from_periods(vec![
            (d(2024, 2, 2), d(2024, 2, 2)),
            (d(2024, 2, 5), d(2024, 2, 6)),
            (d(2024, 2, 9), d(2024, 2, 9)),
        ]);
        leave.add_period(d(2024, 2, 1), d(2024, 2, 8));
        assert_eq!(leave.periods(), &[(d(2024, 2, 1), d(2024, 2, 9))]);
    }

    #[test]
    fn test_period_bridging_neighbours() {
        let mut leave = LeavePeriods::from_periods(vec![
            (d(2024, 2, 1), d(2024, 2, 3)),
            (d(2024, 2, 7), d(2024, 2, 9)),
            (d(2024, 2, 20), d(2024, 2, 21)),
        ]);
        // Touches the first period's end and the second period's start.
        leave.add_period(d(2024, 2, 4), d(2024, 2, 6));
        assert_eq!(
            leave.periods(),
            &[
                (d(2024, 2, 1), d(2024, 2, 9)),
                (d(2024, 2, 20), d(2024, 2, 21))
            ]
        );
        // Strictly inside an existing period: nothing changes.
        leave.add_day(d(2024, 2, 5));
        assert_eq!(leave.periods().len(), 2);
        // A gap of one day keeps periods apart.
        leave.add_day(d(2024, 2, 18));
        assert_eq!(leave.periods().len(), 3);
        assert!(!leave.contains(d(2024, 2, 19)));
    }

    #[test]
    fn test_inverted_period_is_normalized() {
        let mut leave = LeavePeriods::new();
        leave.add_period(d(2024, 2, 5), d(2024, 2, 3));
        assert!(leave.contains(d(2024, 2, 4)));
        assert_eq!(leave.periods(), &[(d(2024, 2, 3), d(2024, 2, 5))]);
    }

    #[test]
    fn test_contains_boundaries() {
        let leave = LeavePeriods::from_periods(vec![(d(2024, 2, 10), d(2024, 2, 12))]);
        assert!(!leave.contains(d(2024, 2, 9)));
        assert!(leave.contains(d(2024, 2, 10)));
        assert!(leave.contains(d(2024, 2, 12)));
        assert!(!leave.contains(d(2024, 2, 13)));
    }

    #[test]
    fn test_leave_set_from_days() {
        let leave = LeaveSet::from_days([
            ("John", vec![d(2024, 2, 1), d(2024, 2, 2), d(2024, 2, 3)]),
            ("Josh", vec![d(2024, 2, 15)]),
        ]);
        assert!(leave.contains("John", d(2024, 2, 2)));
        assert!(!leave.contains("John", d(2024, 2, 4)));
        assert!(!leave.contains("Mary", d(2024, 2, 2)));
        assert_eq!(leave.people(), vec!["John", "Josh"]);
        assert_eq!(
            leave.periods_for("John").map(|p| p.periods().len()),
            Some(1)
        );
    }
}
