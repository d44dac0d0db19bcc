//! Chronological history of archived days.
//!
//! Days are kept as values in a `Vec` sorted by date; there is at most one
//! record per calendar date. Callers address days by offset from the most
//! recent one, which is what calendar-style navigation needs.

use super::aggregator::merge_records;
use super::types::{DailyRecord, DayLookup};
use crate::error::StatsError;
use chrono::NaiveDate;

/// Result of [`HistoryStore::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The date was new to the history.
    Inserted,
    /// A record for the date existed and was merged with the incoming one.
    Merged { changed: bool },
    /// The empty sentinel has no date and is never stored.
    Ignored,
}

impl AddOutcome {
    pub fn changed(self) -> bool {
        matches!(self, AddOutcome::Inserted | AddOutcome::Merged { changed: true })
    }
}

/// Ordered collection of archived days, oldest first.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    days: Vec<DailyRecord>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Returns the day `index` steps back from the most recent one.
    pub fn get_day(&self, index: usize) -> Result<&DailyRecord, StatsError> {
        let size = self.days.len();
        if index >= size {
            return Err(StatsError::DayOutOfRange { index, size });
        }
        Ok(&self.days[size - 1 - index])
    }

    /// Locates a date, or its closest neighbours when it is not recorded.
    pub fn get_day_index_by_date(&self, year: i32, month: u32, day: u32) -> DayLookup {
        let mut lookup = DayLookup::default();
        let Some(target) = NaiveDate::from_ymd_opt(year, month, day) else {
            return lookup;
        };

        let pos = self.position(target);
        let after = if self.date_at(pos) == Some(target) {
            lookup.index = Some(self.offset(pos));
            pos + 1
        } else {
            pos
        };

        if after < self.days.len() {
            lookup.next = Some(self.offset(after));
        }
        if pos > 0 {
            lookup.prev = Some(self.offset(pos - 1));
        }
        lookup
    }

    /// Inserts a day in date order, merging with an existing record for the
    /// same date.
    pub fn add(&mut self, record: DailyRecord) -> AddOutcome {
        let Some(date) = record.date() else {
            return AddOutcome::Ignored;
        };

        let pos = self.position(date);
        if self.date_at(pos) == Some(date) {
            let changed = merge_records(&mut self.days[pos], &record);
            AddOutcome::Merged { changed }
        } else {
            self.days.insert(pos, record);
            AddOutcome::Inserted
        }
    }

    /// Returns the record for a date, if archived.
    pub fn find(&self, date: NaiveDate) -> Option<&DailyRecord> {
        let pos = self.position(date);
        (self.date_at(pos) == Some(date)).then(|| &self.days[pos])
    }

    /// Days from `from` to `to` inclusive, oldest first.
    pub fn range(&self, from: NaiveDate, to: NaiveDate) -> &[DailyRecord] {
        let lo = self.position(from);
        let hi = self.days.partition_point(|r| r.date().is_some_and(|d| d <= to));
        if lo >= hi {
            &[]
        } else {
            &self.days[lo..hi]
        }
    }

    /// All days, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &DailyRecord> {
        self.days.iter()
    }

    /// Drops every archived day.
    pub fn delete_all(&mut self) {
        self.days.clear();
    }

    /// Index of the first day not before `date`.
    fn position(&self, date: NaiveDate) -> usize {
        self.days.partition_point(|r| r.date().is_some_and(|d| d < date))
    }

    fn date_at(&self, pos: usize) -> Option<NaiveDate> {
        self.days.get(pos).and_then(DailyRecord::date)
    }

    fn offset(&self, pos: usize) -> usize {
        self.days.len() - 1 - pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::MiscCounter;

    fn create_test_day(month: u32, day: u32, keys: u64) -> DailyRecord {
        let start = NaiveDate::from_ymd_opt(2026, month, day)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let mut record = DailyRecord::new(start);
        record.set_misc_counter(MiscCounter::TotalKeystrokes, keys);
        record
    }

    fn create_test_history() -> HistoryStore {
        let mut history = HistoryStore::new();
        history.add(create_test_day(3, 1, 10));
        history.add(create_test_day(3, 3, 30));
        history.add(create_test_day(3, 7, 70));
        history
    }

    #[test]
    fn test_new_history_is_empty() {
        let history = HistoryStore::new();
        assert!(history.is_empty());
        assert!(matches!(
            history.get_day(0),
            Err(StatsError::DayOutOfRange { index: 0, size: 0 })
        ));
    }

    #[test]
    fn test_get_day_counts_back_from_most_recent() {
        let history = create_test_history();

        assert!(history.get_day(0).unwrap().starts_at_date(2026, 3, 7));
        assert!(history.get_day(1).unwrap().starts_at_date(2026, 3, 3));
        assert!(history.get_day(2).unwrap().starts_at_date(2026, 3, 1));
        assert!(history.get_day(3).is_err());
    }

    #[test]
    fn test_out_of_order_add_keeps_chronology() {
        let mut history = HistoryStore::new();
        assert_eq!(history.add(create_test_day(3, 7, 70)), AddOutcome::Inserted);
        assert_eq!(history.add(create_test_day(3, 1, 10)), AddOutcome::Inserted);
        assert_eq!(history.add(create_test_day(3, 3, 30)), AddOutcome::Inserted);

        let dates: Vec<_> = history.iter().filter_map(DailyRecord::date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
    }

    #[test]
    fn test_add_same_date_merges() {
        let mut history = create_test_history();

        let outcome = history.add(create_test_day(3, 3, 99));
        assert_eq!(outcome, AddOutcome::Merged { changed: true });
        assert_eq!(history.len(), 3);

        let day = history.find(NaiveDate::from_ymd_opt(2026, 3, 3).unwrap()).unwrap();
        assert_eq!(day.misc_counter(MiscCounter::TotalKeystrokes), 99);

        // A lower count never wins.
        let outcome = history.add(create_test_day(3, 3, 5));
        assert_eq!(outcome, AddOutcome::Merged { changed: false });
        assert!(!outcome.changed());
    }

    #[test]
    fn test_add_ignores_empty_sentinel() {
        let mut history = create_test_history();
        assert_eq!(history.add(DailyRecord::default()), AddOutcome::Ignored);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_lookup_exact_match() {
        let history = create_test_history();

        let lookup = history.get_day_index_by_date(2026, 3, 3);
        assert_eq!(lookup.index, Some(1));
        assert_eq!(lookup.next, Some(0));
        assert_eq!(lookup.prev, Some(2));
    }

    #[test]
    fn test_lookup_between_days() {
        let history = create_test_history();

        let lookup = history.get_day_index_by_date(2026, 3, 5);
        assert_eq!(lookup.index, None);
        assert_eq!(lookup.next, Some(0));
        assert_eq!(lookup.prev, Some(1));
    }

    #[test]
    fn test_lookup_outside_history() {
        let history = create_test_history();

        let before = history.get_day_index_by_date(2026, 2, 1);
        assert_eq!(before, DayLookup { index: None, next: Some(2), prev: None });

        let after = history.get_day_index_by_date(2026, 4, 1);
        assert_eq!(after, DayLookup { index: None, next: None, prev: Some(0) });

        let newest = history.get_day_index_by_date(2026, 3, 7);
        assert_eq!(newest, DayLookup { index: Some(0), next: None, prev: Some(1) });

        let invalid = history.get_day_index_by_date(2026, 2, 30);
        assert_eq!(invalid, DayLookup::default());
    }

    #[test]
    fn test_range_is_inclusive() {
        let history = create_test_history();
        let d = |day| NaiveDate::from_ymd_opt(2026, 3, day).unwrap();

        assert_eq!(history.range(d(1), d(3)).len(), 2);
        assert_eq!(history.range(d(2), d(7)).len(), 2);
        assert_eq!(history.range(d(4), d(6)).len(), 0);
        assert_eq!(history.range(d(8), d(2)).len(), 0);
    }

    #[test]
    fn test_delete_all() {
        let mut history = create_test_history();
        history.delete_all();
        assert!(history.is_empty());
    }
}
