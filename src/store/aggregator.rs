//! Statistics aggregation utilities.
//!
//! Provides the merge policy used when two copies of the same day meet
//! (crash recovery, peer exchange) and summaries over ranges of days.

use super::types::{BreakCounter, DailyRecord, DailySummary, MiscCounter};

/// Merges `from` into `into` and reports whether `into` changed.
///
/// Every counter takes the maximum of both sides, `start` the earliest and
/// `stop` the latest timestamp. The merge never decreases a value, so it is
/// idempotent and the order in which copies are merged does not matter.
pub fn merge_records(into: &mut DailyRecord, from: &DailyRecord) -> bool {
    let before = into.clone();

    into.start = earliest(into.start, from.start);
    into.stop = latest(into.stop, from.stop);

    for (mine, theirs) in into.break_counters.iter_mut().zip(&from.break_counters) {
        for (a, b) in mine.iter_mut().zip(theirs) {
            *a = (*a).max(*b);
        }
    }
    for (a, b) in into.misc_counters.iter_mut().zip(&from.misc_counters) {
        *a = (*a).max(*b);
    }
    into.total_mouse_time_ms = into.total_mouse_time_ms.max(from.total_mouse_time_ms);

    *into != before
}

fn earliest<T: Ord>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn latest<T: Ord>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

/// Sums the counters of a set of days.
///
/// Sums saturate, since a merged peer day may carry counters at `u64::MAX`.
pub fn summarize<'a>(records: impl IntoIterator<Item = &'a DailyRecord>) -> DailySummary {
    let records: Vec<&DailyRecord> = records.into_iter().filter(|r| !r.is_empty()).collect();
    let mut summary = DailySummary {
        busiest_day: top_days_by_active_time(records.iter().copied(), 1)
            .first()
            .and_then(|r| r.date()),
        ..Default::default()
    };

    for record in records {
        let misc = |counter| record.misc_counter(counter);
        summary.days = summary.days.saturating_add(1);
        summary.total_active_time_secs = summary
            .total_active_time_secs
            .saturating_add(misc(MiscCounter::TotalActiveTime));
        summary.total_keystrokes = summary
            .total_keystrokes
            .saturating_add(misc(MiscCounter::TotalKeystrokes));
        summary.total_clicks = summary.total_clicks.saturating_add(misc(MiscCounter::TotalClicks));
        summary.total_mouse_movement = summary
            .total_mouse_movement
            .saturating_add(misc(MiscCounter::TotalMouseMovement));
        summary.total_movement_time_secs = summary
            .total_movement_time_secs
            .saturating_add(record.total_mouse_time_ms / 1000);

        for per_kind in &record.break_counters {
            let taken = per_kind[BreakCounter::Taken.index()]
                .saturating_add(per_kind[BreakCounter::NaturalTaken.index()]);
            summary.breaks_prompted = summary
                .breaks_prompted
                .saturating_add(per_kind[BreakCounter::Prompted.index()]);
            summary.breaks_taken = summary.breaks_taken.saturating_add(taken);
            summary.breaks_skipped = summary
                .breaks_skipped
                .saturating_add(per_kind[BreakCounter::Skipped.index()]);
        }
    }

    summary
}

/// Returns the `n` days with the most active time, busiest first.
pub fn top_days_by_active_time<'a>(
    records: impl IntoIterator<Item = &'a DailyRecord>,
    n: usize,
) -> Vec<&'a DailyRecord> {
    let mut sorted: Vec<_> = records.into_iter().filter(|r| !r.is_empty()).collect();
    sorted.sort_by(|a, b| {
        b.misc_counter(MiscCounter::TotalActiveTime)
            .cmp(&a.misc_counter(MiscCounter::TotalActiveTime))
    });
    sorted.truncate(n);
    sorted
}
