//! Data types for daily activity statistics.
//!
//! Defines the per-day record, the closed counter enums that index it,
//! and the small result types used by history queries.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Category of scheduled interruption.
///
/// The discriminant is the on-disk and on-wire break id; new kinds are only
/// ever appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakKind {
    MicroBreak = 0,
    RestBreak = 1,
    DailyLimit = 2,
}

impl BreakKind {
    pub const COUNT: usize = 3;
    pub const ALL: [BreakKind; Self::COUNT] =
        [BreakKind::MicroBreak, BreakKind::RestBreak, BreakKind::DailyLimit];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            BreakKind::MicroBreak => "micro-break",
            BreakKind::RestBreak => "rest-break",
            BreakKind::DailyLimit => "daily-limit",
        }
    }
}

/// Per-break-kind counter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakCounter {
    Prompted = 0,
    Taken = 1,
    NaturalTaken = 2,
    Skipped = 3,
    Postponed = 4,
    UniqueBreaks = 5,
    /// Seconds the break was overdue.
    TotalOverdue = 6,
    /// Seconds spent in the break.
    TotalBreakTime = 7,
}

impl BreakCounter {
    pub const COUNT: usize = 8;
    pub const ALL: [BreakCounter; Self::COUNT] = [
        BreakCounter::Prompted,
        BreakCounter::Taken,
        BreakCounter::NaturalTaken,
        BreakCounter::Skipped,
        BreakCounter::Postponed,
        BreakCounter::UniqueBreaks,
        BreakCounter::TotalOverdue,
        BreakCounter::TotalBreakTime,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Day-wide counter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MiscCounter {
    /// Seconds of user activity.
    TotalActiveTime = 0,
    /// Pointer travel in pixels (plus wheel delta).
    TotalMouseMovement = 1,
    /// Pointer travel between consecutive clicks, in pixels.
    TotalClickMovement = 2,
    /// Whole seconds of pointer motion, mirrors `total_mouse_time_ms`.
    TotalMovementTime = 3,
    TotalClicks = 4,
    TotalKeystrokes = 5,
}

impl MiscCounter {
    pub const COUNT: usize = 6;
    pub const ALL: [MiscCounter; Self::COUNT] = [
        MiscCounter::TotalActiveTime,
        MiscCounter::TotalMouseMovement,
        MiscCounter::TotalClickMovement,
        MiscCounter::TotalMovementTime,
        MiscCounter::TotalClicks,
        MiscCounter::TotalKeystrokes,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// A break-lifecycle notification from the break scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakEvent {
    Prompted,
    Taken,
    NaturalTaken,
    Skipped,
    Postponed,
    UniqueBreak,
    /// Additional overdue seconds.
    Overdue(u64),
    /// Additional seconds spent on the break.
    BreakTime(u64),
}

impl BreakEvent {
    /// The counter this event feeds and the amount to add.
    pub fn counter(self) -> (BreakCounter, u64) {
        match self {
            BreakEvent::Prompted => (BreakCounter::Prompted, 1),
            BreakEvent::Taken => (BreakCounter::Taken, 1),
            BreakEvent::NaturalTaken => (BreakCounter::NaturalTaken, 1),
            BreakEvent::Skipped => (BreakCounter::Skipped, 1),
            BreakEvent::Postponed => (BreakCounter::Postponed, 1),
            BreakEvent::UniqueBreak => (BreakCounter::UniqueBreaks, 1),
            BreakEvent::Overdue(secs) => (BreakCounter::TotalOverdue, secs),
            BreakEvent::BreakTime(secs) => (BreakCounter::TotalBreakTime, secs),
        }
    }
}

/// Aggregated counters and timestamps for one calendar date.
///
/// A record without a `start` is the empty sentinel: it was never populated
/// and belongs to no date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRecord {
    /// First moment of the day the record covers.
    pub start: Option<NaiveDateTime>,

    /// Last moment the user was seen active.
    pub stop: Option<NaiveDateTime>,

    /// Indexed by [`BreakKind`] then [`BreakCounter`].
    pub break_counters: [[u64; BreakCounter::COUNT]; BreakKind::COUNT],

    /// Indexed by [`MiscCounter`].
    pub misc_counters: [u64; MiscCounter::COUNT],

    /// Time the pointer spent moving, in milliseconds.
    pub total_mouse_time_ms: u64,
}

impl DailyRecord {
    /// Creates a record for the day containing `start`.
    pub fn new(start: NaiveDateTime) -> Self {
        let start = to_second(start);
        Self {
            start: Some(start),
            stop: Some(start),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none()
    }

    /// Calendar date of the record, `None` for the empty sentinel.
    pub fn date(&self) -> Option<NaiveDate> {
        self.start.map(|s| s.date())
    }

    pub fn starts_at_date(&self, year: i32, month: u32, day: u32) -> bool {
        self.start
            .is_some_and(|s| (s.year(), s.month(), s.day()) == (year, month, day))
    }

    pub fn starts_before_date(&self, year: i32, month: u32, day: u32) -> bool {
        self.start
            .is_some_and(|s| (s.year(), s.month(), s.day()) < (year, month, day))
    }

    pub fn break_counter(&self, kind: BreakKind, counter: BreakCounter) -> u64 {
        self.break_counters[kind.index()][counter.index()]
    }

    pub fn set_break_counter(&mut self, kind: BreakKind, counter: BreakCounter, value: u64) {
        self.break_counters[kind.index()][counter.index()] = value;
    }

    pub fn add_break_counter(&mut self, kind: BreakKind, counter: BreakCounter, value: u64) {
        let slot = &mut self.break_counters[kind.index()][counter.index()];
        *slot = slot.saturating_add(value);
    }

    pub fn misc_counter(&self, counter: MiscCounter) -> u64 {
        self.misc_counters[counter.index()]
    }

    pub fn set_misc_counter(&mut self, counter: MiscCounter, value: u64) {
        self.misc_counters[counter.index()] = value;
    }

    pub fn add_misc_counter(&mut self, counter: MiscCounter, value: u64) {
        let slot = &mut self.misc_counters[counter.index()];
        *slot = slot.saturating_add(value);
    }

    /// Adds pointer-motion time and keeps the whole-second mirror in sync.
    pub fn add_mouse_time_ms(&mut self, ms: u64) {
        self.total_mouse_time_ms = self.total_mouse_time_ms.saturating_add(ms);
        self.misc_counters[MiscCounter::TotalMovementTime.index()] = self.total_mouse_time_ms / 1000;
    }

    /// True once anything at all has been counted.
    pub fn has_activity(&self) -> bool {
        self.total_mouse_time_ms > 0
            || self.misc_counters.iter().any(|&v| v > 0)
            || self.break_counters.iter().flatten().any(|&v| v > 0)
    }

    /// Advances `stop` to `at`, clamped to the last second of the record's day.
    pub fn touch(&mut self, at: NaiveDateTime) {
        let Some(date) = self.date() else {
            return;
        };
        let mut at = to_second(at);
        if at.date() > date {
            match date.and_hms_opt(23, 59, 59) {
                Some(end) => at = end,
                None => return,
            }
        }
        if self.stop.is_none_or(|stop| at > stop) {
            self.stop = Some(at);
        }
    }
}

/// Drops sub-second precision; stored timestamps have second granularity.
pub(crate) fn to_second(at: NaiveDateTime) -> NaiveDateTime {
    at.with_nanosecond(0).unwrap_or(at)
}

/// Position of a date within the history, in `get_day` offsets.
///
/// Offset 0 is the most recent archived day. `prev` points at the closest
/// earlier day and `next` at the closest later day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayLookup {
    pub index: Option<usize>,
    pub next: Option<usize>,
    pub prev: Option<usize>,
}

/// Summary of activity over a range of days.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    /// Number of days with a record in the range.
    pub days: u32,

    /// Total active time in seconds.
    pub total_active_time_secs: u64,

    pub total_keystrokes: u64,

    pub total_clicks: u64,

    /// Pointer travel in pixels.
    pub total_mouse_movement: u64,

    /// Pointer-motion time in seconds.
    pub total_movement_time_secs: u64,

    /// Breaks prompted, summed over all break kinds.
    pub breaks_prompted: u64,

    pub breaks_taken: u64,

    pub breaks_skipped: u64,

    /// Day with the most active time in the range.
    pub busiest_day: Option<NaiveDate>,
}

impl DailySummary {
    /// Average active seconds per recorded day.
    pub fn average_active_secs(&self) -> u64 {
        if self.days == 0 {
            0
        } else {
            self.total_active_time_secs / u64::from(self.days)
        }
    }
}
