//! Per-event activity classification.
//!
//! [`ActivityTracker`] turns raw pointer, button and keyboard events into
//! counter updates on the current day and keeps track of whether the user is
//! active. It holds no lock and does no I/O; the owner serializes access.

use crate::store::{DailyRecord, MiscCounter};
use chrono::{NaiveDateTime, TimeDelta};

/// Timing thresholds for activity detection.
#[derive(Debug, Clone, Copy)]
pub struct ActivityThresholds {
    /// Longest gap between two pointer events that still counts as one
    /// continuous motion.
    pub mouse_idle_reset: TimeDelta,

    /// How long after the last input the user still counts as active.
    pub idle_timeout: TimeDelta,
}

impl Default for ActivityThresholds {
    fn default() -> Self {
        Self {
            mouse_idle_reset: TimeDelta::seconds(1),
            idle_timeout: TimeDelta::seconds(10),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PointerSample {
    x: i32,
    y: i32,
    at: NaiveDateTime,
}

/// State machine fed by input events.
#[derive(Debug)]
pub struct ActivityTracker {
    thresholds: ActivityThresholds,

    /// Last pointer position and when it was seen.
    pointer: Option<PointerSample>,

    /// Pointer position at the previous button press.
    last_click: Option<(i32, i32)>,

    /// Sub-pixel pointer travel not yet added to the day.
    movement_carry: f64,

    /// Active milliseconds not yet added to the day.
    active_carry_ms: i64,

    /// Start of the current stretch of activity.
    active_since: Option<NaiveDateTime>,

    last_activity: Option<NaiveDateTime>,

    last_tick: NaiveDateTime,
}

impl ActivityTracker {
    pub fn new(thresholds: ActivityThresholds, now: NaiveDateTime) -> Self {
        Self {
            thresholds,
            pointer: None,
            last_click: None,
            movement_carry: 0.0,
            active_carry_ms: 0,
            active_since: None,
            last_activity: None,
            last_tick: now,
        }
    }

    /// Records pointer motion and/or wheel rotation.
    pub fn mouse_motion(&mut self, day: &mut DailyRecord, now: NaiveDateTime, x: i32, y: i32, wheel: i32) {
        self.mark_active(now);

        let Some(prev) = self.pointer.replace(PointerSample { x, y, at: now }) else {
            return;
        };

        let gap = now - prev.at;
        if gap < TimeDelta::zero() || gap >= self.thresholds.mouse_idle_reset {
            tracing::trace!(gap_ms = gap.num_milliseconds(), "Pointer baseline reset");
            return;
        }

        let distance = distance((prev.x, prev.y), (x, y)) + f64::from(wheel.unsigned_abs());
        if distance <= 0.0 {
            return;
        }

        self.movement_carry += distance;
        let whole = self.movement_carry.floor();
        self.movement_carry -= whole;
        day.add_misc_counter(MiscCounter::TotalMouseMovement, whole as u64);

        let gap_ms = u64::try_from(gap.num_milliseconds()).unwrap_or(0);
        day.add_mouse_time_ms(gap_ms);
    }

    /// Records a button press or release.
    pub fn button(&mut self, day: &mut DailyRecord, now: NaiveDateTime, is_press: bool) {
        self.mark_active(now);
        if !is_press {
            return;
        }

        day.add_misc_counter(MiscCounter::TotalClicks, 1);

        if let Some(pointer) = self.pointer {
            let here = (pointer.x, pointer.y);
            if let Some(previous) = self.last_click.replace(here) {
                let travelled = distance(previous, here).round() as u64;
                day.add_misc_counter(MiscCounter::TotalClickMovement, travelled);
            }
        }
    }

    /// Records a key event. Auto-repeats only count as activity.
    pub fn keyboard(&mut self, day: &mut DailyRecord, now: NaiveDateTime, repeat: bool) {
        self.mark_active(now);
        if !repeat {
            day.add_misc_counter(MiscCounter::TotalKeystrokes, 1);
        }
    }

    /// Records input that carries no countable payload.
    pub fn action(&mut self, now: NaiveDateTime) {
        self.mark_active(now);
    }

    /// Credits active time since the previous tick to `day`.
    ///
    /// Returns whether the user is currently active.
    pub fn tick(&mut self, day: &mut DailyRecord, now: NaiveDateTime) -> bool {
        if let (Some(since), Some(last)) = (self.active_since, self.last_activity) {
            let from = since.max(self.last_tick);
            let until = now.min(last + self.thresholds.idle_timeout);
            if until > from {
                self.active_carry_ms += (until - from).num_milliseconds();
                let secs = self.active_carry_ms / 1000;
                self.active_carry_ms %= 1000;
                day.add_misc_counter(MiscCounter::TotalActiveTime, u64::try_from(secs).unwrap_or(0));
            }
        }
        if now > self.last_tick {
            self.last_tick = now;
        }

        let active = self.is_active(now);
        if active {
            day.touch(now);
        }
        active
    }

    pub fn is_active(&self, now: NaiveDateTime) -> bool {
        self.last_activity
            .is_some_and(|last| now >= last && now - last < self.thresholds.idle_timeout)
    }

    /// Resets per-day state. Pointer and click baselines carry over.
    pub fn start_day(&mut self) {
        self.active_carry_ms = 0;
        self.movement_carry = 0.0;
    }

    fn mark_active(&mut self, now: NaiveDateTime) {
        if !self.is_active(now) {
            self.active_since = Some(now);
        }
        self.last_activity = Some(now);
    }
}

fn distance(a: (i32, i32), b: (i32, i32)) -> f64 {
    let dx = f64::from(b.0) - f64::from(a.0);
    let dy = f64::from(b.1) - f64::from(a.1);
    dx.hypot(dy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 6, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn ms(n: i64) -> TimeDelta {
        TimeDelta::milliseconds(n)
    }

    fn create_test_tracker() -> (ActivityTracker, DailyRecord) {
        (
            ActivityTracker::new(ActivityThresholds::default(), start()),
            DailyRecord::new(start()),
        )
    }

    #[test]
    fn test_movement_sums_pairwise_distances() {
        let (mut tracker, mut day) = create_test_tracker();
        let mut now = start();

        tracker.mouse_motion(&mut day, now, 0, 0, 0);
        for i in 1..=50 {
            now += ms(10);
            tracker.mouse_motion(&mut day, now, 3 * i, 4 * i, 0);
        }

        assert_eq!(day.misc_counter(MiscCounter::TotalMouseMovement), 250);
        assert_eq!(day.total_mouse_time_ms, 500);
    }

    #[test]
    fn test_first_event_only_sets_baseline() {
        let (mut tracker, mut day) = create_test_tracker();
        tracker.mouse_motion(&mut day, start(), 500, 500, 0);
        assert_eq!(day.misc_counter(MiscCounter::TotalMouseMovement), 0);
        assert_eq!(day.total_mouse_time_ms, 0);
    }

    #[test]
    fn test_long_gap_resets_baseline() {
        let (mut tracker, mut day) = create_test_tracker();
        let t0 = start();

        tracker.mouse_motion(&mut day, t0, 0, 0, 0);
        tracker.mouse_motion(&mut day, t0 + ms(100), 10, 0, 0);
        // Teleport after a long pause, e.g. a virtual desktop switch.
        tracker.mouse_motion(&mut day, t0 + ms(5_000), 4_000, 3_000, 0);
        tracker.mouse_motion(&mut day, t0 + ms(5_050), 4_000, 3_006, 0);

        assert_eq!(day.misc_counter(MiscCounter::TotalMouseMovement), 16);
        assert_eq!(day.total_mouse_time_ms, 150);
    }

    #[test]
    fn test_fractional_movement_accumulates() {
        let (mut tracker, mut day) = create_test_tracker();
        let t0 = start();

        tracker.mouse_motion(&mut day, t0, 0, 0, 0);
        // Four diagonal steps of sqrt(2) each.
        for i in 1..=4 {
            tracker.mouse_motion(&mut day, t0 + ms(10 * i64::from(i)), i, i, 0);
        }

        assert_eq!(day.misc_counter(MiscCounter::TotalMouseMovement), 5);
    }

    #[test]
    fn test_wheel_counts_as_movement() {
        let (mut tracker, mut day) = create_test_tracker();
        let t0 = start();

        tracker.mouse_motion(&mut day, t0, 100, 100, 0);
        tracker.mouse_motion(&mut day, t0 + ms(20), 100, 100, -3);

        assert_eq!(day.misc_counter(MiscCounter::TotalMouseMovement), 3);
        assert_eq!(day.total_mouse_time_ms, 20);
    }

    #[test]
    fn test_clicks_and_click_movement() {
        let (mut tracker, mut day) = create_test_tracker();
        let t0 = start();

        tracker.mouse_motion(&mut day, t0, 0, 0, 0);
        tracker.button(&mut day, t0, true);
        tracker.button(&mut day, t0, false);
        tracker.mouse_motion(&mut day, t0 + ms(10), 30, 40, 0);
        tracker.button(&mut day, t0 + ms(10), true);

        assert_eq!(day.misc_counter(MiscCounter::TotalClicks), 2);
        assert_eq!(day.misc_counter(MiscCounter::TotalClickMovement), 50);
    }

    #[test]
    fn test_repeat_keys_are_not_counted() {
        let (mut tracker, mut day) = create_test_tracker();
        let t0 = start();

        for _ in 0..3 {
            tracker.keyboard(&mut day, t0, false);
        }
        for _ in 0..2 {
            tracker.keyboard(&mut day, t0, true);
        }

        assert_eq!(day.misc_counter(MiscCounter::TotalKeystrokes), 3);
        assert!(tracker.is_active(t0));
    }

    #[test]
    fn test_tick_credits_active_time_until_idle() {
        let (mut tracker, mut day) = create_test_tracker();
        let t0 = start();

        tracker.action(t0 + TimeDelta::seconds(2));
        assert!(tracker.tick(&mut day, t0 + TimeDelta::seconds(5)));
        assert_eq!(day.misc_counter(MiscCounter::TotalActiveTime), 3);
        assert_eq!(day.stop, Some(t0 + TimeDelta::seconds(5)));

        // Idle timeout is 10s after the last input, at t0+12s.
        assert!(!tracker.tick(&mut day, t0 + TimeDelta::seconds(60)));
        assert_eq!(day.misc_counter(MiscCounter::TotalActiveTime), 10);
        assert_eq!(day.stop, Some(t0 + TimeDelta::seconds(5)));

        assert!(!tracker.tick(&mut day, t0 + TimeDelta::seconds(120)));
        assert_eq!(day.misc_counter(MiscCounter::TotalActiveTime), 10);
    }

    #[test]
    fn test_tick_carries_sub_second_time() {
        let (mut tracker, mut day) = create_test_tracker();
        let mut now = start();

        tracker.action(now);
        for _ in 0..4 {
            now += ms(400);
            tracker.action(now);
            tracker.tick(&mut day, now);
        }

        assert_eq!(day.misc_counter(MiscCounter::TotalActiveTime), 1);
    }

    #[test]
    fn test_start_day_drops_partial_second() {
        let (mut tracker, mut day) = create_test_tracker();
        let t0 = start();

        tracker.action(t0);
        tracker.tick(&mut day, t0 + ms(400));
        tracker.start_day();
        tracker.tick(&mut day, t0 + ms(1000));

        assert_eq!(day.misc_counter(MiscCounter::TotalActiveTime), 0);
    }
}
