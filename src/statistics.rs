//! The statistics engine.
//!
//! [`Statistics`] owns the current day, the archived history, the activity
//! tracker and the log handle behind one mutex. Input callbacks, break
//! notifications, queries, peer merges and the periodic `update` all go
//! through it, so every caller sees a consistent view: a day rollover is
//! either fully visible or not at all.

use crate::clock::{Clock, SystemClock};
use crate::distribution::{decode_message, pack, pack_history, PeerLink, PeerMessage};
use crate::error::{DecodeError, StatsError, StorageError};
use crate::monitor::activity::{ActivityThresholds, ActivityTracker};
use crate::monitor::input::{InputListener, InputSource};
use crate::persistence::{BlockKind, LoadedLog, StatsLog};
use crate::store::{
    merge_records, summarize, BreakCounter, BreakEvent, BreakKind, DailyRecord, DailySummary,
    DayLookup, HistoryStore, MiscCounter,
};
use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Engine settings.
#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// Directory holding the statistics log.
    pub data_dir: PathBuf,

    /// How often the current day is checkpointed while it changes.
    pub checkpoint_interval: Duration,

    /// How long after the last input the user still counts as active.
    pub idle_timeout: Duration,

    /// Longest gap between pointer events that still counts as one motion.
    pub mouse_idle_reset: Duration,

    /// Rewrite the log at startup when it holds superseded blocks.
    pub compact_on_load: bool,
}

impl StatsConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            checkpoint_interval: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(10),
            mouse_idle_reset: Duration::from_secs(1),
            compact_on_load: true,
        }
    }

    pub fn validate(&self) -> Result<(), StatsError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(StatsError::InvalidConfig("data_dir is empty".into()));
        }
        if self.idle_timeout.is_zero() {
            return Err(StatsError::InvalidConfig("idle_timeout must be positive".into()));
        }
        if self.mouse_idle_reset.is_zero() {
            return Err(StatsError::InvalidConfig("mouse_idle_reset must be positive".into()));
        }
        Ok(())
    }

    fn thresholds(&self) -> Result<ActivityThresholds, StatsError> {
        Ok(ActivityThresholds {
            mouse_idle_reset: to_delta("mouse_idle_reset", self.mouse_idle_reset)?,
            idle_timeout: to_delta("idle_timeout", self.idle_timeout)?,
        })
    }
}

fn to_delta(name: &str, value: Duration) -> Result<TimeDelta, StatsError> {
    TimeDelta::from_std(value).map_err(|_| StatsError::InvalidConfig(format!("{name} is too large")))
}

/// Collaborators injected into the engine.
#[derive(Clone)]
pub struct StatsDeps {
    pub clock: Arc<dyn Clock>,

    /// Subscribed at `init`; without one, events are fed by calling the
    /// [`InputListener`] methods directly.
    pub input: Option<Arc<dyn InputSource>>,

    /// Receives every archived day.
    pub peer: Option<Arc<dyn PeerLink>>,
}

impl StatsDeps {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            input: None,
            peer: None,
        }
    }

    /// Local wall clock, no input source, no peers.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    pub fn with_input(mut self, input: Arc<dyn InputSource>) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_peer(mut self, peer: Arc<dyn PeerLink>) -> Self {
        self.peer = Some(peer);
        self
    }
}

/// Storage and distribution diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsHealth {
    /// Set when the log could not be read or written.
    pub degraded: bool,

    /// Truncated or corrupt blocks dropped at load.
    pub discarded_blocks: usize,

    /// Complete blocks at load that a later block for the same day replaced.
    pub superseded_blocks: usize,

    pub last_storage_error: Option<String>,

    pub dropped_peer_messages: u64,
}

struct Inner {
    current: DailyRecord,
    history: HistoryStore,
    tracker: ActivityTracker,
    log: StatsLog,
    health: StatsHealth,
    last_checkpoint: NaiveDateTime,

    /// The current day changed since the last checkpoint.
    dirty: bool,
}

impl Inner {
    fn update(&mut self, now: NaiveDateTime, checkpoint_interval: TimeDelta) -> Option<DailyRecord> {
        let archived = match self.current.date() {
            Some(date) if date != now.date() => self.rollover(now),
            _ => None,
        };

        if self.tracker.tick(&mut self.current, now) {
            self.dirty = true;
        }
        if self.dirty && now - self.last_checkpoint >= checkpoint_interval {
            self.checkpoint(now);
        }
        archived
    }

    /// Archives the current day and starts a new one at `now`.
    fn rollover(&mut self, now: NaiveDateTime) -> Option<DailyRecord> {
        // Credit the finished day up to its own midnight first.
        let midnight = self
            .current
            .date()
            .and_then(|d| d.succ_opt())
            .and_then(|d| d.and_hms_opt(0, 0, 0));
        if let Some(midnight) = midnight {
            self.tracker.tick(&mut self.current, midnight.min(now));
        }

        let finished = std::mem::replace(&mut self.current, DailyRecord::new(now));
        self.tracker.start_day();
        self.last_checkpoint = now;
        self.dirty = false;

        if !finished.has_activity() {
            tracing::debug!(date = ?finished.date(), "Skipping idle day at rollover");
            return None;
        }

        self.history.add(finished.clone());
        self.append(BlockKind::History, &finished);
        tracing::info!(
            date = ?finished.date(),
            history_days = self.history.len(),
            "Day rolled over"
        );
        Some(finished)
    }

    fn checkpoint(&mut self, now: NaiveDateTime) {
        self.last_checkpoint = now;
        self.dirty = false;
        if !self.current.has_activity() {
            return;
        }
        let current = self.current.clone();
        self.append(BlockKind::Today, &current);
        tracing::debug!(date = ?current.date(), "Current day checkpointed");
    }

    fn append(&mut self, kind: BlockKind, record: &DailyRecord) {
        if let Err(e) = self.log.append(kind, record) {
            self.storage_failed(&e);
        }
    }

    fn storage_failed(&mut self, error: &StorageError) {
        tracing::warn!(error = %error, "Statistics storage degraded");
        self.health.degraded = true;
        self.health.last_storage_error = Some(error.to_string());
    }

    /// Merges a peer's day and reports whether anything changed.
    fn merge_remote(&mut self, record: &DailyRecord) -> bool {
        let Some(date) = record.date() else {
            return false;
        };

        if self.current.date() == Some(date) {
            let changed = merge_records(&mut self.current, record);
            self.dirty |= changed;
            return changed;
        }

        if !self.history.add(record.clone()).changed() {
            return false;
        }
        if let Some(merged) = self.history.find(date).cloned() {
            self.append(BlockKind::History, &merged);
        }
        true
    }
}

/// Thread-safe owner of all statistics state.
pub struct Statistics {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
    peer: Option<Arc<dyn PeerLink>>,
    checkpoint_interval: TimeDelta,
}

impl Statistics {
    /// Loads the log from `config.data_dir` and subscribes to the input
    /// source, if any.
    ///
    /// A missing log is a first run. A log that cannot be read starts an
    /// empty history and marks the engine degraded instead of failing.
    pub fn init(config: StatsConfig, deps: StatsDeps) -> Result<Arc<Self>, StatsError> {
        config.validate()?;
        let thresholds = config.thresholds()?;
        let checkpoint_interval = to_delta("checkpoint_interval", config.checkpoint_interval)?;

        let now = deps.clock.now();
        let mut log = StatsLog::new(&config.data_dir);
        let mut health = StatsHealth::default();

        let loaded = match log.load() {
            Ok(Some(loaded)) => loaded,
            Ok(None) => {
                tracing::info!(path = ?log.path(), "No statistics log yet, starting fresh");
                LoadedLog::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Statistics log unreadable, starting with empty history");
                health.degraded = true;
                health.last_storage_error = Some(e.to_string());
                if matches!(e, StorageError::BadHeader { .. }) {
                    if let Err(e) = log.quarantine(now) {
                        tracing::warn!(error = %e, "Failed to move unreadable log aside");
                    }
                }
                LoadedLog::default()
            }
        };

        let LoadedLog {
            mut history,
            today: checkpoints,
            complete_blocks,
            discarded_blocks,
        } = loaded;

        // Checkpoints of earlier days never saw their rollover.
        let mut restored = None;
        for (date, record) in checkpoints {
            if date == now.date() {
                restored = Some(record);
            } else if record.has_activity() {
                history.add(record);
            }
        }

        let live_blocks = history.len() + usize::from(restored.is_some());
        health.discarded_blocks = discarded_blocks;
        health.superseded_blocks = complete_blocks.saturating_sub(live_blocks);

        if config.compact_on_load && health.superseded_blocks + health.discarded_blocks > 0 {
            match log.compact(&history, restored.as_ref()) {
                Ok(()) => tracing::info!(
                    superseded = health.superseded_blocks,
                    discarded = health.discarded_blocks,
                    "Statistics log compacted"
                ),
                Err(e) => {
                    tracing::warn!(error = %e, "Statistics log compaction failed");
                    health.degraded = true;
                    health.last_storage_error = Some(e.to_string());
                }
            }
        }

        if discarded_blocks > 0 {
            tracing::warn!(discarded = discarded_blocks, "Dropped incomplete statistics blocks");
        }
        tracing::info!(
            path = ?log.path(),
            history_days = history.len(),
            restored_today = restored.is_some(),
            "Statistics loaded"
        );

        let current = restored.unwrap_or_else(|| DailyRecord::new(now));
        let stats = Arc::new(Self {
            inner: Mutex::new(Inner {
                current,
                history,
                tracker: ActivityTracker::new(thresholds, now),
                log,
                health,
                last_checkpoint: now,
                dirty: false,
            }),
            clock: deps.clock,
            peer: deps.peer,
            checkpoint_interval,
        });

        if let Some(input) = deps.input {
            input.subscribe(stats.clone())?;
        }
        Ok(stats)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Periodic tick: credits active time, checkpoints and rolls the day over
    /// at midnight.
    pub fn update(&self) {
        let now = self.clock.now();
        let archived = self.lock().update(now, self.checkpoint_interval);
        if let Some(record) = archived {
            self.broadcast(&record);
        }
    }

    /// Writes a checkpoint of the current day now.
    pub fn dump(&self) {
        let now = self.clock.now();
        self.lock().checkpoint(now);
    }

    /// Forgets every archived day and the current day, on disk too.
    pub fn delete_all_history(&self) -> Result<(), StatsError> {
        let now = self.clock.now();
        let mut inner = self.lock();

        inner.history.delete_all();
        inner.current = DailyRecord::new(now);
        inner.tracker.start_day();
        inner.last_checkpoint = now;
        inner.dirty = false;

        if let Err(e) = inner.log.erase() {
            inner.storage_failed(&e);
            return Err(e.into());
        }
        tracing::info!("Statistics history deleted");
        Ok(())
    }

    fn broadcast(&self, record: &DailyRecord) {
        if let Some(peer) = &self.peer {
            let message = pack(record);
            tracing::debug!(date = ?record.date(), bytes = message.len(), "Broadcasting day to peers");
            peer.broadcast(&message);
        }
    }

    // Break notifications

    pub fn notify_break(&self, kind: BreakKind, event: BreakEvent) {
        let (counter, amount) = event.counter();
        self.add_break_counter(kind, counter, amount);
    }

    pub fn increment_break_counter(&self, kind: BreakKind, counter: BreakCounter) {
        self.add_break_counter(kind, counter, 1);
    }

    pub fn add_break_counter(&self, kind: BreakKind, counter: BreakCounter, value: u64) {
        let mut inner = self.lock();
        inner.current.add_break_counter(kind, counter, value);
        inner.dirty = true;
    }

    pub fn set_break_counter(&self, kind: BreakKind, counter: BreakCounter, value: u64) {
        let mut inner = self.lock();
        inner.current.set_break_counter(kind, counter, value);
        inner.dirty = true;
    }

    pub fn get_break_counter(&self, kind: BreakKind, counter: BreakCounter) -> u64 {
        self.lock().current.break_counter(kind, counter)
    }

    pub fn set_counter(&self, counter: MiscCounter, value: u64) {
        let mut inner = self.lock();
        inner.current.set_misc_counter(counter, value);
        inner.dirty = true;
    }

    pub fn get_counter(&self, counter: MiscCounter) -> u64 {
        self.lock().current.misc_counter(counter)
    }

    // Queries

    pub fn get_current_day(&self) -> DailyRecord {
        self.lock().current.clone()
    }

    /// Archived day `index` steps back from the most recent one.
    pub fn get_day(&self, index: usize) -> Result<DailyRecord, StatsError> {
        self.lock().history.get_day(index).cloned()
    }

    pub fn get_day_index_by_date(&self, year: i32, month: u32, day: u32) -> DayLookup {
        self.lock().history.get_day_index_by_date(year, month, day)
    }

    pub fn get_history_size(&self) -> usize {
        self.lock().history.len()
    }

    /// All archived days, oldest first.
    pub fn history(&self) -> Vec<DailyRecord> {
        self.lock().history.iter().cloned().collect()
    }

    /// Runs `f` over the current day and history under a single lock.
    pub fn with_days<R>(&self, f: impl FnOnce(&DailyRecord, &HistoryStore) -> R) -> R {
        let inner = self.lock();
        f(&inner.current, &inner.history)
    }

    /// Summary of the last `days` calendar days, today included.
    pub fn summary(&self, days: u32) -> DailySummary {
        if days == 0 {
            return DailySummary::default();
        }
        let today = self.clock.now().date();
        let from = today - TimeDelta::days(i64::from(days) - 1);

        let inner = self.lock();
        let current = Some(&inner.current).filter(|c| c.date().is_some_and(|d| d >= from));
        summarize(inner.history.range(from, today).iter().chain(current))
    }

    pub fn health(&self) -> StatsHealth {
        self.lock().health.clone()
    }

    pub fn log_path(&self) -> PathBuf {
        self.lock().log.path().to_path_buf()
    }

    // Peer distribution

    /// Merges a peer's copy of a day. Returns whether local state changed.
    pub fn merge_remote_day(&self, record: &DailyRecord) -> bool {
        let changed = self.lock().merge_remote(record);
        tracing::debug!(date = ?record.date(), changed, "Merged remote day");
        changed
    }

    /// Decodes a peer message and merges every day in it.
    ///
    /// Returns the number of days that changed local state. A message that
    /// does not decode is dropped whole.
    pub fn receive_peer_message(&self, message: &[u8]) -> Result<usize, DecodeError> {
        let records = match decode_message(message) {
            Ok(PeerMessage::Day(record)) => vec![record],
            Ok(PeerMessage::History(records)) => records,
            Err(e) => {
                tracing::warn!(error = %e, bytes = message.len(), "Dropping peer message");
                self.lock().health.dropped_peer_messages += 1;
                return Err(e);
            }
        };

        let mut inner = self.lock();
        let changed = records.iter().filter(|r| inner.merge_remote(r)).count();
        tracing::debug!(days = records.len(), changed, "Peer message merged");
        Ok(changed)
    }

    /// Packs the history and the current day for a peer.
    pub fn peer_snapshot(&self) -> Vec<u8> {
        let inner = self.lock();
        pack_history(inner.history.iter().chain(std::iter::once(&inner.current)))
    }
}

impl InputListener for Statistics {
    fn action_notify(&self) {
        let now = self.clock.now();
        self.lock().tracker.action(now);
    }

    fn mouse_notify(&self, x: i32, y: i32, wheel: i32) {
        let now = self.clock.now();
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.tracker.mouse_motion(&mut inner.current, now, x, y, wheel);
        inner.dirty = true;
    }

    fn button_notify(&self, is_press: bool) {
        let now = self.clock.now();
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.tracker.button(&mut inner.current, now, is_press);
        inner.dirty = true;
    }

    fn keyboard_notify(&self, repeat: bool) {
        let now = self.clock.now();
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.tracker.keyboard(&mut inner.current, now, repeat);
        inner.dirty = true;
    }
}
