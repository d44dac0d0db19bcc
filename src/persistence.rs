//! Append-only text log for crash-safe statistics storage.
//!
//! Every checkpoint of the current day and every archived day is appended as
//! one self-contained block:
//!
//! ```text
//! ActivityStats 1
//! D today 2026-10-17
//! S 2026 10 17 8 58 12
//! E 2026 10 17 17 3 40
//! B 0 12 10 1 1 0 10 340 3600
//! B 1 ...
//! B 2 ...
//! M 21600 185000 9400 3100 4200 52000
//! P 3100250
//! Z
//! ```
//!
//! A block only counts once its `Z` line is read, so a crash mid-write costs
//! at most the block being written. Unknown markers and extra trailing fields
//! are skipped and missing trailing fields read as zero, which keeps older
//! readers working on logs written by newer ones.

use crate::error::StorageError;
use crate::store::{merge_records, BreakKind, DailyRecord, HistoryStore, MiscCounter};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// File name of the log inside the data directory.
pub const LOG_FILE_NAME: &str = "activity-stats.log";

const HEADER_NAME: &str = "ActivityStats";
const FORMAT_VERSION: u32 = 1;

/// Role of a block in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Checkpoint of the day still in progress.
    Today,
    /// A finished (or peer-merged) day.
    History,
}

impl BlockKind {
    fn token(self) -> &'static str {
        match self {
            BlockKind::Today => "today",
            BlockKind::History => "history",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "today" => Some(BlockKind::Today),
            "history" => Some(BlockKind::History),
            _ => None,
        }
    }
}

/// Everything recovered from a log.
#[derive(Debug, Default)]
pub struct LoadedLog {
    /// Archived days, merged per date.
    pub history: HistoryStore,

    /// Today checkpoints, merged per date. Only the caller knows which one
    /// is still today.
    pub today: BTreeMap<NaiveDate, DailyRecord>,

    /// Blocks that parsed completely.
    pub complete_blocks: usize,

    /// Truncated or corrupt blocks that were dropped.
    pub discarded_blocks: usize,
}

/// Handle on the statistics log file.
#[derive(Debug)]
pub struct StatsLog {
    path: PathBuf,
    file: Option<File>,
}

impl StatsLog {
    /// Log stored as [`LOG_FILE_NAME`] inside `data_dir`.
    pub fn new(data_dir: &Path) -> Self {
        Self::at(data_dir.join(LOG_FILE_NAME))
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path, file: None }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole log. Returns `Ok(None)` when there is no log yet.
    pub fn load(&self) -> Result<Option<LoadedLog>, StorageError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io("read", &self.path, e)),
        };

        let text = String::from_utf8_lossy(&bytes);
        parse_log(&text)
            .map(Some)
            .map_err(|found| StorageError::BadHeader {
                path: self.path.clone(),
                found,
            })
    }

    /// Moves an unreadable log aside so a fresh one can be started.
    ///
    /// The target name carries `stamp`, so an earlier quarantined log is
    /// never overwritten.
    pub fn quarantine(&mut self, stamp: NaiveDateTime) -> Result<PathBuf, StorageError> {
        self.file = None;
        let base = format!("{}.corrupt", stamp.format("%Y%m%dT%H%M%S"));
        let mut target = self.path.with_extension(format!("log.{base}"));
        let mut n = 1;
        while target.exists() {
            target = self.path.with_extension(format!("log.{base}.{n}"));
            n += 1;
        }
        fs::rename(&self.path, &target)
            .map_err(|e| StorageError::io("quarantine", &self.path, e))?;
        tracing::warn!(path = ?target, "Moved unreadable statistics log aside");
        Ok(target)
    }

    /// Appends one block. History blocks are synced to disk.
    pub fn append(&mut self, kind: BlockKind, record: &DailyRecord) -> Result<(), StorageError> {
        let Some(block) = format_block(kind, record) else {
            tracing::debug!("Skipping empty day record");
            return Ok(());
        };

        let path = self.path.clone();
        let file = self.open_append()?;
        file.write_all(block.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| StorageError::io("append to", &path, e))?;

        if kind == BlockKind::History {
            file.sync_data()
                .map_err(|e| StorageError::io("sync", &path, e))?;
        }
        Ok(())
    }

    /// Atomically replaces the log with one block per day.
    pub fn compact(
        &mut self,
        history: &HistoryStore,
        today: Option<&DailyRecord>,
    ) -> Result<(), StorageError> {
        self.file = None;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io("create directory for", parent, e))?;
        }

        let mut contents = header();
        for record in history.iter() {
            contents.extend(format_block(BlockKind::History, record));
        }
        if let Some(record) = today {
            contents.extend(format_block(BlockKind::Today, record));
        }

        let tmp = self.path.with_extension("log.tmp");
        let write = || -> io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        };
        write().map_err(|e| StorageError::io("rewrite", &self.path, e))?;

        tracing::debug!(path = ?self.path, days = history.len(), "Statistics log compacted");
        Ok(())
    }

    /// Truncates the log to an empty one.
    pub fn erase(&mut self) -> Result<(), StorageError> {
        self.compact(&HistoryStore::new(), None)
    }

    fn open_append(&mut self) -> Result<&mut File, StorageError> {
        if self.file.is_none() {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| StorageError::io("create directory for", parent, e))?;
            }

            let mut file = OpenOptions::new()
                .create(true)
                .read(true)
                .append(true)
                .open(&self.path)
                .map_err(|e| StorageError::io("open", &self.path, e))?;

            let len = file
                .metadata()
                .map_err(|e| StorageError::io("inspect", &self.path, e))?
                .len();
            if len == 0 {
                file.write_all(header().as_bytes())
                    .map_err(|e| StorageError::io("write header to", &self.path, e))?;
            } else if !ends_with_newline(&mut file)
                .map_err(|e| StorageError::io("inspect", &self.path, e))?
            {
                // A torn line from an interrupted write must not swallow the
                // next block's day marker.
                tracing::debug!(path = ?self.path, "Terminating torn statistics line");
                file.write_all(b"\n")
                    .map_err(|e| StorageError::io("append to", &self.path, e))?;
            }
            self.file = Some(file);
        }

        self.file
            .as_mut()
            .ok_or_else(|| StorageError::io("open", &self.path, io::ErrorKind::NotFound.into()))
    }
}

fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

fn header() -> String {
    format!("{HEADER_NAME} {FORMAT_VERSION}\n")
}

/// Serializes one block, `None` for the empty sentinel.
pub fn format_block(kind: BlockKind, record: &DailyRecord) -> Option<String> {
    let start = record.start?;
    let stop = record.stop.unwrap_or(start);

    let mut out = String::with_capacity(256);
    let _ = writeln!(out, "D {} {}", kind.token(), start.date().format("%Y-%m-%d"));
    let _ = writeln!(out, "S {}", format_stamp(start));
    let _ = writeln!(out, "E {}", format_stamp(stop));
    for break_kind in BreakKind::ALL {
        let _ = write!(out, "B {}", break_kind.index());
        push_values(&mut out, &record.break_counters[break_kind.index()]);
    }
    out.push('M');
    push_values(&mut out, &record.misc_counters);
    let _ = writeln!(out, "P {}", record.total_mouse_time_ms);
    out.push_str("Z\n");
    Some(out)
}

fn format_stamp(at: NaiveDateTime) -> String {
    format!(
        "{} {} {} {} {} {}",
        at.year(),
        at.month(),
        at.day(),
        at.hour(),
        at.minute(),
        at.second()
    )
}

fn push_values(out: &mut String, values: &[u64]) {
    for v in values {
        let _ = write!(out, " {v}");
    }
    out.push('\n');
}

/// Parses a whole log. Fails only when the header is not recognised.
pub fn parse_log(text: &str) -> Result<LoadedLog, String> {
    let mut lines = text.lines();
    let mut loaded = LoadedLog::default();

    let Some(first) = lines.find(|l| !l.trim().is_empty()) else {
        return Ok(loaded);
    };
    check_header(first)?;

    let mut pending: Option<PendingBlock> = None;
    for line in lines {
        let mut fields = line.split_ascii_whitespace();
        let Some(marker) = fields.next() else {
            continue;
        };

        if marker == "D" {
            if pending.take().is_some() {
                loaded.discarded_blocks += 1;
            }
            match PendingBlock::open(fields) {
                Some(block) => pending = Some(block),
                None => {
                    tracing::debug!(line, "Unparseable day marker");
                    loaded.discarded_blocks += 1;
                }
            }
            continue;
        }

        if marker == "Z" {
            if let Some(block) = pending.take() {
                loaded.commit(block);
            }
            continue;
        }

        let Some(block) = pending.as_mut() else {
            continue;
        };
        match marker {
            "S" | "E" | "B" | "M" | "P" => {
                if block.apply(marker, fields).is_none() {
                    tracing::debug!(line, "Corrupt statistics line");
                    block.corrupt = true;
                }
            }
            _ => tracing::trace!(marker, "Skipping unknown statistics marker"),
        }
    }

    if pending.is_some() {
        tracing::debug!("Dropping incomplete trailing statistics block");
        loaded.discarded_blocks += 1;
    }
    Ok(loaded)
}

fn check_header(line: &str) -> Result<(), String> {
    let mut fields = line.split_ascii_whitespace();
    let name = fields.next();
    let version = fields.next().and_then(|v| v.parse::<u32>().ok());
    match (name, version) {
        (Some(HEADER_NAME), Some(version)) => {
            if version > FORMAT_VERSION {
                tracing::debug!(version, "Statistics log written by a newer format revision");
            }
            Ok(())
        }
        _ => Err(line.chars().take(64).collect()),
    }
}

struct PendingBlock {
    kind: BlockKind,
    date: NaiveDate,
    record: DailyRecord,
    corrupt: bool,
}

impl PendingBlock {
    fn open<'a>(mut fields: impl Iterator<Item = &'a str>) -> Option<Self> {
        let kind = BlockKind::from_token(fields.next()?)?;
        let date = NaiveDate::parse_from_str(fields.next()?, "%Y-%m-%d").ok()?;
        Some(Self {
            kind,
            date,
            record: DailyRecord::default(),
            corrupt: false,
        })
    }

    /// Applies one data line; `None` marks the block corrupt.
    fn apply<'a>(&mut self, marker: &str, mut fields: impl Iterator<Item = &'a str>) -> Option<()> {
        match marker {
            "S" => self.record.start = parse_stamp(fields)?,
            "E" => self.record.stop = parse_stamp(fields)?,
            "B" => {
                let id: usize = fields.next()?.parse().ok()?;
                // Break kinds from a newer writer are skipped.
                if let Some(kind) = BreakKind::from_index(id) {
                    parse_values(fields, &mut self.record.break_counters[kind.index()])?;
                }
            }
            "M" => parse_values(fields, &mut self.record.misc_counters)?,
            "P" => self.record.total_mouse_time_ms = fields.next()?.parse().ok()?,
            _ => {}
        }
        Some(())
    }

    fn finish(mut self) -> Option<(BlockKind, DailyRecord)> {
        if self.corrupt {
            return None;
        }
        let record = &mut self.record;
        if record.start.is_none() {
            record.start = self.date.and_hms_opt(0, 0, 0);
        }
        if record.date() != Some(self.date) {
            return None;
        }
        record.stop = match (record.start, record.stop) {
            (Some(start), Some(stop)) if stop >= start => Some(stop),
            (start, _) => start,
        };
        if record.total_mouse_time_ms / 1000 > record.misc_counter(MiscCounter::TotalMovementTime) {
            record.set_misc_counter(MiscCounter::TotalMovementTime, record.total_mouse_time_ms / 1000);
        }
        Some((self.kind, self.record))
    }
}

impl LoadedLog {
    fn commit(&mut self, block: PendingBlock) {
        let Some((kind, record)) = block.finish() else {
            self.discarded_blocks += 1;
            return;
        };
        self.complete_blocks += 1;

        match kind {
            BlockKind::History => {
                self.history.add(record);
            }
            BlockKind::Today => {
                let Some(date) = record.date() else {
                    return;
                };
                self.today
                    .entry(date)
                    .and_modify(|existing| {
                        merge_records(existing, &record);
                    })
                    .or_insert(record);
            }
        }
    }
}

/// `year month day hour min sec`; year 0 is the empty timestamp.
fn parse_stamp<'a>(mut fields: impl Iterator<Item = &'a str>) -> Option<Option<NaiveDateTime>> {
    let mut next = || fields.next()?.parse::<u32>().ok();
    let (year, month, day) = (next()?, next()?, next()?);
    let (hour, minute, second) = (next()?, next()?, next()?);
    if year == 0 {
        return Some(None);
    }
    let date = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)?;
    Some(Some(date.and_hms_opt(hour, minute, second)?))
}

/// Fills `slots` from the fields present; extras are ignored.
fn parse_values<'a>(fields: impl Iterator<Item = &'a str>, slots: &mut [u64]) -> Option<()> {
    for (slot, field) in slots.iter_mut().zip(fields) {
        *slot = field.parse().ok()?;
    }
    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::BreakCounter;
    use chrono::TimeDelta;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 9, d)
            .unwrap()
            .and_hms_opt(h, 15, 30)
            .unwrap()
    }

    fn create_test_day(d: u32, keys: u64) -> DailyRecord {
        let mut record = DailyRecord::new(at(d, 8));
        record.stop = Some(at(d, 18));
        record.set_misc_counter(MiscCounter::TotalKeystrokes, keys);
        record.set_misc_counter(MiscCounter::TotalActiveTime, 3600 + u64::from(d));
        record.add_break_counter(BreakKind::RestBreak, BreakCounter::Prompted, 3);
        record.add_break_counter(BreakKind::DailyLimit, BreakCounter::TotalOverdue, 120);
        record.add_mouse_time_ms(42_123);
        record
    }

    fn create_test_log(days: &[DailyRecord], today: Option<&DailyRecord>) -> String {
        let mut text = header();
        for day in days {
            text.push_str(&format_block(BlockKind::History, day).unwrap());
        }
        if let Some(day) = today {
            text.push_str(&format_block(BlockKind::Today, day).unwrap());
        }
        text
    }

    #[test]
    fn test_block_round_trip() {
        let day = create_test_day(3, 500);
        let text = create_test_log(std::slice::from_ref(&day), None);

        let loaded = parse_log(&text).unwrap();
        assert_eq!(loaded.complete_blocks, 1);
        assert_eq!(loaded.discarded_blocks, 0);
        assert_eq!(loaded.history.get_day(0).unwrap(), &day);
    }

    #[test]
    fn test_block_layout() {
        let text = format_block(BlockKind::Today, &create_test_day(3, 500)).unwrap();
        let lines: Vec<_> = text.lines().collect();
        let (kinds, counters, misc) = (BreakKind::COUNT, BreakCounter::COUNT, MiscCounter::COUNT);

        assert_eq!(lines[0], "D today 2026-09-03");
        assert_eq!(lines[1], "S 2026 9 3 8 15 30");
        assert_eq!(lines[2], "E 2026 9 3 18 15 30");
        assert_eq!(lines.iter().filter(|l| l.starts_with("B ")).count(), kinds);
        assert_eq!(lines[3].split_whitespace().count(), counters + 2);
        assert_eq!(lines[3 + kinds].split_whitespace().count(), misc + 1);
        assert_eq!(lines.last(), Some(&"Z"));
    }

    #[test]
    fn test_empty_record_is_not_written() {
        assert!(format_block(BlockKind::History, &DailyRecord::default()).is_none());
    }

    #[test]
    fn test_empty_text_is_empty_log() {
        let loaded = parse_log("").unwrap();
        assert!(loaded.history.is_empty());
        assert!(loaded.today.is_empty());
    }

    #[test]
    fn test_bad_header_is_rejected() {
        assert!(parse_log("garbage\nD history 2026-09-03\n").is_err());
        assert!(parse_log("ActivityStats x\n").is_err());
    }

    #[test]
    fn test_truncated_at_every_offset() {
        let days: Vec<_> = (1..=4).map(|d| create_test_day(d, u64::from(d) * 100)).collect();
        let text = create_test_log(&days, None);

        // Byte offset at which each block ends.
        let mut ends = Vec::new();
        let mut offset = header().len();
        for day in &days {
            offset += format_block(BlockKind::History, day).unwrap().len();
            ends.push(offset);
        }

        for cut in header().len()..=text.len() {
            let loaded = parse_log(&text[..cut]).unwrap();
            let complete = ends.iter().filter(|&&end| end <= cut).count();
            // "Z" without its newline is still a complete block.
            let complete = if ends.iter().any(|&end| end - 1 == cut) {
                complete + 1
            } else {
                complete
            };
            assert_eq!(loaded.history.len(), complete, "cut at {cut}");
            for (i, day) in loaded.history.iter().enumerate() {
                assert_eq!(day, &days[i], "cut at {cut}");
            }
        }
    }

    #[test]
    fn test_corrupt_block_is_skipped() {
        let days = [create_test_day(1, 10), create_test_day(2, 20), create_test_day(3, 30)];
        let text = create_test_log(&days, None).replace("M 3602", "M 36x2");

        let loaded = parse_log(&text).unwrap();
        assert_eq!(loaded.discarded_blocks, 1);
        assert_eq!(loaded.history.len(), 2);
        assert!(loaded.history.get_day(0).unwrap().starts_at_date(2026, 9, 3));
        assert!(loaded.history.get_day(1).unwrap().starts_at_date(2026, 9, 1));
    }

    #[test]
    fn test_block_without_end_marker_is_discarded() {
        let days = [create_test_day(1, 10), create_test_day(2, 20)];
        let text = create_test_log(&days, None).replacen("Z\n", "", 1);

        let loaded = parse_log(&text).unwrap();
        assert_eq!(loaded.discarded_blocks, 1);
        assert_eq!(loaded.history.len(), 1);
        assert!(loaded.history.get_day(0).unwrap().starts_at_date(2026, 9, 2));
    }

    #[test]
    fn test_unknown_markers_and_fields_are_tolerated() {
        let text = "ActivityStats 2\n\
                    X something from the future\n\
                    D history 2026-09-05 extra\n\
                    S 2026 9 5 8 0 0\n\
                    E 2026 9 5 17 0 0 99\n\
                    Q 1 2 3\n\
                    B 0 1 2 3 4 5 6 7 8 9 10\n\
                    B 7 1 1 1\n\
                    M 100 200\n\
                    Z\n";

        let loaded = parse_log(text).unwrap();
        assert_eq!(loaded.complete_blocks, 1);
        let day = loaded.history.get_day(0).unwrap();
        assert_eq!(day.break_counter(BreakKind::MicroBreak, BreakCounter::TotalBreakTime), 8);
        assert_eq!(day.misc_counter(MiscCounter::TotalActiveTime), 100);
        assert_eq!(day.misc_counter(MiscCounter::TotalMouseMovement), 200);
        assert_eq!(day.misc_counter(MiscCounter::TotalKeystrokes), 0);
        assert_eq!(day.total_mouse_time_ms, 0);
    }

    #[test]
    fn test_later_blocks_merge_with_earlier() {
        let first = create_test_day(4, 100);
        let mut later = first.clone();
        later.set_misc_counter(MiscCounter::TotalKeystrokes, 250);
        later.stop = Some(at(4, 20));

        let mut text = header();
        text.push_str(&format_block(BlockKind::Today, &first).unwrap());
        text.push_str(&format_block(BlockKind::Today, &later).unwrap());
        text.push_str(&format_block(BlockKind::History, &first).unwrap());
        text.push_str(&format_block(BlockKind::History, &later).unwrap());

        let loaded = parse_log(&text).unwrap();
        assert_eq!(loaded.complete_blocks, 4);
        assert_eq!(loaded.history.len(), 1);
        assert_eq!(loaded.history.get_day(0).unwrap(), &later);
        assert_eq!(loaded.today.len(), 1);
        assert_eq!(loaded.today.values().next(), Some(&later));
    }

    #[test]
    fn test_stop_before_start_is_clamped() {
        let mut day = create_test_day(6, 1);
        day.stop = day.start.map(|s| s - TimeDelta::hours(1));
        let text = create_test_log(&[day.clone()], None);

        let loaded = parse_log(&text).unwrap();
        assert_eq!(loaded.history.get_day(0).unwrap().stop, day.start);
    }

    #[test]
    fn test_append_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = StatsLog::new(dir.path());
        assert!(log.load().unwrap().is_none());

        log.append(BlockKind::History, &create_test_day(1, 10)).unwrap();
        log.append(BlockKind::Today, &create_test_day(2, 20)).unwrap();

        let contents = fs::read_to_string(log.path()).unwrap();
        assert!(contents.starts_with("ActivityStats 1\n"));
        assert_eq!(contents.matches("ActivityStats").count(), 1);

        let loaded = StatsLog::new(dir.path()).load().unwrap().unwrap();
        assert_eq!(loaded.history.len(), 1);
        assert_eq!(loaded.today.len(), 1);
    }

    #[test]
    fn test_compact_and_erase() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = StatsLog::new(dir.path());
        for keys in [10, 20, 30] {
            log.append(BlockKind::Today, &create_test_day(1, keys)).unwrap();
        }

        let mut history = HistoryStore::new();
        history.add(create_test_day(1, 30));
        log.compact(&history, Some(&create_test_day(2, 5))).unwrap();

        let loaded = log.load().unwrap().unwrap();
        assert_eq!(loaded.complete_blocks, 2);

        // Appends after a compaction land in the new file.
        log.append(BlockKind::History, &create_test_day(3, 1)).unwrap();
        assert_eq!(log.load().unwrap().unwrap().history.len(), 2);

        log.erase().unwrap();
        let loaded = log.load().unwrap().unwrap();
        assert_eq!(loaded.complete_blocks, 0);
        assert!(loaded.history.is_empty());
    }

    #[test]
    fn test_bad_header_file_and_quarantine() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = StatsLog::new(dir.path());
        fs::write(log.path(), "not a statistics log\n").unwrap();

        assert!(matches!(log.load(), Err(StorageError::BadHeader { .. })));

        let moved = log.quarantine(at(1, 9)).unwrap();
        assert!(moved.exists());
        assert_eq!(
            moved.file_name().unwrap(),
            "activity-stats.log.20260901T091530.corrupt"
        );
        assert!(log.load().unwrap().is_none());

        // A second bad log in the same second keeps the first one.
        fs::write(log.path(), "still not a statistics log\n").unwrap();
        let again = log.quarantine(at(1, 9)).unwrap();
        assert_ne!(again, moved);
        assert_eq!(fs::read_to_string(&moved).unwrap(), "not a statistics log\n");
        assert_eq!(fs::read_to_string(&again).unwrap(), "still not a statistics log\n");
    }

    #[test]
    fn test_append_after_torn_line_starts_new_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = StatsLog::new(dir.path());
        log.append(BlockKind::Today, &create_test_day(1, 7)).unwrap();
        drop(log);

        let mut file = OpenOptions::new().append(true).open(dir.path().join(LOG_FILE_NAME)).unwrap();
        file.write_all(b"D today 2026-09-01\nM 12").unwrap();
        drop(file);

        let mut log = StatsLog::new(dir.path());
        log.append(BlockKind::Today, &create_test_day(1, 42)).unwrap();

        let contents = fs::read_to_string(log.path()).unwrap();
        assert!(contents.contains("M 12\nD today"));
        let loaded = log.load().unwrap().unwrap();
        assert_eq!(loaded.complete_blocks, 2);
        assert_eq!(loaded.discarded_blocks, 1);
        let today = loaded.today.values().next().unwrap();
        assert_eq!(today.misc_counter(MiscCounter::TotalKeystrokes), 42);
    }
}
