//! Binary framing of day records for peer exchange.
//!
//! Frame layout, all integers big-endian:
//!
//! ```text
//! [version: u8][kind: u8][body][checksum: 8 bytes]
//! ```
//!
//! The checksum is the first 8 bytes of SHA-256 over everything before it.
//! A day body carries two timestamps, the counter table dimensions it was
//! written with and then the counter values, so a reader built with fewer
//! break kinds or counters skips the extra values and a reader built with
//! more leaves the missing ones at zero.

use crate::error::DecodeError;
use crate::store::{BreakCounter, BreakKind, DailyRecord, MiscCounter};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use sha2::{Digest, Sha256};

/// Current frame version.
pub const FRAME_VERSION: u8 = 1;

const KIND_DAY: u8 = 1;
const KIND_HISTORY: u8 = 2;

const CHECKSUM_LEN: usize = 8;
const HEADER_LEN: usize = 2;

/// Timestamp: `i32` year then month, day, hour, minute, second.
const STAMP_LEN: usize = 4 + 5;

/// Smallest possible encoded day: two stamps and three zero dimensions
/// followed by the mouse time.
const MIN_DAY_LEN: usize = 2 * STAMP_LEN + 3 + 8;

/// A decoded peer message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerMessage {
    Day(DailyRecord),
    History(Vec<DailyRecord>),
}

/// Packs one day record into a frame.
///
/// A `stop` that [`unpack`] would reject is normalised first: dropped when
/// there is no `start`, clamped to `start` when it lies before it or on
/// another day. Any dated record therefore round-trips. An undated record
/// with counters has no day to belong to and is still rejected on unpack.
pub fn pack(record: &DailyRecord) -> Vec<u8> {
    let mut body = Vec::with_capacity(256);
    write_day(&mut body, record);
    frame(KIND_DAY, body)
}

/// Unpacks a frame produced by [`pack`].
pub fn unpack(bytes: &[u8]) -> Result<DailyRecord, DecodeError> {
    match decode_message(bytes)? {
        PeerMessage::Day(record) => Ok(record),
        PeerMessage::History(_) => Err(DecodeError::Malformed("expected a single day")),
    }
}

/// Packs several days into one frame. Empty records are skipped.
pub fn pack_history<'a>(records: impl IntoIterator<Item = &'a DailyRecord>) -> Vec<u8> {
    let records: Vec<_> = records.into_iter().filter(|r| !r.is_empty()).collect();

    let mut body = Vec::with_capacity(4 + records.len() * 256);
    let count = u32::try_from(records.len()).unwrap_or(u32::MAX);
    body.extend_from_slice(&count.to_be_bytes());
    for record in records.into_iter().take(count as usize) {
        write_day(&mut body, record);
    }
    frame(KIND_HISTORY, body)
}

/// Unpacks a frame produced by [`pack_history`].
pub fn unpack_history(bytes: &[u8]) -> Result<Vec<DailyRecord>, DecodeError> {
    match decode_message(bytes)? {
        PeerMessage::History(records) => Ok(records),
        PeerMessage::Day(_) => Err(DecodeError::Malformed("expected a history")),
    }
}

/// Decodes any peer frame.
pub fn decode_message(bytes: &[u8]) -> Result<PeerMessage, DecodeError> {
    let (kind, body) = open_frame(bytes)?;
    let mut reader = Reader::new(body);

    let message = match kind {
        KIND_DAY => PeerMessage::Day(reader.day()?),
        KIND_HISTORY => {
            let count = reader.u32()? as usize;
            if count > reader.remaining() / MIN_DAY_LEN {
                return Err(DecodeError::Malformed("history count exceeds message length"));
            }
            let mut records = Vec::with_capacity(count);
            for _ in 0..count {
                records.push(reader.day()?);
            }
            PeerMessage::History(records)
        }
        _ => return Err(DecodeError::Malformed("unknown message kind")),
    };

    if reader.remaining() > 0 {
        return Err(DecodeError::Malformed("trailing bytes after message"));
    }
    Ok(message)
}

fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha256::digest(data);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

fn frame(kind: u8, body: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + body.len() + CHECKSUM_LEN);
    out.push(FRAME_VERSION);
    out.push(kind);
    out.extend_from_slice(&body);
    let sum = checksum(&out);
    out.extend_from_slice(&sum);
    out
}

fn open_frame(bytes: &[u8]) -> Result<(u8, &[u8]), DecodeError> {
    if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(DecodeError::Truncated { len: bytes.len() });
    }
    if bytes[0] != FRAME_VERSION {
        return Err(DecodeError::UnsupportedVersion(bytes[0]));
    }

    let (data, sum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    if checksum(data).as_slice() != sum {
        tracing::debug!(
            expected = %hex::encode(checksum(data)),
            found = %hex::encode(sum),
            "Peer message checksum mismatch"
        );
        return Err(DecodeError::ChecksumMismatch);
    }
    Ok((data[1], &data[HEADER_LEN..]))
}

fn write_stamp(out: &mut Vec<u8>, at: Option<NaiveDateTime>) {
    match at {
        Some(at) => {
            out.extend_from_slice(&at.year().to_be_bytes());
            // Calendar fields always fit in a byte.
            out.extend(
                [at.month(), at.day(), at.hour(), at.minute(), at.second()].map(|v| v as u8),
            );
        }
        None => out.extend_from_slice(&[0u8; STAMP_LEN]),
    }
}

fn write_day(out: &mut Vec<u8>, record: &DailyRecord) {
    write_stamp(out, record.start);
    write_stamp(out, packed_stop(record));

    out.push(BreakKind::COUNT as u8);
    out.push(BreakCounter::COUNT as u8);
    out.push(MiscCounter::COUNT as u8);
    for value in record.break_counters.iter().flatten() {
        out.extend_from_slice(&value.to_be_bytes());
    }
    for value in &record.misc_counters {
        out.extend_from_slice(&value.to_be_bytes());
    }
    out.extend_from_slice(&record.total_mouse_time_ms.to_be_bytes());
}

fn packed_stop(record: &DailyRecord) -> Option<NaiveDateTime> {
    match (record.start, record.stop) {
        (None, _) => None,
        (Some(start), Some(stop)) if stop < start || stop.date() != start.date() => Some(start),
        (_, stop) => stop,
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let buf = self.buf;
        let end = self.pos + N;
        let bytes = buf
            .get(self.pos..end)
            .ok_or(DecodeError::Truncated { len: buf.len() })?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take::<1>()?[0])
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.take()?))
    }

    fn u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_be_bytes(self.take()?))
    }

    fn stamp(&mut self) -> Result<Option<NaiveDateTime>, DecodeError> {
        let year = i32::from_be_bytes(self.take()?);
        let [month, day, hour, minute, second] = self.take::<5>()?;
        if year == 0 {
            return Ok(None);
        }
        NaiveDate::from_ymd_opt(year, month.into(), day.into())
            .and_then(|d| d.and_hms_opt(hour.into(), minute.into(), second.into()))
            .map(Some)
            .ok_or(DecodeError::InvalidRecord("timestamp out of range"))
    }

    fn day(&mut self) -> Result<DailyRecord, DecodeError> {
        let mut record = DailyRecord {
            start: self.stamp()?,
            stop: self.stamp()?,
            ..Default::default()
        };

        let kinds = usize::from(self.u8()?);
        let counters = usize::from(self.u8()?);
        let misc = usize::from(self.u8()?);

        for k in 0..kinds {
            for c in 0..counters {
                let value = self.u64()?;
                if let Some(slot) = record.break_counters.get_mut(k).and_then(|row| row.get_mut(c)) {
                    *slot = value;
                }
            }
        }
        for m in 0..misc {
            let value = self.u64()?;
            if let Some(slot) = record.misc_counters.get_mut(m) {
                *slot = value;
            }
        }
        record.total_mouse_time_ms = self.u64()?;

        validate(&record)?;
        Ok(record)
    }
}

fn validate(record: &DailyRecord) -> Result<(), DecodeError> {
    match (record.start, record.stop) {
        (None, None) => {
            if record.has_activity() {
                return Err(DecodeError::InvalidRecord("counters without a date"));
            }
        }
        (None, Some(_)) => return Err(DecodeError::InvalidRecord("stop without start")),
        (Some(_), None) => {}
        (Some(start), Some(stop)) => {
            if stop < start {
                return Err(DecodeError::InvalidRecord("stop before start"));
            }
            if stop.date() != start.date() {
                return Err(DecodeError::InvalidRecord("stop on a different day"));
            }
        }
    }
    Ok(())
}
