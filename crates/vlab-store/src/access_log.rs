// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only access log: a writer used by the relay (C4) and a regex-based
//! reader used by the observability API (C6), grounded in the same
//! file-backed JSONL-log shape as the teacher's event log (`event_log.rs`)
//! but line-oriented text rather than JSONL, per spec §6's fixed format.

use std::collections::{HashMap, HashSet};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;

use crate::error::VlabError;

/// One access-log event kind (spec §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessEvent {
    Start { user: String, class: String, serial: String },
    Lock { user: String, class: String, serial: String, remaining: u64 },
    Release { user: String, class: String, serial: String },
    End { user: String, class: String, serial: String },
    NoFreeBoards { user: String, class: String },
    Ping { detail: String },
}

impl AccessEvent {
    fn render(&self) -> String {
        match self {
            Self::Start { user, class, serial } => format!("START: {user}, {class}:{serial}"),
            Self::Lock { user, class, serial, remaining } => {
                format!("LOCK: {user}, {class}:{serial}, {remaining} remaining in set")
            }
            Self::Release { user, class, serial } => format!("RELEASE: {user}, {class}:{serial}"),
            Self::End { user, class, serial } => format!("END: {user}, {class}:{serial}"),
            Self::NoFreeBoards { user, class } => format!("NOFREEBOARDS: {user}, {class}"),
            Self::Ping { detail } => format!("PING: {detail}"),
        }
    }

    /// `info` for everything except `PING`, which is debug-only (spec §6).
    fn level(&self) -> &'static str {
        match self {
            Self::Ping { .. } => "DEBUG",
            _ => "INFO",
        }
    }
}

fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

/// `YYYY-MM-DD HH:MM:SS,mmm` without pulling in a datetime crate — the
/// source format only ever needs wall-clock-at-write, never parsing back
/// into a structured time; reuse the same days-since-epoch arithmetic libc
/// uses under `gmtime` rather than adding a chrono dependency for one call site.
fn format_timestamp(epoch_ms: u128) -> String {
    let secs = (epoch_ms / 1000) as i64;
    let millis = epoch_ms % 1000;
    let days = secs.div_euclid(86_400);
    let mut rem = secs.rem_euclid(86_400);
    let hour = rem / 3600;
    rem %= 3600;
    let minute = rem / 60;
    let second = rem % 60;

    // Civil-from-days (Howard Hinnant's algorithm), proleptic Gregorian.
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let year = if month <= 2 { y + 1 } else { y };

    format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02},{millis:03}")
}

/// Appends lines of the form `<iso-ts> ; <level> ; <source> ; <EVENT>`.
pub struct AccessLogWriter {
    path: PathBuf,
    source: String,
}

impl AccessLogWriter {
    pub fn new(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        Self { path: path.into(), source: source.into() }
    }

    pub fn log(&self, event: &AccessEvent) -> Result<(), VlabError> {
        let line = format!(
            "{} ; {} ; {} ; {}\n",
            format_timestamp(now_ms()),
            event.level(),
            self.source,
            event.render()
        );
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| VlabError::Internal(format!("open access log {}: {e}", self.path.display())))?;
        file.write_all(line.as_bytes())
            .map_err(|e| VlabError::Internal(format!("write access log {}: {e}", self.path.display())))
    }
}

/// A completed (START/END-paired) session, for the hourly/user-total reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedSession {
    pub user: String,
    pub class: String,
    pub serial: String,
}

/// Aggregated access-log statistics (spec §6 / §4.6).
#[derive(Debug, Clone, Default)]
pub struct AccessLogStats {
    pub completed_sessions: Vec<CompletedSession>,
    /// Hour-of-day (0-23) -> count of LOCK events.
    pub lock_counts_by_hour: HashMap<u8, u64>,
    /// user -> total LOCK events.
    pub lock_counts_by_user: HashMap<String, u64>,
    /// user -> total NOFREEBOARDS denials.
    pub denials_by_user: HashMap<String, u64>,
}

struct LogRegexes {
    header: Regex,
    start: Regex,
    lock: Regex,
    release: Regex,
    end: Regex,
    nofreeboards: Regex,
}

impl LogRegexes {
    // Fixed literal patterns, compiled once per parse; a bad regex here is a
    // build-time bug, not a runtime condition.
    #[allow(clippy::unwrap_used)]
    fn new() -> Self {
        Self {
            header: Regex::new(r"^(?P<ts>\S+ \S+) ; (?P<level>\w+) ; (?P<source>\S+) ; (?P<rest>.*)$").unwrap(),
            start: Regex::new(r"^START: (?P<user>[^,]+), (?P<class>[^:]+):(?P<serial>\S+)$").unwrap(),
            lock: Regex::new(
                r"^LOCK: (?P<user>[^,]+), (?P<class>[^:]+):(?P<serial>[^,]+), (?P<remaining>\d+) remaining in set$",
            )
            .unwrap(),
            release: Regex::new(r"^RELEASE: (?P<user>[^,]+), (?P<class>[^:]+):(?P<serial>\S+)$").unwrap(),
            end: Regex::new(r"^END: (?P<user>[^,]+), (?P<class>[^:]+):(?P<serial>\S+)$").unwrap(),
            nofreeboards: Regex::new(r"^NOFREEBOARDS: (?P<user>[^,]+), (?P<class>\S+)$").unwrap(),
        }
    }
}

fn parse_stats(contents: &str) -> AccessLogStats {
    let re = LogRegexes::new();
    let mut stats = AccessLogStats::default();
    // Unmatched STARTs, used to pair with the next END for the same
    // (user, class, serial).
    let mut open_starts: HashSet<(String, String, String)> = HashSet::new();

    for line in contents.lines() {
        let Some(header) = re.header.captures(line) else { continue };
        let ts = &header["ts"];
        let rest = &header["rest"];

        if let Some(c) = re.start.captures(rest) {
            open_starts.insert((c["user"].to_owned(), c["class"].to_owned(), c["serial"].to_owned()));
        } else if let Some(c) = re.lock.captures(rest) {
            let user = c["user"].to_owned();
            *stats.lock_counts_by_user.entry(user).or_insert(0) += 1;
            if let Some(hour) = hour_of_day(ts) {
                *stats.lock_counts_by_hour.entry(hour).or_insert(0) += 1;
            }
        } else if re.release.captures(rest).is_some() {
            // RELEASE does not affect completed-session pairing; only
            // START/END bound a session (spec §6).
        } else if let Some(c) = re.end.captures(rest) {
            let key = (c["user"].to_owned(), c["class"].to_owned(), c["serial"].to_owned());
            if open_starts.remove(&key).is_some() {
                stats.completed_sessions.push(CompletedSession {
                    user: key.0,
                    class: key.1,
                    serial: key.2,
                });
            }
        } else if let Some(c) = re.nofreeboards.captures(rest) {
            let user = c["user"].to_owned();
            *stats.denials_by_user.entry(user).or_insert(0) += 1;
        }
    }

    stats
}

fn hour_of_day(ts: &str) -> Option<u8> {
    // ts is "YYYY-MM-DD HH:MM:SS,mmm"; hour is a fixed-offset substring.
    ts.split(' ').nth(1)?.get(0..2)?.parse().ok()
}

/// Parses and caches [`AccessLogStats`] by the log file's `(mtime, len)`, so
/// repeated observability-API reads don't re-parse an unchanged file.
pub struct AccessLogReader {
    path: PathBuf,
    cached: parking_lot::Mutex<Option<(std::time::SystemTime, u64, std::sync::Arc<AccessLogStats>)>>,
}

impl AccessLogReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), cached: parking_lot::Mutex::new(None) }
    }

    /// Re-parse only if the file's mtime or size changed since the last call.
    pub fn stats(&self) -> Result<std::sync::Arc<AccessLogStats>, VlabError> {
        let meta = std::fs::metadata(&self.path)
            .map_err(|e| VlabError::Internal(format!("stat access log {}: {e}", self.path.display())))?;
        let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let len = meta.len();

        let mut guard = self.cached.lock();
        if let Some((cached_mtime, cached_len, stats)) = guard.as_ref() {
            if *cached_mtime == mtime && *cached_len == len {
                return Ok(std::sync::Arc::clone(stats));
            }
        }

        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| VlabError::Internal(format!("read access log {}: {e}", self.path.display())))?;
        let stats = std::sync::Arc::new(parse_stats(&contents));
        *guard = Some((mtime, len, std::sync::Arc::clone(&stats)));
        Ok(stats)
    }
}

#[cfg(test)]
#[path = "access_log_tests.rs"]
mod tests;
