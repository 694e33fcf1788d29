// yaesm is a scheduled incremental backup tool
// Copyright (C) 2026  The yaesm authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Backup instances are identified on disk by their basename only:
//!
//! `yaesm-<backup>-<timeframe>.<YYYY>_<MM>_<DD>_<HH>:<mm>`

use std::{fmt, str::FromStr, sync::LazyLock};

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;

use crate::{
    error::{BackupError, Result},
    global::defaults::{BASENAME_PREFIX, TIMESTAMP_FORMAT},
};

static BASENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^yaesm-(.+)-(5minute|hourly|daily|weekly|monthly|yearly)\.(\d{4})_(\d{2})_(\d{2})_(\d{2}):(\d{2})$",
    )
    .expect("valid basename regex")
});

static BACKUP_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][-_:@A-Za-z0-9]*$").expect("valid backup name regex"));

/// Returns true if `name` is a valid backup name.
pub fn is_valid_backup_name(name: &str) -> bool {
    BACKUP_NAME_RE.is_match(name)
}

/// The decoded identity of a backup instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupBasename {
    pub backup: String,
    pub timeframe: String,
    pub timestamp: NaiveDateTime,
}

impl BackupBasename {
    /// Builds a basename, truncating `timestamp` to the minute.
    pub fn new(backup: &str, timeframe: &str, timestamp: NaiveDateTime) -> Self {
        let timestamp = timestamp
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(timestamp);
        Self {
            backup: backup.to_string(),
            timeframe: timeframe.to_string(),
            timestamp,
        }
    }
}

/// Encodes the basename.
impl fmt::Display for BackupBasename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}.{}",
            BASENAME_PREFIX,
            self.backup,
            self.timeframe,
            self.timestamp.format(TIMESTAMP_FORMAT)
        )
    }
}

/// Decodes a basename. Fails with [`BackupError::NamingFormat`] on anything
/// that `Display` could not have produced.
impl FromStr for BackupBasename {
    type Err = BackupError;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || BackupError::NamingFormat(s.to_string());

        let caps = BASENAME_RE.captures(s).ok_or_else(bad)?;

        let backup = &caps[1];
        if !is_valid_backup_name(backup) {
            return Err(bad());
        }

        let field = |i: usize| caps[i].parse::<u32>().map_err(|_| bad());
        let year = caps[3].parse::<i32>().map_err(|_| bad())?;
        let (month, day, hour, minute) = (field(4)?, field(5)?, field(6)?, field(7)?);
        let timestamp = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .ok_or_else(bad)?;

        Ok(Self {
            backup: backup.to_string(),
            timeframe: caps[2].to_string(),
            timestamp,
        })
    }
}

/// Encodes `(backup, timeframe, timestamp)` into a basename.
pub fn encode(backup: &str, timeframe: &str, timestamp: NaiveDateTime) -> String {
    BackupBasename::new(backup, timeframe, timestamp).to_string()
}

/// Decodes a basename into its parts.
pub fn decode(basename: &str) -> Result<BackupBasename> {
    basename.parse()
}
