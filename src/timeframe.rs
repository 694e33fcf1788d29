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

use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::{Datelike, NaiveDate, Weekday};

use crate::{
    error::{BackupError, Result},
    global::defaults::YEARDAY_REFERENCE_YEAR,
};

/// Names of all timeframe types, in the order they are usually listed.
pub const TIMEFRAME_NAMES: [&str; 6] = ["5minute", "hourly", "daily", "weekly", "monthly", "yearly"];

/// A time in the day, with minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 {
            return Err(BackupError::InvalidTimeframe(format!(
                "hour {hour} not within range [0, 23]"
            )));
        }
        if minute > 59 {
            return Err(BackupError::InvalidTimeframe(format!(
                "minute {minute} not within range [0, 59]"
            )));
        }
        Ok(Self { hour, minute })
    }
}

/// Parses an `hh:mm` time specification.
impl FromStr for TimeOfDay {
    type Err = BackupError;

    fn from_str(s: &str) -> Result<Self> {
        let malformed =
            || BackupError::InvalidTimeframe(format!("expected time format 'hh:mm', got '{s}'"));

        let (hour, minute) = s.split_once(':').ok_or_else(malformed)?;
        if hour.len() != 2 || minute.len() != 2 {
            return Err(malformed());
        }
        let hour = hour.parse::<u32>().map_err(|_| malformed())?;
        let minute = minute.parse::<u32>().map_err(|_| malformed())?;

        TimeOfDay::new(hour, minute)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// A recurrence policy paired with the number of backups to keep for it.
///
/// Values are built through the validating constructors and never mutated
/// afterwards. The timeframe name is always derived from the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timeframe {
    /// Every 5 minutes.
    FiveMinute { keep: usize },
    /// Every hour at each of `minutes`.
    Hourly { keep: usize, minutes: BTreeSet<u32> },
    /// Every day at each of `times`.
    Daily { keep: usize, times: Vec<TimeOfDay> },
    /// At each of `times` on each of `weekdays`.
    Weekly {
        keep: usize,
        times: Vec<TimeOfDay>,
        weekdays: Vec<Weekday>,
    },
    /// At each of `times` on each of `monthdays`. Days that a month does not
    /// have are skipped for that month.
    Monthly {
        keep: usize,
        times: Vec<TimeOfDay>,
        monthdays: BTreeSet<u32>,
    },
    /// At each of `times` on each of `yeardays`. Days of the year are mapped
    /// onto a fixed non-leap calendar (see [`yearday_to_month_day`]).
    Yearly {
        keep: usize,
        times: Vec<TimeOfDay>,
        yeardays: BTreeSet<u32>,
    },
}

impl Timeframe {
    pub fn five_minute(keep: usize) -> Self {
        Timeframe::FiveMinute { keep }
    }

    pub fn hourly(keep: usize, minutes: impl IntoIterator<Item = u32>) -> Result<Self> {
        let minutes: BTreeSet<u32> = minutes.into_iter().collect();
        require_non_empty("hourly", "minutes", minutes.is_empty())?;
        if let Some(m) = minutes.iter().find(|m| **m > 59) {
            return Err(BackupError::InvalidTimeframe(format!(
                "minute {m} not within range [0, 59]"
            )));
        }
        Ok(Timeframe::Hourly { keep, minutes })
    }

    pub fn daily(keep: usize, times: impl IntoIterator<Item = TimeOfDay>) -> Result<Self> {
        let times = dedup_times(times);
        require_non_empty("daily", "times", times.is_empty())?;
        Ok(Timeframe::Daily { keep, times })
    }

    pub fn weekly(
        keep: usize,
        times: impl IntoIterator<Item = TimeOfDay>,
        weekdays: impl IntoIterator<Item = Weekday>,
    ) -> Result<Self> {
        let times = dedup_times(times);
        require_non_empty("weekly", "times", times.is_empty())?;

        let mut days: Vec<Weekday> = Vec::new();
        for day in weekdays {
            if !days.contains(&day) {
                days.push(day);
            }
        }
        days.sort_by_key(|d| d.num_days_from_monday());
        require_non_empty("weekly", "weekdays", days.is_empty())?;

        Ok(Timeframe::Weekly {
            keep,
            times,
            weekdays: days,
        })
    }

    pub fn monthly(
        keep: usize,
        times: impl IntoIterator<Item = TimeOfDay>,
        monthdays: impl IntoIterator<Item = u32>,
    ) -> Result<Self> {
        let times = dedup_times(times);
        require_non_empty("monthly", "times", times.is_empty())?;

        let monthdays: BTreeSet<u32> = monthdays.into_iter().collect();
        require_non_empty("monthly", "monthdays", monthdays.is_empty())?;
        if let Some(d) = monthdays.iter().find(|d| !(1..=31).contains(*d)) {
            return Err(BackupError::InvalidTimeframe(format!(
                "day of month {d} not within range [1, 31]"
            )));
        }

        Ok(Timeframe::Monthly {
            keep,
            times,
            monthdays,
        })
    }

    pub fn yearly(
        keep: usize,
        times: impl IntoIterator<Item = TimeOfDay>,
        yeardays: impl IntoIterator<Item = u32>,
    ) -> Result<Self> {
        let times = dedup_times(times);
        require_non_empty("yearly", "times", times.is_empty())?;

        let yeardays: BTreeSet<u32> = yeardays.into_iter().collect();
        require_non_empty("yearly", "yeardays", yeardays.is_empty())?;
        if let Some(d) = yeardays.iter().find(|d| !(1..=365).contains(*d)) {
            return Err(BackupError::InvalidTimeframe(format!(
                "day of year {d} not within range [1, 365]"
            )));
        }

        Ok(Timeframe::Yearly {
            keep,
            times,
            yeardays,
        })
    }

    /// The type tag of this timeframe, as used in configuration files and
    /// backup basenames.
    pub fn name(&self) -> &'static str {
        match self {
            Timeframe::FiveMinute { .. } => "5minute",
            Timeframe::Hourly { .. } => "hourly",
            Timeframe::Daily { .. } => "daily",
            Timeframe::Weekly { .. } => "weekly",
            Timeframe::Monthly { .. } => "monthly",
            Timeframe::Yearly { .. } => "yearly",
        }
    }

    /// Maximum number of backups to keep for this timeframe.
    pub fn keep(&self) -> usize {
        match self {
            Timeframe::FiveMinute { keep }
            | Timeframe::Hourly { keep, .. }
            | Timeframe::Daily { keep, .. }
            | Timeframe::Weekly { keep, .. }
            | Timeframe::Monthly { keep, .. }
            | Timeframe::Yearly { keep, .. } => *keep,
        }
    }

    /// Times of the day this timeframe fires at. Empty for the sub-daily
    /// timeframes.
    pub fn times(&self) -> &[TimeOfDay] {
        match self {
            Timeframe::FiveMinute { .. } | Timeframe::Hourly { .. } => &[],
            Timeframe::Daily { times, .. }
            | Timeframe::Weekly { times, .. }
            | Timeframe::Monthly { times, .. }
            | Timeframe::Yearly { times, .. } => times,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn require_non_empty(timeframe: &str, field: &str, empty: bool) -> Result<()> {
    if empty {
        return Err(BackupError::InvalidTimeframe(format!(
            "{timeframe} timeframe requires at least one entry in '{field}'"
        )));
    }
    Ok(())
}

fn dedup_times(times: impl IntoIterator<Item = TimeOfDay>) -> Vec<TimeOfDay> {
    let set: BTreeSet<TimeOfDay> = times.into_iter().collect();
    set.into_iter().collect()
}

/// Returns true if `name` is one of the six timeframe type tags.
pub fn is_timeframe_name(name: &str) -> bool {
    TIMEFRAME_NAMES.contains(&name)
}

/// Parses a full lowercase weekday name (`monday` .. `sunday`).
pub fn parse_weekday(s: &str) -> Result<Weekday> {
    match s {
        "monday" => Ok(Weekday::Mon),
        "tuesday" => Ok(Weekday::Tue),
        "wednesday" => Ok(Weekday::Wed),
        "thursday" => Ok(Weekday::Thu),
        "friday" => Ok(Weekday::Fri),
        "saturday" => Ok(Weekday::Sat),
        "sunday" => Ok(Weekday::Sun),
        _ => Err(BackupError::InvalidTimeframe(format!(
            "'{s}' is not a weekday"
        ))),
    }
}

/// Maps a day of the year onto a (month, day) pair of the fixed non-leap
/// reference calendar. Day 60 is always the 1st of March, whether or not the
/// current year is a leap year.
pub fn yearday_to_month_day(yearday: u32) -> Result<(u32, u32)> {
    if !(1..=365).contains(&yearday) {
        return Err(BackupError::InvalidTimeframe(format!(
            "day of year {yearday} not within range [1, 365]"
        )));
    }
    let date = NaiveDate::from_yo_opt(YEARDAY_REFERENCE_YEAR, yearday).ok_or_else(|| {
        BackupError::InvalidTimeframe(format!("day of year {yearday} does not exist"))
    })?;
    Ok((date.month(), date.day()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_time_of_day_parse() -> Result<()> {
        assert_eq!("23:59".parse::<TimeOfDay>()?, TimeOfDay::new(23, 59)?);
        assert_eq!("00:00".parse::<TimeOfDay>()?, TimeOfDay::new(0, 0)?);
        assert_eq!("07:05".parse::<TimeOfDay>()?.to_string(), "07:05");

        assert!("24:00".parse::<TimeOfDay>().is_err());
        assert!("12:60".parse::<TimeOfDay>().is_err());
        assert!("7:05".parse::<TimeOfDay>().is_err());
        assert!("0705".parse::<TimeOfDay>().is_err());
        assert!("ab:cd".parse::<TimeOfDay>().is_err());
        Ok(())
    }

    #[test]
    fn test_names_follow_variant() -> Result<()> {
        let t = TimeOfDay::new(10, 0)?;
        assert_eq!(Timeframe::five_minute(1).name(), "5minute");
        assert_eq!(Timeframe::hourly(1, [0])?.name(), "hourly");
        assert_eq!(Timeframe::daily(1, [t])?.name(), "daily");
        assert_eq!(Timeframe::weekly(1, [t], [Weekday::Mon])?.name(), "weekly");
        assert_eq!(Timeframe::monthly(1, [t], [1])?.name(), "monthly");
        assert_eq!(Timeframe::yearly(1, [t], [1])?.name(), "yearly");
        for name in TIMEFRAME_NAMES {
            assert!(is_timeframe_name(name));
        }
        assert!(!is_timeframe_name("minutely"));
        Ok(())
    }

    #[test]
    fn test_field_validation() -> Result<()> {
        let t = TimeOfDay::new(10, 0)?;
        assert!(Timeframe::hourly(1, [60]).is_err());
        assert!(Timeframe::hourly(1, []).is_err());
        assert!(Timeframe::daily(1, []).is_err());
        assert!(Timeframe::weekly(1, [t], []).is_err());
        assert!(Timeframe::monthly(1, [t], [0]).is_err());
        assert!(Timeframe::monthly(1, [t], [32]).is_err());
        assert!(Timeframe::yearly(1, [t], [366]).is_err());
        assert!(Timeframe::yearly(0, [t], [365]).is_ok());
        Ok(())
    }

    #[test]
    fn test_weekdays_are_deduplicated_and_ordered() -> Result<()> {
        let t = TimeOfDay::new(10, 0)?;
        let tf = Timeframe::weekly(4, [t, t], [Weekday::Fri, Weekday::Mon, Weekday::Fri])?;
        match tf {
            Timeframe::Weekly {
                times, weekdays, ..
            } => {
                assert_eq!(times, vec![t]);
                assert_eq!(weekdays, vec![Weekday::Mon, Weekday::Fri]);
            }
            _ => panic!("expected a weekly timeframe"),
        }
        Ok(())
    }

    #[test]
    fn test_parse_weekday() {
        assert_eq!(parse_weekday("monday").unwrap(), Weekday::Mon);
        assert_eq!(parse_weekday("sunday").unwrap(), Weekday::Sun);
        assert!(parse_weekday("Mon").is_err());
    }

    #[test]
    fn test_yearday_mapping_uses_non_leap_calendar() -> Result<()> {
        assert_eq!(yearday_to_month_day(1)?, (1, 1));
        assert_eq!(yearday_to_month_day(31)?, (1, 31));
        assert_eq!(yearday_to_month_day(32)?, (2, 1));
        assert_eq!(yearday_to_month_day(59)?, (2, 28));
        assert_eq!(yearday_to_month_day(60)?, (3, 1));
        assert_eq!(yearday_to_month_day(365)?, (12, 31));
        assert!(yearday_to_month_day(0).is_err());
        assert!(yearday_to_month_day(366).is_err());
        Ok(())
    }
}
