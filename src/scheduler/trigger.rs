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

//! Cron-like triggers.
//!
//! A [`Trigger`] matches a minute when all of its constraints match it. Day
//! constraints left as `None` match every day. Impossible dates (the 31st of
//! April, the 29th of February in a fixed calendar) are never produced, so a
//! trigger on such a day simply does not fire in that month.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Weekday};

use crate::{
    global::defaults::TRIGGER_SEARCH_HORIZON_DAYS,
    timeframe::{Timeframe, TimeOfDay, yearday_to_month_day},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    minutes: BTreeSet<u32>,
    hours: BTreeSet<u32>,
    monthdays: Option<BTreeSet<u32>>,
    months: Option<BTreeSet<u32>>,
    weekdays: Option<Vec<Weekday>>,
}

impl Trigger {
    /// Fires every hour at each of `minutes`.
    pub fn every_hour(minutes: impl IntoIterator<Item = u32>) -> Self {
        Self {
            minutes: minutes.into_iter().collect(),
            hours: (0..24).collect(),
            monthdays: None,
            months: None,
            weekdays: None,
        }
    }

    /// Fires every day at `time`.
    pub fn every_day(time: TimeOfDay) -> Self {
        Self {
            minutes: BTreeSet::from([time.minute]),
            hours: BTreeSet::from([time.hour]),
            monthdays: None,
            months: None,
            weekdays: None,
        }
    }

    pub fn on_weekdays(mut self, weekdays: &[Weekday]) -> Self {
        self.weekdays = Some(weekdays.to_vec());
        self
    }

    pub fn on_monthday(mut self, day: u32) -> Self {
        self.monthdays = Some(BTreeSet::from([day]));
        self
    }

    pub fn in_month(mut self, month: u32) -> Self {
        self.months = Some(BTreeSet::from([month]));
        self
    }

    fn matches_day(&self, date: NaiveDate) -> bool {
        self.monthdays
            .as_ref()
            .is_none_or(|days| days.contains(&date.day()))
            && self
                .months
                .as_ref()
                .is_none_or(|months| months.contains(&date.month()))
            && self
                .weekdays
                .as_ref()
                .is_none_or(|days| days.contains(&date.weekday()))
    }

    /// The first fire time strictly after `after`, or `None` if the trigger
    /// never fires within the search horizon.
    pub fn next_after(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        let start = after
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))?
            + Duration::minutes(1);

        let mut date = start.date();
        for _ in 0..TRIGGER_SEARCH_HORIZON_DAYS {
            if self.matches_day(date) {
                for hour in &self.hours {
                    for minute in &self.minutes {
                        if let Some(t) = date.and_hms_opt(*hour, *minute, 0) {
                            if t >= start {
                                return Some(t);
                            }
                        }
                    }
                }
            }
            date = date.succ_opt()?;
        }
        None
    }
}

/// Derives the triggers of a timeframe.
pub fn triggers_for(timeframe: &Timeframe) -> Vec<Trigger> {
    match timeframe {
        Timeframe::FiveMinute { .. } => vec![Trigger::every_hour((0..60).step_by(5))],
        Timeframe::Hourly { minutes, .. } => minutes
            .iter()
            .map(|m| Trigger::every_hour([*m]))
            .collect(),
        Timeframe::Daily { times, .. } => times.iter().map(|t| Trigger::every_day(*t)).collect(),
        Timeframe::Weekly {
            times, weekdays, ..
        } => times
            .iter()
            .map(|t| Trigger::every_day(*t).on_weekdays(weekdays))
            .collect(),
        Timeframe::Monthly {
            times, monthdays, ..
        } => monthdays
            .iter()
            .flat_map(|day| {
                times
                    .iter()
                    .map(move |t| Trigger::every_day(*t).on_monthday(*day))
            })
            .collect(),
        Timeframe::Yearly {
            times, yeardays, ..
        } => yeardays
            .iter()
            .filter_map(|yd| yearday_to_month_day(*yd).ok())
            .flat_map(|(month, day)| {
                times
                    .iter()
                    .map(move |t| Trigger::every_day(*t).on_monthday(day).in_month(month))
            })
            .collect(),
    }
}

/// The earliest fire time of any of `triggers` strictly after `after`.
pub fn next_fire(triggers: &[Trigger], after: NaiveDateTime) -> Option<NaiveDateTime> {
    triggers.iter().filter_map(|t| t.next_after(after)).min()
}

/// The next `count` fire times of `timeframe` after `after`, in order.
pub fn upcoming(timeframe: &Timeframe, after: NaiveDateTime, count: usize) -> Vec<NaiveDateTime> {
    let triggers = triggers_for(timeframe);
    let mut times = Vec::with_capacity(count);
    let mut cursor = after;
    while times.len() < count {
        match next_fire(&triggers, cursor) {
            Some(t) => {
                times.push(t);
                cursor = t;
            }
            None => break,
        }
    }
    times
}
