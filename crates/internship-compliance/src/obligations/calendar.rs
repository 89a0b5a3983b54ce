use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::domain::ScheduleError;

/// Inclusive date range covered by an internship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateInterval {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateInterval {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ScheduleError> {
        if start > end {
            return Err(ScheduleError::InvalidInterval { start, end });
        }

        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered, counting both endpoints.
    pub fn days_inclusive(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Number of calendar months touched by the interval.
    pub fn months_touched(&self) -> usize {
        let start = month_index(self.start);
        let end = month_index(self.end);
        (end - start + 1) as usize
    }
}

impl<'de> Deserialize<'de> for DateInterval {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            start: NaiveDate,
            end: NaiveDate,
        }

        let raw = Raw::deserialize(deserializer)?;
        DateInterval::new(raw.start, raw.end).map_err(serde::de::Error::custom)
    }
}

/// One calendar month touched by an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonthSegment {
    pub year: i32,
    pub month: u32,
    pub days_in_range: u32,
}

impl MonthSegment {
    pub fn days_in_month(&self) -> u32 {
        days_in_month(self.year, self.month)
    }

    pub fn is_partial(&self) -> bool {
        self.days_in_range < self.days_in_month()
    }
}

/// Split `interval` into one segment per calendar month it touches.
///
/// Fails with [`ScheduleError::RangeTooLong`] instead of truncating when the
/// interval spans more than `max_segments` months.
pub fn segment_months(
    interval: &DateInterval,
    max_segments: usize,
) -> Result<Vec<MonthSegment>, ScheduleError> {
    let months = interval.months_touched();
    if months > max_segments {
        return Err(ScheduleError::RangeTooLong {
            segments: months,
            max_segments,
        });
    }

    let mut segments = Vec::with_capacity(months);
    let (mut year, mut month) = (interval.start.year(), interval.start.month());

    for _ in 0..months {
        let month_start = first_of_month(year, month);
        let month_end = last_of_month(year, month);
        let from = interval.start.max(month_start);
        let to = interval.end.min(month_end);

        segments.push(MonthSegment {
            year,
            month,
            days_in_range: ((to - from).num_days() + 1) as u32,
        });

        (year, month) = next_month(year, month);
    }

    Ok(segments)
}

pub(crate) fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    last_of_month(year, month).day()
}

pub(crate) fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MAX)
}

pub(crate) fn last_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next) = next_month(year, month);
    first_of_month(next_year, next)
        .pred_opt()
        .unwrap_or(NaiveDate::MAX)
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}
