use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::calendar::{days_in_month, first_of_month, last_of_month, next_month, DateInterval, MonthSegment};
use super::domain::{IntervalTooShortWarning, ObligationPeriod};

pub const DEFAULT_MIN_DAYS_FOR_INCLUSION: u32 = 10;
pub const DEFAULT_REPORT_DUE_DAY: u32 = 5;
pub const DEFAULT_REPORT_WINDOW_GRACE_DAYS: u32 = 5;
pub const DEFAULT_MAX_SEGMENTS: usize = 24;
pub const DEFAULT_MIN_INTERVAL_WEEKS: u32 = 16;

/// Immutable policy dials shared by every scheduling operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObligationPolicy {
    /// A month counts only with strictly more in-range days than this.
    pub min_days_for_inclusion: u32,
    pub report_due_day_of_next_month: u32,
    /// Days after the due day that the submission window stays open.
    pub report_window_grace_days: u32,
    pub visit_due_at_month_end: bool,
    pub max_segments: usize,
    pub min_interval_weeks: u32,
}

impl Default for ObligationPolicy {
    fn default() -> Self {
        Self {
            min_days_for_inclusion: DEFAULT_MIN_DAYS_FOR_INCLUSION,
            report_due_day_of_next_month: DEFAULT_REPORT_DUE_DAY,
            report_window_grace_days: DEFAULT_REPORT_WINDOW_GRACE_DAYS,
            visit_due_at_month_end: true,
            max_segments: DEFAULT_MAX_SEGMENTS,
            min_interval_weeks: DEFAULT_MIN_INTERVAL_WEEKS,
        }
    }
}

impl ObligationPolicy {
    /// Turn a month segment into an obligation period, or `None` when the month
    /// has too few in-range days.
    ///
    /// `is_final_period` is left unset; the schedule generator marks the last one.
    pub fn classify(&self, segment: &MonthSegment) -> Option<ObligationPeriod> {
        if segment.days_in_range <= self.min_days_for_inclusion {
            return None;
        }

        let (due_year, due_month) = next_month(segment.year, segment.month);
        let report_due_at = end_of_day(day_in_month(
            due_year,
            due_month,
            self.report_due_day_of_next_month,
        ));
        let report_window_start = start_of_day(first_of_month(due_year, due_month));
        let report_window_end = end_of_day(day_in_month(
            due_year,
            due_month,
            self.report_due_day_of_next_month
                .saturating_add(self.report_window_grace_days),
        ));

        let visit_due_at = if self.visit_due_at_month_end {
            end_of_day(last_of_month(segment.year, segment.month))
        } else {
            report_due_at
        };

        Some(ObligationPeriod {
            year: segment.year,
            month: segment.month,
            days_in_range: segment.days_in_range,
            report_due_at,
            visit_due_at,
            report_window_start,
            report_window_end,
            is_partial_month: segment.is_partial(),
            is_final_period: false,
        })
    }

    /// Flag intervals shorter than the program minimum. Callers decide whether
    /// the warning is fatal.
    pub fn validate_interval(&self, interval: &DateInterval) -> Option<IntervalTooShortWarning> {
        let days = interval.days_inclusive();
        let minimum_days = i64::from(self.min_interval_weeks) * 7;

        (days < minimum_days).then_some(IntervalTooShortWarning {
            days,
            minimum_weeks: self.min_interval_weeks,
        })
    }
}

/// Day `day` of the month, clamped into the month's valid range.
fn day_in_month(year: i32, month: u32, day: u32) -> NaiveDate {
    let day = day.clamp(1, days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_else(|| last_of_month(year, month))
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default())
}
