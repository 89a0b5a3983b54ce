use chrono::NaiveDateTime;
use serde::Serialize;

use super::calendar::{segment_months, DateInterval};
use super::domain::{
    IntervalTooShortWarning, ObligationKind, ObligationPeriod, ScheduleError,
    SubmissionWindowState,
};
use super::policy::ObligationPolicy;

/// Ordered obligation periods for one internship interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObligationSchedule {
    periods: Vec<ObligationPeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<IntervalTooShortWarning>,
}

/// Point-in-time counts for dashboard reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScheduleProjection {
    pub as_of: NaiveDateTime,
    pub total_expected: usize,
    pub reports_due: usize,
    pub visits_due: usize,
}

/// Build the schedule for `interval`. Pure; safe to call on every read.
pub fn generate_schedule(
    interval: &DateInterval,
    policy: &ObligationPolicy,
) -> Result<ObligationSchedule, ScheduleError> {
    let warning = policy.validate_interval(interval);

    let mut periods: Vec<ObligationPeriod> = segment_months(interval, policy.max_segments)?
        .iter()
        .filter_map(|segment| policy.classify(segment))
        .collect();

    periods.sort_by_key(ObligationPeriod::key);
    if let Some(last) = periods.last_mut() {
        last.is_final_period = true;
    }

    Ok(ObligationSchedule { periods, warning })
}

impl ObligationSchedule {
    pub fn periods(&self) -> &[ObligationPeriod] {
        &self.periods
    }

    pub fn warning(&self) -> Option<&IntervalTooShortWarning> {
        self.warning.as_ref()
    }

    /// Same for reports and visits: both derive from the included months.
    pub fn total_expected(&self) -> usize {
        self.periods.len()
    }

    /// Periods of `kind` whose due timestamp is not after `now`.
    ///
    /// `is_due` is the only place this comparison is defined.
    pub fn expected_as_of(&self, kind: ObligationKind, now: NaiveDateTime) -> usize {
        self.periods
            .iter()
            .filter(|period| is_due(period.due_at(kind), now))
            .count()
    }

    pub fn projection(&self, now: NaiveDateTime) -> ScheduleProjection {
        ScheduleProjection {
            as_of: now,
            total_expected: self.total_expected(),
            reports_due: self.expected_as_of(ObligationKind::Report, now),
            visits_due: self.expected_as_of(ObligationKind::Visit, now),
        }
    }

    /// The earliest period whose report window has not closed at `now`.
    pub fn next_report_window(&self, now: NaiveDateTime) -> Option<&ObligationPeriod> {
        self.periods
            .iter()
            .find(|period| period.submission_window_state(now) != SubmissionWindowState::Closed)
    }
}

/// Inclusive: an obligation counts as expected at its own due instant.
pub(crate) fn is_due(due_at: NaiveDateTime, now: NaiveDateTime) -> bool {
    due_at <= now
}
