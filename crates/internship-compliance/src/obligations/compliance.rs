use chrono::NaiveDateTime;
use serde::Serialize;

use super::domain::{
    InternshipObligationSummary, ObligationKind, ObligationRecord, ReportStatus, ScheduleError,
    VisitStatus,
};
use super::schedule::ObligationSchedule;

pub const DEFAULT_ACCEPTED_REPORT_STATUSES: [ReportStatus; 3] = [
    ReportStatus::Submitted,
    ReportStatus::UnderReview,
    ReportStatus::Approved,
];

pub const DEFAULT_ACCEPTED_VISIT_STATUSES: [VisitStatus; 1] = [VisitStatus::Completed];

/// Statuses that count toward compliance. The obligation kind follows from
/// the variant.
#[derive(Debug, Clone, Copy)]
pub enum AcceptedStatuses<'a> {
    Reports(&'a [ReportStatus]),
    Visits(&'a [VisitStatus]),
}

impl AcceptedStatuses<'static> {
    pub fn default_for(kind: ObligationKind) -> Self {
        match kind {
            ObligationKind::Report => Self::Reports(&DEFAULT_ACCEPTED_REPORT_STATUSES),
            ObligationKind::Visit => Self::Visits(&DEFAULT_ACCEPTED_VISIT_STATUSES),
        }
    }
}

impl AcceptedStatuses<'_> {
    pub fn kind(&self) -> ObligationKind {
        match self {
            Self::Reports(_) => ObligationKind::Report,
            Self::Visits(_) => ObligationKind::Visit,
        }
    }

    pub fn accepts(&self, record: &ObligationRecord) -> bool {
        match (self, record) {
            (Self::Reports(statuses), ObligationRecord::Report(report)) => {
                statuses.contains(&report.status)
            }
            (Self::Visits(statuses), ObligationRecord::Visit(visit)) => {
                statuses.contains(&visit.status)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceMetrics {
    pub kind: ObligationKind,
    pub expected_total: usize,
    pub expected_as_of_now: usize,
    pub submitted_or_approved: usize,
    pub overdue: usize,
    pub completion_percentage: f64,
}

/// Compliance for one internship and obligation kind.
///
/// The cached summary total wins once reconciliation has run; otherwise the
/// live schedule supplies it. Records of other kinds are ignored.
pub fn compute_compliance(
    summary: &InternshipObligationSummary,
    schedule: &ObligationSchedule,
    records: &[ObligationRecord],
    accepted: AcceptedStatuses<'_>,
    now: NaiveDateTime,
) -> ComplianceMetrics {
    let kind = accepted.kind();
    let expected_total = summary
        .expected_total(kind)
        .unwrap_or_else(|| schedule.total_expected());
    let expected_as_of_now = schedule.expected_as_of(kind, now).min(expected_total);

    let mut submitted_or_approved = 0;
    let mut overdue = 0;
    for record in records.iter().filter(|record| record.kind() == kind) {
        if accepted.accepts(record) {
            submitted_or_approved += 1;
        } else if is_overdue(record.due_at(), now) {
            overdue += 1;
        }
    }

    ComplianceMetrics {
        kind,
        expected_total,
        expected_as_of_now,
        submitted_or_approved,
        overdue,
        completion_percentage: completion_percentage(submitted_or_approved, expected_as_of_now),
    }
}

/// An unaccepted obligation is overdue only once its due instant has passed.
pub(crate) fn is_overdue(due_at: NaiveDateTime, now: NaiveDateTime) -> bool {
    due_at < now
}

/// `submitted / max(expected, 1) * 100`, clamped to `[0, 100]`.
pub fn completion_percentage(submitted: usize, expected: usize) -> f64 {
    let ratio = submitted as f64 / expected.max(1) as f64;
    (ratio * 100.0).clamp(0.0, 100.0)
}

/// Institution or state level aggregate over many internships.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceRollup {
    pub kind: ObligationKind,
    pub internships: usize,
    /// Internships whose dates could not be scheduled; kept out of the totals.
    pub data_quality_errors: usize,
    pub expected_total: usize,
    pub expected_as_of_now: usize,
    pub submitted_or_approved: usize,
    pub overdue: usize,
    pub completion_percentage: f64,
}

impl ComplianceRollup {
    pub fn collect<'a, I>(kind: ObligationKind, entries: I) -> Self
    where
        I: IntoIterator<Item = &'a Result<ComplianceMetrics, ScheduleError>>,
    {
        let mut rollup = Self {
            kind,
            internships: 0,
            data_quality_errors: 0,
            expected_total: 0,
            expected_as_of_now: 0,
            submitted_or_approved: 0,
            overdue: 0,
            completion_percentage: 0.0,
        };

        for entry in entries {
            match entry {
                Ok(metrics) if metrics.kind == kind => {
                    rollup.internships += 1;
                    rollup.expected_total += metrics.expected_total;
                    rollup.expected_as_of_now += metrics.expected_as_of_now;
                    // over-submission on one internship must not mask gaps on another
                    rollup.submitted_or_approved += metrics
                        .submitted_or_approved
                        .min(metrics.expected_as_of_now);
                    rollup.overdue += metrics.overdue;
                }
                Ok(_) => {}
                Err(_) => {
                    rollup.internships += 1;
                    rollup.data_quality_errors += 1;
                }
            }
        }

        rollup.completion_percentage =
            completion_percentage(rollup.submitted_or_approved, rollup.expected_as_of_now);
        rollup
    }
}
