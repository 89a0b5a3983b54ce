use chrono::{Month, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InternshipId(pub String);

impl fmt::Display for InternshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two obligations every included month produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObligationKind {
    Report,
    Visit,
}

impl ObligationKind {
    pub const fn ordered() -> [Self; 2] {
        [Self::Report, Self::Visit]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Report => "Monthly Report",
            Self::Visit => "Faculty Visit",
        }
    }
}

/// Calendar month identity shared by periods and persisted records.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PeriodKey {
    pub year: i32,
    pub month: u32,
}

impl PeriodKey {
    pub fn label(&self) -> String {
        let name = u8::try_from(self.month)
            .ok()
            .and_then(|month| Month::try_from(month).ok())
            .map(|month| month.name())
            .unwrap_or("Unknown");
        format!("{name} {}", self.year)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionWindowState {
    Upcoming,
    Open,
    Closed,
}

/// One expected report/visit month produced by the schedule generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObligationPeriod {
    pub year: i32,
    pub month: u32,
    pub days_in_range: u32,
    pub report_due_at: NaiveDateTime,
    pub visit_due_at: NaiveDateTime,
    pub report_window_start: NaiveDateTime,
    pub report_window_end: NaiveDateTime,
    pub is_partial_month: bool,
    pub is_final_period: bool,
}

impl ObligationPeriod {
    pub fn key(&self) -> PeriodKey {
        PeriodKey {
            year: self.year,
            month: self.month,
        }
    }

    pub fn label(&self) -> String {
        self.key().label()
    }

    pub fn due_at(&self, kind: ObligationKind) -> NaiveDateTime {
        match kind {
            ObligationKind::Report => self.report_due_at,
            ObligationKind::Visit => self.visit_due_at,
        }
    }

    pub fn submission_window_state(&self, now: NaiveDateTime) -> SubmissionWindowState {
        if now < self.report_window_start {
            SubmissionWindowState::Upcoming
        } else if now <= self.report_window_end {
            SubmissionWindowState::Open
        } else {
            SubmissionWindowState::Closed
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Draft,
    Submitted,
    UnderReview,
    RevisionRequired,
    Approved,
    Rejected,
}

impl ReportStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Submitted => "Submitted",
            Self::UnderReview => "Under Review",
            Self::RevisionRequired => "Revision Required",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitStatus {
    Scheduled,
    Completed,
    Cancelled,
    Missed,
}

impl VisitStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Scheduled => "Scheduled",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::Missed => "Missed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyReportRecord {
    pub internship_id: InternshipId,
    pub period: PeriodKey,
    pub status: ReportStatus,
    pub due_at: NaiveDateTime,
    pub window_start: NaiveDateTime,
    pub window_end: NaiveDateTime,
    pub is_partial_month: bool,
    pub is_final_report: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub internship_id: InternshipId,
    pub period: PeriodKey,
    pub status: VisitStatus,
    pub due_at: NaiveDateTime,
}

/// Persisted obligation, one per (internship, kind, month).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObligationRecord {
    Report(MonthlyReportRecord),
    Visit(VisitRecord),
}

impl ObligationRecord {
    pub fn kind(&self) -> ObligationKind {
        match self {
            Self::Report(_) => ObligationKind::Report,
            Self::Visit(_) => ObligationKind::Visit,
        }
    }

    pub fn internship_id(&self) -> &InternshipId {
        match self {
            Self::Report(record) => &record.internship_id,
            Self::Visit(record) => &record.internship_id,
        }
    }

    pub fn period(&self) -> PeriodKey {
        match self {
            Self::Report(record) => record.period,
            Self::Visit(record) => record.period,
        }
    }

    pub fn due_at(&self) -> NaiveDateTime {
        match self {
            Self::Report(record) => record.due_at,
            Self::Visit(record) => record.due_at,
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self {
            Self::Report(record) => record.status.label(),
            Self::Visit(record) => record.status.label(),
        }
    }

    pub fn key(&self) -> ObligationRecordKey {
        ObligationRecordKey {
            internship_id: self.internship_id().clone(),
            kind: self.kind(),
            period: self.period(),
        }
    }
}

/// Uniqueness key the store must enforce.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObligationRecordKey {
    pub internship_id: InternshipId,
    pub kind: ObligationKind,
    pub period: PeriodKey,
}

impl fmt::Display for ObligationRecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{:?}/{}-{:02}",
            self.internship_id, self.kind, self.period.year, self.period.month
        )
    }
}

/// Counts cached on the internship once reconciliation has run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternshipObligationSummary {
    pub total_expected_reports: usize,
    pub total_expected_visits: usize,
    pub obligations_generated: bool,
}

impl InternshipObligationSummary {
    /// Cached total for `kind`, only when reconciliation has completed.
    pub fn expected_total(&self, kind: ObligationKind) -> Option<usize> {
        if !self.obligations_generated {
            return None;
        }

        Some(match kind {
            ObligationKind::Report => self.total_expected_reports,
            ObligationKind::Visit => self.total_expected_visits,
        })
    }
}

/// Fatal errors raised while computing a schedule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("internship interval is invalid: start {start} is after end {end}")]
    InvalidInterval { start: NaiveDate, end: NaiveDate },
    #[error("internship interval spans {segments} months, exceeding the configured maximum of {max_segments}")]
    RangeTooLong {
        segments: usize,
        max_segments: usize,
    },
}

impl ScheduleError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidInterval { .. } => "invalid_interval",
            Self::RangeTooLong { .. } => "range_too_long",
        }
    }
}

/// Non-fatal signal that an interval is shorter than the program minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("internship lasts {days} days, shorter than the {minimum_weeks} week minimum")]
pub struct IntervalTooShortWarning {
    pub days: i64,
    pub minimum_weeks: u32,
}
