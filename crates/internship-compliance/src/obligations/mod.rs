//! Compliance obligation scheduling for internships.
//!
//! An internship interval is split into calendar months, each month that clears the
//! inclusion threshold becomes one obligation period (one monthly report plus one
//! faculty visit), and the resulting schedule is either projected for dashboards or
//! reconciled into persisted obligation records.

pub mod calendar;
pub mod compliance;
pub mod domain;
pub mod policy;
pub mod reconcile;
pub mod repository;
pub mod router;
pub mod schedule;
pub mod service;

#[cfg(test)]
mod tests;

pub use calendar::{segment_months, DateInterval, MonthSegment};
pub use compliance::{
    completion_percentage, compute_compliance, AcceptedStatuses, ComplianceMetrics,
    ComplianceRollup,
};
pub use domain::{
    InternshipId, InternshipObligationSummary, IntervalTooShortWarning, MonthlyReportRecord,
    ObligationKind, ObligationPeriod, ObligationRecord, ObligationRecordKey, PeriodKey,
    ReportStatus, ScheduleError, SubmissionWindowState, VisitRecord, VisitStatus,
};
pub use policy::ObligationPolicy;
pub use reconcile::{
    plan_missing_records, record_for_period, ObligationReconciler, ReconcileError,
    ReconcileOutcome,
};
pub use repository::{InsertOutcome, ObligationStore, StoreError};
pub use router::obligation_router;
pub use schedule::{generate_schedule, ObligationSchedule, ScheduleProjection};
pub use service::{
    ComplianceRollupView, InternshipCompliance, InternshipDates, ObligationService,
    ObligationServiceError, OverdueObligation, ReportWindowView,
};
