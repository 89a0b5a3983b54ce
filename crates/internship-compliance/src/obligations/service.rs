use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::calendar::DateInterval;
use super::compliance::{
    compute_compliance, is_overdue, AcceptedStatuses, ComplianceMetrics, ComplianceRollup,
};
use super::domain::{
    InternshipId, InternshipObligationSummary, IntervalTooShortWarning, ObligationKind,
    ObligationPeriod, ObligationRecord, PeriodKey, ScheduleError, SubmissionWindowState,
};
use super::policy::ObligationPolicy;
use super::reconcile::{ObligationReconciler, ReconcileError, ReconcileOutcome};
use super::repository::{ObligationStore, StoreError};
use super::schedule::{generate_schedule, ObligationSchedule};

/// Per-internship compliance for both obligation kinds.
#[derive(Debug, Clone, Serialize)]
pub struct InternshipCompliance {
    pub internship_id: InternshipId,
    pub summary: InternshipObligationSummary,
    pub reports: ComplianceMetrics,
    pub visits: ComplianceMetrics,
    /// Unaccepted obligations past their due instant, reports first.
    pub overdue_items: Vec<OverdueObligation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_window: Option<ReportWindowView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<IntervalTooShortWarning>,
}

/// The earliest report submission window that has not closed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportWindowView {
    pub period: PeriodKey,
    pub label: String,
    pub state: SubmissionWindowState,
    pub opens_at: NaiveDateTime,
    pub closes_at: NaiveDateTime,
}

impl ReportWindowView {
    fn for_period(period: &ObligationPeriod, now: NaiveDateTime) -> Self {
        Self {
            period: period.key(),
            label: period.label(),
            state: period.submission_window_state(now),
            opens_at: period.report_window_start,
            closes_at: period.report_window_end,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverdueObligation {
    pub kind: ObligationKind,
    pub kind_label: &'static str,
    pub period: PeriodKey,
    pub period_label: String,
    pub due_at: NaiveDateTime,
    pub status: &'static str,
}

impl OverdueObligation {
    fn from_record(record: &ObligationRecord) -> Self {
        let period = record.period();
        Self {
            kind: record.kind(),
            kind_label: record.kind().label(),
            period,
            period_label: period.label(),
            due_at: record.due_at(),
            status: record.status_label(),
        }
    }
}

/// Raw internship dates as stored upstream; may be invalid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternshipDates {
    pub internship_id: InternshipId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplianceRollupView {
    pub as_of: NaiveDateTime,
    pub reports: ComplianceRollup,
    pub visits: ComplianceRollup,
}

/// Service composing the policy, reconciler, store, and aggregator.
pub struct ObligationService<S> {
    store: Arc<S>,
    policy: Arc<ObligationPolicy>,
    reconciler: ObligationReconciler<S>,
}

impl<S> ObligationService<S>
where
    S: ObligationStore + 'static,
{
    pub fn new(store: Arc<S>, policy: ObligationPolicy) -> Self {
        let policy = Arc::new(policy);
        let reconciler = ObligationReconciler::new(store.clone(), policy.clone());

        Self {
            store,
            policy,
            reconciler,
        }
    }

    pub fn policy(&self) -> &ObligationPolicy {
        &self.policy
    }

    /// Read-only projection; touches no storage.
    pub fn schedule(&self, interval: &DateInterval) -> Result<ObligationSchedule, ScheduleError> {
        generate_schedule(interval, &self.policy)
    }

    pub fn reconcile(
        &self,
        internship_id: &InternshipId,
        interval: &DateInterval,
    ) -> Result<ReconcileOutcome, ObligationServiceError> {
        Ok(self.reconciler.reconcile(internship_id, interval)?)
    }

    pub fn compliance(
        &self,
        internship_id: &InternshipId,
        interval: &DateInterval,
        now: NaiveDateTime,
    ) -> Result<InternshipCompliance, ObligationServiceError> {
        let schedule = generate_schedule(interval, &self.policy)?;
        let summary = self.store.summary(internship_id)?.unwrap_or_default();

        let mut overdue_items = Vec::new();
        let reports = self.metrics_for(
            internship_id,
            &summary,
            &schedule,
            ObligationKind::Report,
            now,
            &mut overdue_items,
        )?;
        let visits = self.metrics_for(
            internship_id,
            &summary,
            &schedule,
            ObligationKind::Visit,
            now,
            &mut overdue_items,
        )?;

        Ok(InternshipCompliance {
            internship_id: internship_id.clone(),
            summary,
            reports,
            visits,
            overdue_items,
            report_window: schedule
                .next_report_window(now)
                .map(|period| ReportWindowView::for_period(period, now)),
            warning: schedule.warning().copied(),
        })
    }

    /// Aggregate many internships. Invalid dates are counted as data-quality
    /// errors; store failures abort the rollup.
    pub fn rollup(
        &self,
        internships: &[InternshipDates],
        now: NaiveDateTime,
    ) -> Result<ComplianceRollupView, ObligationServiceError> {
        let mut reports = Vec::with_capacity(internships.len());
        let mut visits = Vec::with_capacity(internships.len());

        for dates in internships {
            let result = DateInterval::new(dates.start_date, dates.end_date)
                .map_err(ObligationServiceError::from)
                .and_then(|interval| self.compliance(&dates.internship_id, &interval, now));

            match result {
                Ok(compliance) => {
                    reports.push(Ok(compliance.reports));
                    visits.push(Ok(compliance.visits));
                }
                Err(ObligationServiceError::Schedule(err)) => {
                    warn!(internship_id = %dates.internship_id, error = %err, "internship excluded from rollup");
                    reports.push(Err(err.clone()));
                    visits.push(Err(err));
                }
                Err(other) => return Err(other),
            }
        }

        Ok(ComplianceRollupView {
            as_of: now,
            reports: ComplianceRollup::collect(ObligationKind::Report, &reports),
            visits: ComplianceRollup::collect(ObligationKind::Visit, &visits),
        })
    }

    fn metrics_for(
        &self,
        internship_id: &InternshipId,
        summary: &InternshipObligationSummary,
        schedule: &ObligationSchedule,
        kind: ObligationKind,
        now: NaiveDateTime,
        overdue_items: &mut Vec<OverdueObligation>,
    ) -> Result<ComplianceMetrics, ObligationServiceError> {
        let mut records = self.store.records(internship_id, kind)?;
        records.sort_by_key(ObligationRecord::period);
        let accepted = AcceptedStatuses::default_for(kind);

        overdue_items.extend(
            records
                .iter()
                .filter(|record| !accepted.accepts(record) && is_overdue(record.due_at(), now))
                .map(OverdueObligation::from_record),
        );

        Ok(compute_compliance(summary, schedule, &records, accepted, now))
    }
}

/// Error raised by the obligation service.
#[derive(Debug, thiserror::Error)]
pub enum ObligationServiceError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ReconcileError> for ObligationServiceError {
    fn from(value: ReconcileError) -> Self {
        match value {
            ReconcileError::Schedule(err) => Self::Schedule(err),
            ReconcileError::Store(err) => Self::Store(err),
        }
    }
}
