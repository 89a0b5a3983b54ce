use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::calendar::DateInterval;
use super::domain::{
    InternshipId, InternshipObligationSummary, IntervalTooShortWarning, MonthlyReportRecord,
    ObligationKind, ObligationPeriod, ObligationRecord, PeriodKey, ReportStatus, ScheduleError,
    VisitRecord, VisitStatus,
};
use super::policy::ObligationPolicy;
use super::repository::{InsertOutcome, ObligationStore, StoreError};
use super::schedule::{generate_schedule, ObligationSchedule};

/// Build the initial persisted record for `period`.
pub fn record_for_period(
    internship_id: &InternshipId,
    period: &ObligationPeriod,
    kind: ObligationKind,
) -> ObligationRecord {
    match kind {
        ObligationKind::Report => ObligationRecord::Report(MonthlyReportRecord {
            internship_id: internship_id.clone(),
            period: period.key(),
            status: ReportStatus::Draft,
            due_at: period.report_due_at,
            window_start: period.report_window_start,
            window_end: period.report_window_end,
            is_partial_month: period.is_partial_month,
            is_final_report: period.is_final_period,
        }),
        ObligationKind::Visit => ObligationRecord::Visit(VisitRecord {
            internship_id: internship_id.clone(),
            period: period.key(),
            status: VisitStatus::Scheduled,
            due_at: period.visit_due_at,
        }),
    }
}

/// Records of `kind` the schedule calls for that are absent from `existing`.
pub fn plan_missing_records(
    internship_id: &InternshipId,
    schedule: &ObligationSchedule,
    kind: ObligationKind,
    existing: &BTreeSet<PeriodKey>,
) -> Vec<ObligationRecord> {
    schedule
        .periods()
        .iter()
        .filter(|period| !existing.contains(&period.key()))
        .map(|period| record_for_period(internship_id, period, kind))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    pub internship_id: InternshipId,
    pub created: Vec<ObligationRecord>,
    /// Inserts that lost a race with a concurrent reconciliation.
    pub already_present: usize,
    pub summary: InternshipObligationSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<IntervalTooShortWarning>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Additive, idempotent materialisation of obligation records.
pub struct ObligationReconciler<S> {
    store: Arc<S>,
    policy: Arc<ObligationPolicy>,
}

impl<S> ObligationReconciler<S>
where
    S: ObligationStore + 'static,
{
    pub fn new(store: Arc<S>, policy: Arc<ObligationPolicy>) -> Self {
        Self { store, policy }
    }

    /// Create every missing record for `interval` and cache the expected totals.
    ///
    /// Existing records are never touched. A failure part way through leaves
    /// the store in a state a later call will complete.
    pub fn reconcile(
        &self,
        internship_id: &InternshipId,
        interval: &DateInterval,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let schedule = generate_schedule(interval, &self.policy)?;
        let mut created = Vec::new();
        let mut already_present = 0;

        for kind in ObligationKind::ordered() {
            let existing = self
                .store
                .list_existing_obligation_keys(internship_id, kind)?;

            for record in plan_missing_records(internship_id, &schedule, kind, &existing) {
                match self.store.insert_if_absent(record.clone()) {
                    Ok(InsertOutcome::Created) => created.push(record),
                    Ok(InsertOutcome::AlreadyExists) | Err(StoreError::Duplicate(_)) => {
                        debug!(key = %record.key(), "obligation record created concurrently");
                        already_present += 1;
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }

        let summary = InternshipObligationSummary {
            total_expected_reports: schedule.total_expected(),
            total_expected_visits: schedule.total_expected(),
            obligations_generated: true,
        };
        self.store.save_summary(internship_id, summary)?;

        info!(
            %internship_id,
            created = created.len(),
            expected = schedule.total_expected(),
            "obligations reconciled"
        );

        Ok(ReconcileOutcome {
            internship_id: internship_id.clone(),
            created,
            already_present,
            summary,
            warning: schedule.warning().copied(),
        })
    }
}
