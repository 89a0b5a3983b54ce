use chrono::{NaiveDate, NaiveDateTime};
use internship_compliance::obligations::{
    generate_schedule, DateInterval, InsertOutcome, InternshipId, InternshipObligationSummary,
    ObligationKind, ObligationPolicy, ObligationRecord, ObligationRecordKey, ObligationService,
    ObligationStore, PeriodKey, ReportStatus, StoreError, SubmissionWindowState,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

fn at(year: i32, month: u32, day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
    date(year, month, day)
        .and_hms_opt(h, m, s)
        .expect("valid timestamp")
}

#[derive(Default)]
struct TableStore {
    rows: Mutex<BTreeMap<ObligationRecordKey, ObligationRecord>>,
    summaries: Mutex<HashMap<InternshipId, InternshipObligationSummary>>,
}

impl ObligationStore for TableStore {
    fn list_existing_obligation_keys(
        &self,
        internship_id: &InternshipId,
        kind: ObligationKind,
    ) -> Result<BTreeSet<PeriodKey>, StoreError> {
        let rows = self.rows.lock().expect("rows mutex poisoned");
        Ok(rows
            .keys()
            .filter(|key| &key.internship_id == internship_id && key.kind == kind)
            .map(|key| key.period)
            .collect())
    }

    fn insert_if_absent(&self, record: ObligationRecord) -> Result<InsertOutcome, StoreError> {
        let mut rows = self.rows.lock().expect("rows mutex poisoned");
        let key = record.key();
        if rows.contains_key(&key) {
            return Err(StoreError::Duplicate(key));
        }
        rows.insert(key, record);
        Ok(InsertOutcome::Created)
    }

    fn save_summary(
        &self,
        internship_id: &InternshipId,
        summary: InternshipObligationSummary,
    ) -> Result<(), StoreError> {
        self.summaries
            .lock()
            .expect("summary mutex poisoned")
            .insert(internship_id.clone(), summary);
        Ok(())
    }

    fn summary(
        &self,
        internship_id: &InternshipId,
    ) -> Result<Option<InternshipObligationSummary>, StoreError> {
        Ok(self
            .summaries
            .lock()
            .expect("summary mutex poisoned")
            .get(internship_id)
            .copied())
    }

    fn records(
        &self,
        internship_id: &InternshipId,
        kind: ObligationKind,
    ) -> Result<Vec<ObligationRecord>, StoreError> {
        let rows = self.rows.lock().expect("rows mutex poisoned");
        Ok(rows
            .values()
            .filter(|record| record.internship_id() == internship_id && record.kind() == kind)
            .cloned()
            .collect())
    }
}

impl TableStore {
    fn submit_report(&self, internship_id: &InternshipId, period: PeriodKey) {
        let mut rows = self.rows.lock().expect("rows mutex poisoned");
        let key = ObligationRecordKey {
            internship_id: internship_id.clone(),
            kind: ObligationKind::Report,
            period,
        };
        if let Some(ObligationRecord::Report(report)) = rows.get_mut(&key) {
            report.status = ReportStatus::Submitted;
        }
    }
}

#[test]
fn internship_lifecycle_from_activation_to_dashboard() {
    let store = Arc::new(TableStore::default());
    let service = ObligationService::new(store.clone(), ObligationPolicy::default());
    let internship = InternshipId("int-42".to_string());
    let interval = DateInterval::new(date(2025, 1, 15), date(2025, 5, 15)).expect("valid");

    let activation = service
        .reconcile(&internship, &interval)
        .expect("activation reconciles");
    assert_eq!(activation.summary.total_expected_reports, 5);
    assert_eq!(activation.summary.total_expected_visits, 5);

    store.submit_report(&internship, PeriodKey { year: 2025, month: 1 });
    store.submit_report(&internship, PeriodKey { year: 2025, month: 2 });
    store.submit_report(&internship, PeriodKey { year: 2025, month: 3 });

    let dashboard = service
        .compliance(&internship, &interval, at(2025, 4, 20, 10, 0, 0))
        .expect("compliance");
    assert_eq!(dashboard.reports.expected_as_of_now, 3);
    assert_eq!(dashboard.reports.submitted_or_approved, 3);
    assert_eq!(dashboard.reports.completion_percentage, 100.0);
    assert_eq!(dashboard.visits.expected_as_of_now, 3);
    assert_eq!(dashboard.visits.completion_percentage, 0.0);
    assert_eq!(dashboard.visits.overdue, 3);

    let repeat = service
        .reconcile(&internship, &interval)
        .expect("re-activation is safe");
    assert!(repeat.created.is_empty());
    assert_eq!(repeat.already_present, 0);
}

#[test]
fn submission_window_tracks_following_month() {
    let interval = DateInterval::new(date(2025, 1, 15), date(2025, 5, 15)).expect("valid");
    let schedule = generate_schedule(&interval, &ObligationPolicy::default()).expect("schedule");
    let january = &schedule.periods()[0];

    assert_eq!(
        january.submission_window_state(at(2025, 1, 31, 23, 0, 0)),
        SubmissionWindowState::Upcoming
    );
    assert_eq!(
        january.submission_window_state(at(2025, 2, 1, 0, 0, 0)),
        SubmissionWindowState::Open
    );
    assert_eq!(
        january.submission_window_state(at(2025, 2, 10, 23, 59, 59)),
        SubmissionWindowState::Open
    );
    assert_eq!(
        january.submission_window_state(at(2025, 2, 11, 0, 0, 0)),
        SubmissionWindowState::Closed
    );
}

#[test]
fn concurrent_reconciliations_produce_one_record_set() {
    let store = Arc::new(TableStore::default());
    let service = Arc::new(ObligationService::new(
        store.clone(),
        ObligationPolicy::default(),
    ));
    let interval = DateInterval::new(date(2025, 1, 15), date(2025, 5, 15)).expect("valid");
    let internship = InternshipId("int-race".to_string());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = service.clone();
            let internship = internship.clone();
            std::thread::spawn(move || service.reconcile(&internship, &interval))
        })
        .collect();

    let created: usize = handles
        .into_iter()
        .map(|handle| {
            handle
                .join()
                .expect("thread completes")
                .expect("reconciliation succeeds")
                .created
                .len()
        })
        .sum();

    assert_eq!(created, 10);
    assert_eq!(store.rows.lock().expect("rows mutex").len(), 10);
}
