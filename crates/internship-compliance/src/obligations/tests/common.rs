use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::obligations::{
    obligation_router, DateInterval, InsertOutcome, InternshipId, InternshipObligationSummary,
    ObligationKind, ObligationPolicy, ObligationRecord, ObligationRecordKey, ObligationService,
    ObligationStore, PeriodKey, ReportStatus, StoreError, VisitStatus,
};

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn at(year: i32, month: u32, day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
    date(year, month, day)
        .and_hms_opt(h, m, s)
        .expect("valid timestamp")
}

pub(super) fn end_of(year: i32, month: u32, day: u32) -> NaiveDateTime {
    at(year, month, day, 23, 59, 59)
}

/// Jan 15 – May 15, 2025: five included months.
pub(super) fn spring_interval() -> DateInterval {
    DateInterval::new(date(2025, 1, 15), date(2025, 5, 15)).expect("valid interval")
}

pub(super) fn internship() -> InternshipId {
    InternshipId("int-2025-001".to_string())
}

pub(super) fn key(year: i32, month: u32) -> PeriodKey {
    PeriodKey { year, month }
}

#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    pub(super) records: Arc<Mutex<BTreeMap<ObligationRecordKey, ObligationRecord>>>,
    pub(super) summaries: Arc<Mutex<HashMap<InternshipId, InternshipObligationSummary>>>,
}

impl MemoryStore {
    pub(super) fn all_records(&self) -> Vec<ObligationRecord> {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .values()
            .cloned()
            .collect()
    }

    pub(super) fn put(&self, record: ObligationRecord) {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .insert(record.key(), record);
    }

    pub(super) fn set_report_status(&self, id: &InternshipId, period: PeriodKey, status: ReportStatus) {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        for record in guard.values_mut() {
            if let ObligationRecord::Report(report) = record {
                if &report.internship_id == id && report.period == period {
                    report.status = status;
                }
            }
        }
    }

    pub(super) fn set_visit_status(&self, id: &InternshipId, period: PeriodKey, status: VisitStatus) {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        for record in guard.values_mut() {
            if let ObligationRecord::Visit(visit) = record {
                if &visit.internship_id == id && visit.period == period {
                    visit.status = status;
                }
            }
        }
    }
}

impl ObligationStore for MemoryStore {
    fn list_existing_obligation_keys(
        &self,
        internship_id: &InternshipId,
        kind: ObligationKind,
    ) -> Result<BTreeSet<PeriodKey>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .keys()
            .filter(|key| &key.internship_id == internship_id && key.kind == kind)
            .map(|key| key.period)
            .collect())
    }

    fn insert_if_absent(&self, record: ObligationRecord) -> Result<InsertOutcome, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let key = record.key();
        if guard.contains_key(&key) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        guard.insert(key, record);
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
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .iter()
            .filter(|(key, _)| &key.internship_id == internship_id && key.kind == kind)
            .map(|(_, record)| record.clone())
            .collect())
    }
}

/// Store whose key listing is stale: it reports nothing while a concurrent
/// writer has already inserted every record, so inserts hit the unique index.
#[derive(Default)]
pub(super) struct RacingStore {
    pub(super) inner: MemoryStore,
}

impl ObligationStore for RacingStore {
    fn list_existing_obligation_keys(
        &self,
        _internship_id: &InternshipId,
        _kind: ObligationKind,
    ) -> Result<BTreeSet<PeriodKey>, StoreError> {
        Ok(BTreeSet::new())
    }

    fn insert_if_absent(&self, record: ObligationRecord) -> Result<InsertOutcome, StoreError> {
        let key = record.key();
        match self.inner.insert_if_absent(record)? {
            InsertOutcome::Created => Ok(InsertOutcome::Created),
            InsertOutcome::AlreadyExists => Err(StoreError::Duplicate(key)),
        }
    }

    fn save_summary(
        &self,
        internship_id: &InternshipId,
        summary: InternshipObligationSummary,
    ) -> Result<(), StoreError> {
        self.inner.save_summary(internship_id, summary)
    }

    fn summary(
        &self,
        internship_id: &InternshipId,
    ) -> Result<Option<InternshipObligationSummary>, StoreError> {
        self.inner.summary(internship_id)
    }

    fn records(
        &self,
        internship_id: &InternshipId,
        kind: ObligationKind,
    ) -> Result<Vec<ObligationRecord>, StoreError> {
        self.inner.records(internship_id, kind)
    }
}

/// Store that accepts `budget` inserts and then goes offline.
pub(super) struct FlakyStore {
    pub(super) inner: MemoryStore,
    pub(super) budget: Mutex<usize>,
}

impl FlakyStore {
    pub(super) fn new(inner: MemoryStore, budget: usize) -> Self {
        Self {
            inner,
            budget: Mutex::new(budget),
        }
    }
}

impl ObligationStore for FlakyStore {
    fn list_existing_obligation_keys(
        &self,
        internship_id: &InternshipId,
        kind: ObligationKind,
    ) -> Result<BTreeSet<PeriodKey>, StoreError> {
        self.inner.list_existing_obligation_keys(internship_id, kind)
    }

    fn insert_if_absent(&self, record: ObligationRecord) -> Result<InsertOutcome, StoreError> {
        let mut budget = self.budget.lock().expect("budget mutex poisoned");
        if *budget == 0 {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        *budget -= 1;
        self.inner.insert_if_absent(record)
    }

    fn save_summary(
        &self,
        internship_id: &InternshipId,
        summary: InternshipObligationSummary,
    ) -> Result<(), StoreError> {
        self.inner.save_summary(internship_id, summary)
    }

    fn summary(
        &self,
        internship_id: &InternshipId,
    ) -> Result<Option<InternshipObligationSummary>, StoreError> {
        self.inner.summary(internship_id)
    }

    fn records(
        &self,
        internship_id: &InternshipId,
        kind: ObligationKind,
    ) -> Result<Vec<ObligationRecord>, StoreError> {
        self.inner.records(internship_id, kind)
    }
}

pub(super) struct UnavailableStore;

impl ObligationStore for UnavailableStore {
    fn list_existing_obligation_keys(
        &self,
        _internship_id: &InternshipId,
        _kind: ObligationKind,
    ) -> Result<BTreeSet<PeriodKey>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn insert_if_absent(&self, _record: ObligationRecord) -> Result<InsertOutcome, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn save_summary(
        &self,
        _internship_id: &InternshipId,
        _summary: InternshipObligationSummary,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn summary(
        &self,
        _internship_id: &InternshipId,
    ) -> Result<Option<InternshipObligationSummary>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn records(
        &self,
        _internship_id: &InternshipId,
        _kind: ObligationKind,
    ) -> Result<Vec<ObligationRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn build_service() -> (ObligationService<MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let service = ObligationService::new(store.clone(), ObligationPolicy::default());
    (service, store)
}

pub(super) fn router_with_service(service: ObligationService<MemoryStore>) -> axum::Router {
    obligation_router(Arc::new(service))
}

pub(super) fn assert_unprocessable(response: &Response) {
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
