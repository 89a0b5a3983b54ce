use chrono::{NaiveDate, NaiveDateTime};
use internship_compliance::obligations::{
    InsertOutcome, InternshipId, InternshipObligationSummary, ObligationKind, ObligationRecord,
    ObligationRecordKey, ObligationStore, PeriodKey, StoreError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local store keyed by the record uniqueness key.
#[derive(Default, Clone)]
pub(crate) struct InMemoryObligationStore {
    records: Arc<Mutex<BTreeMap<ObligationRecordKey, ObligationRecord>>>,
    summaries: Arc<Mutex<HashMap<InternshipId, InternshipObligationSummary>>>,
}

impl InMemoryObligationStore {
    fn record_table(
        &self,
    ) -> Result<MutexGuard<'_, BTreeMap<ObligationRecordKey, ObligationRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("record table lock poisoned".to_string()))
    }

    fn summary_table(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<InternshipId, InternshipObligationSummary>>, StoreError> {
        self.summaries
            .lock()
            .map_err(|_| StoreError::Unavailable("summary table lock poisoned".to_string()))
    }
}

impl ObligationStore for InMemoryObligationStore {
    fn list_existing_obligation_keys(
        &self,
        internship_id: &InternshipId,
        kind: ObligationKind,
    ) -> Result<BTreeSet<PeriodKey>, StoreError> {
        Ok(self
            .record_table()?
            .keys()
            .filter(|key| &key.internship_id == internship_id && key.kind == kind)
            .map(|key| key.period)
            .collect())
    }

    fn insert_if_absent(&self, record: ObligationRecord) -> Result<InsertOutcome, StoreError> {
        let mut guard = self.record_table()?;
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
        self.summary_table()?.insert(internship_id.clone(), summary);
        Ok(())
    }

    fn summary(
        &self,
        internship_id: &InternshipId,
    ) -> Result<Option<InternshipObligationSummary>, StoreError> {
        Ok(self.summary_table()?.get(internship_id).copied())
    }

    fn records(
        &self,
        internship_id: &InternshipId,
        kind: ObligationKind,
    ) -> Result<Vec<ObligationRecord>, StoreError> {
        Ok(self
            .record_table()?
            .values()
            .filter(|record| record.internship_id() == internship_id && record.kind() == kind)
            .cloned()
            .collect())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%dT%H:%M:%S")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DDTHH:MM:SS ({err})"))
}
