use std::collections::BTreeSet;

use serde::Serialize;

use super::domain::{
    InternshipId, InternshipObligationSummary, ObligationKind, ObligationRecord,
    ObligationRecordKey, PeriodKey,
};

/// Result of an insert against a store that enforces record uniqueness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertOutcome {
    Created,
    AlreadyExists,
}

/// Storage abstraction for obligation records and the cached summary.
///
/// Implementations must enforce uniqueness of (internship, kind, year, month).
pub trait ObligationStore: Send + Sync {
    fn list_existing_obligation_keys(
        &self,
        internship_id: &InternshipId,
        kind: ObligationKind,
    ) -> Result<BTreeSet<PeriodKey>, StoreError>;

    fn insert_if_absent(&self, record: ObligationRecord) -> Result<InsertOutcome, StoreError>;

    fn save_summary(
        &self,
        internship_id: &InternshipId,
        summary: InternshipObligationSummary,
    ) -> Result<(), StoreError>;

    fn summary(
        &self,
        internship_id: &InternshipId,
    ) -> Result<Option<InternshipObligationSummary>, StoreError>;

    fn records(
        &self,
        internship_id: &InternshipId,
        kind: ObligationKind,
    ) -> Result<Vec<ObligationRecord>, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("obligation record {0} already exists")]
    Duplicate(ObligationRecordKey),
    #[error("obligation store unavailable: {0}")]
    Unavailable(String),
}
