use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::calendar::DateInterval;
use super::domain::{InternshipId, IntervalTooShortWarning, ObligationPeriod, ScheduleError};
use super::repository::{ObligationStore, StoreError};
use super::schedule::ScheduleProjection;
use super::service::{InternshipDates, ObligationService, ObligationServiceError};

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub now: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct ReconcileRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct RollupRequest {
    pub internships: Vec<InternshipDates>,
    #[serde(default)]
    pub now: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize)]
pub struct PeriodView {
    pub label: String,
    #[serde(flatten)]
    pub period: ObligationPeriod,
}

#[derive(Debug, Serialize)]
pub struct ScheduleView {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub projection: ScheduleProjection,
    pub periods: Vec<PeriodView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<IntervalTooShortWarning>,
}

/// Router builder exposing schedule projection, reconciliation, and compliance.
pub fn obligation_router<S>(service: Arc<ObligationService<S>>) -> Router
where
    S: ObligationStore + 'static,
{
    Router::new()
        .route("/api/v1/obligations/schedule", post(schedule_handler::<S>))
        .route(
            "/api/v1/obligations/compliance/rollup",
            post(rollup_handler::<S>),
        )
        .route(
            "/api/v1/internships/:internship_id/obligations/reconcile",
            post(reconcile_handler::<S>),
        )
        .route(
            "/api/v1/internships/:internship_id/compliance",
            post(compliance_handler::<S>),
        )
        .with_state(service)
}

pub(crate) async fn schedule_handler<S>(
    State(service): State<Arc<ObligationService<S>>>,
    axum::Json(request): axum::Json<ScheduleRequest>,
) -> Response
where
    S: ObligationStore + 'static,
{
    let now = request.now.unwrap_or_else(current_time);
    let schedule = DateInterval::new(request.start_date, request.end_date)
        .and_then(|interval| service.schedule(&interval));

    match schedule {
        Ok(schedule) => {
            let view = ScheduleView {
                start_date: request.start_date,
                end_date: request.end_date,
                projection: schedule.projection(now),
                periods: schedule
                    .periods()
                    .iter()
                    .map(|period| PeriodView {
                        label: period.label(),
                        period: period.clone(),
                    })
                    .collect(),
                warning: schedule.warning().copied(),
            };
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(err) => schedule_error_response(&err),
    }
}

pub(crate) async fn reconcile_handler<S>(
    State(service): State<Arc<ObligationService<S>>>,
    Path(internship_id): Path<String>,
    axum::Json(request): axum::Json<ReconcileRequest>,
) -> Response
where
    S: ObligationStore + 'static,
{
    let id = InternshipId(internship_id);
    let outcome = DateInterval::new(request.start_date, request.end_date)
        .map_err(ObligationServiceError::from)
        .and_then(|interval| service.reconcile(&id, &interval));

    match outcome {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => service_error_response(err),
    }
}

pub(crate) async fn compliance_handler<S>(
    State(service): State<Arc<ObligationService<S>>>,
    Path(internship_id): Path<String>,
    axum::Json(request): axum::Json<ScheduleRequest>,
) -> Response
where
    S: ObligationStore + 'static,
{
    let id = InternshipId(internship_id);
    let now = request.now.unwrap_or_else(current_time);
    let compliance = DateInterval::new(request.start_date, request.end_date)
        .map_err(ObligationServiceError::from)
        .and_then(|interval| service.compliance(&id, &interval, now));

    match compliance {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => service_error_response(err),
    }
}

pub(crate) async fn rollup_handler<S>(
    State(service): State<Arc<ObligationService<S>>>,
    axum::Json(request): axum::Json<RollupRequest>,
) -> Response
where
    S: ObligationStore + 'static,
{
    let now = request.now.unwrap_or_else(current_time);

    match service.rollup(&request.internships, now) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => service_error_response(err),
    }
}

fn current_time() -> NaiveDateTime {
    Local::now().naive_local()
}

fn schedule_error_response(err: &ScheduleError) -> Response {
    let payload = json!({
        "error": err.to_string(),
        "kind": err.code(),
        "data_quality": true,
    });
    (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
}

fn service_error_response(err: ObligationServiceError) -> Response {
    match err {
        ObligationServiceError::Schedule(err) => schedule_error_response(&err),
        ObligationServiceError::Store(StoreError::Duplicate(key)) => {
            let payload = json!({
                "error": format!("obligation record {key} already exists"),
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        ObligationServiceError::Store(err @ StoreError::Unavailable(_)) => {
            let payload = json!({
                "error": err.to_string(),
            });
            (StatusCode::SERVICE_UNAVAILABLE, axum::Json(payload)).into_response()
        }
    }
}
