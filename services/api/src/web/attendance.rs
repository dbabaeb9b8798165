//! services/api/src/web/attendance.rs
//!
//! Check-in, check-out, attendance history and the punctuality score endpoints.

use attendance_core::{
    domain::{Employee, WorkSession},
    location::{detect_mode, Coordinates},
    ports::{DatabaseService, PortError},
    scoring::{compute_score, ScoreResult, WINDOW_DAYS},
    time::{ist_date, window_bounds, window_dates},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::{auth::verify_secret, state::AppState};

const MAX_HISTORY_DAYS: u32 = 90;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema, Default)]
pub struct CheckInRequest {
    /// Required when the employee has a PIN configured.
    pub pin: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Serialize, ToSchema)]
pub struct WorkSessionResponse {
    pub id: Uuid,
    pub checkin_at: DateTime<Utc>,
    pub checkout_at: Option<DateTime<Utc>>,
    pub mode: String,
    pub hours_worked: f64,
}

impl WorkSessionResponse {
    pub fn from_domain(session: &WorkSession, now: DateTime<Utc>) -> Self {
        Self {
            id: session.id,
            checkin_at: session.checkin_at,
            checkout_at: session.checkout_at,
            mode: session.mode.as_str().to_string(),
            hours_worked: (session.hours_worked(now) * 100.0).round() / 100.0,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TodayResponse {
    pub date: NaiveDate,
    pub sessions: Vec<WorkSessionResponse>,
    pub open_session: Option<WorkSessionResponse>,
    pub total_hours: f64,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Number of IST days to look back, today inclusive (1-90, default 14).
    pub days: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub sessions: Vec<WorkSessionResponse>,
}

/// The punctuality score as exposed on the wire.
#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResponse {
    pub punctuality_score: f64,
    pub max_score: f64,
    pub no_fill_days: u32,
    pub avg_checkin_time: String,
    pub avg_checkin_time_minutes: u32,
    pub today_checkin_time: Option<String>,
    pub checkin_status: Option<String>,
}

impl From<ScoreResult> for ScoreResponse {
    fn from(result: ScoreResult) -> Self {
        Self {
            punctuality_score: result.punctuality_score,
            max_score: result.max_score,
            no_fill_days: result.no_fill_days,
            avg_checkin_time: result.avg_checkin_time,
            avg_checkin_time_minutes: result.avg_checkin_time_minutes,
            today_checkin_time: result.today_checkin_time,
            checkin_status: result.checkin_status.map(|s| s.as_str().to_string()),
        }
    }
}

//=========================================================================================
// Shared Helpers
//=========================================================================================

/// Loads the employee's sessions for the scoring window and scores them. An unknown
/// employee is reported as `NotFound` before any session is read.
pub async fn score_for(
    db: &dyn DatabaseService,
    employee_id: Uuid,
    now: DateTime<Utc>,
) -> Result<ScoreResult, ApiError> {
    db.get_employee_by_id(employee_id).await?;
    let (from, to) = window_bounds(now, WINDOW_DAYS);
    let sessions = db.get_work_sessions_in_range(employee_id, from, to).await?;
    Ok(compute_score(&sessions, now))
}

fn position_from(req: &CheckInRequest) -> Result<Option<Coordinates>, ApiError> {
    match (req.latitude, req.longitude) {
        (Some(latitude), Some(longitude)) => Ok(Some(Coordinates::new(latitude, longitude)?)),
        (None, None) => Ok(None),
        _ => Err(ApiError::BadRequest(
            "latitude and longitude must be sent together".to_string(),
        )),
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Check in. The work mode is derived from the reported position.
#[utoipa::path(
    post,
    path = "/attendance/check-in",
    request_body = CheckInRequest,
    responses(
        (status = 201, description = "Checked in", body = WorkSessionResponse),
        (status = 400, description = "Invalid coordinates"),
        (status = 401, description = "Missing or wrong PIN"),
        (status = 409, description = "Already checked in")
    )
)]
pub async fn check_in_handler(
    State(state): State<Arc<AppState>>,
    Extension(employee): Extension<Employee>,
    Json(req): Json<CheckInRequest>,
) -> Result<(StatusCode, Json<WorkSessionResponse>), ApiError> {
    if let Some(pin_hash) = state.db.get_employee_pin_hash(employee.id).await? {
        let pin = req.pin.as_deref().ok_or(PortError::Unauthorized)?;
        if !verify_secret(pin, &pin_hash)? {
            return Err(PortError::Unauthorized.into());
        }
    }

    let position = position_from(&req)?;

    if state.db.get_open_work_session(employee.id).await?.is_some() {
        return Err(PortError::Conflict("Already checked in".to_string()).into());
    }

    let now = Utc::now();
    let mode = detect_mode(state.config.office.as_ref(), position);
    let session = state.db.create_work_session(employee.id, now, mode).await?;
    info!(employee_id = %employee.id, mode = %mode, "Employee checked in");

    Ok((
        StatusCode::CREATED,
        Json(WorkSessionResponse::from_domain(&session, now)),
    ))
}

/// Check out of the currently open session.
#[utoipa::path(
    post,
    path = "/attendance/check-out",
    responses(
        (status = 200, description = "Checked out", body = WorkSessionResponse),
        (status = 404, description = "Not checked in")
    )
)]
pub async fn check_out_handler(
    State(state): State<Arc<AppState>>,
    Extension(employee): Extension<Employee>,
) -> Result<Json<WorkSessionResponse>, ApiError> {
    let open = state
        .db
        .get_open_work_session(employee.id)
        .await?
        .ok_or_else(|| PortError::NotFound("Not checked in".to_string()))?;

    let now = Utc::now();
    let session = state.db.close_work_session(open.id, now).await?;
    info!(
        employee_id = %employee.id,
        hours = session.hours_worked(now),
        "Employee checked out"
    );
    Ok(Json(WorkSessionResponse::from_domain(&session, now)))
}

/// Today's sessions and hours.
#[utoipa::path(
    get,
    path = "/attendance/today",
    responses((status = 200, description = "Today's attendance", body = TodayResponse))
)]
pub async fn today_handler(
    State(state): State<Arc<AppState>>,
    Extension(employee): Extension<Employee>,
) -> Result<Json<TodayResponse>, ApiError> {
    let now = Utc::now();
    let (from, to) = window_bounds(now, 1);
    let sessions = state
        .db
        .get_work_sessions_in_range(employee.id, from, to)
        .await?;
    // The open session may have started before midnight.
    let open = state.db.get_open_work_session(employee.id).await?;

    let total_hours = sessions.iter().map(|s| s.hours_worked(now)).sum::<f64>();
    Ok(Json(TodayResponse {
        date: ist_date(now),
        sessions: sessions
            .iter()
            .map(|s| WorkSessionResponse::from_domain(s, now))
            .collect(),
        open_session: open.map(|s| WorkSessionResponse::from_domain(&s, now)),
        total_hours: (total_hours * 100.0).round() / 100.0,
    }))
}

/// Sessions of the last `days` days.
#[utoipa::path(
    get,
    path = "/attendance/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Attendance history", body = HistoryResponse),
        (status = 400, description = "days out of range")
    )
)]
pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    Extension(employee): Extension<Employee>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let days = query.days.unwrap_or(WINDOW_DAYS);
    if days == 0 || days > MAX_HISTORY_DAYS {
        return Err(ApiError::BadRequest(format!(
            "days must be between 1 and {}",
            MAX_HISTORY_DAYS
        )));
    }

    let now = Utc::now();
    let (from, to) = window_bounds(now, days);
    let (first_day, today) = window_dates(now, days);
    let sessions = state
        .db
        .get_work_sessions_in_range(employee.id, from, to)
        .await?;

    Ok(Json(HistoryResponse {
        from: first_day,
        to: today,
        sessions: sessions
            .iter()
            .map(|s| WorkSessionResponse::from_domain(s, now))
            .collect(),
    }))
}

/// The caller's punctuality score over the last 14 days.
#[utoipa::path(
    get,
    path = "/attendance/score",
    responses((status = 200, description = "Punctuality score", body = ScoreResponse))
)]
pub async fn my_score_handler(
    State(state): State<Arc<AppState>>,
    Extension(employee): Extension<Employee>,
) -> Result<Json<ScoreResponse>, ApiError> {
    let result = score_for(state.db.as_ref(), employee.id, Utc::now()).await?;
    Ok(Json(result.into()))
}

/// Any employee's punctuality score (admin only).
#[utoipa::path(
    get,
    path = "/admin/employees/{id}/score",
    params(("id" = Uuid, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Punctuality score", body = ScoreResponse),
        (status = 404, description = "Unknown employee")
    )
)]
pub async fn employee_score_handler(
    State(state): State<Arc<AppState>>,
    Path(employee_id): Path<Uuid>,
) -> Result<Json<ScoreResponse>, ApiError> {
    let result = score_for(state.db.as_ref(), employee_id, Utc::now()).await?;
    Ok(Json(result.into()))
}
