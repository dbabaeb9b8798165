//! services/api/src/web/leave.rs
//!
//! Leave requests: booking, cancelling, and the admin approval flow.

use attendance_core::{
    domain::{Employee, LeaveRequest, LeaveStatus, LeaveType, NewLeaveRequest},
    leave::{balance, requested_days, BookingRules, LeaveBalance},
    ports::PortError,
    time::ist_date,
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
use crate::web::state::AppState;

const MAX_REASON_CHARS: usize = 1000;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateLeaveRequest {
    /// One of `annual`, `sick`, `unpaid`.
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub half_day: bool,
    #[serde(default)]
    pub reason: String,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveRequestResponse {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: f64,
    pub reason: String,
    pub status: String,
    pub decided_by: Option<Uuid>,
    pub decision_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<LeaveRequest> for LeaveRequestResponse {
    fn from(request: LeaveRequest) -> Self {
        Self {
            id: request.id,
            employee_id: request.employee_id,
            leave_type: request.leave_type.as_str().to_string(),
            start_date: request.start_date,
            end_date: request.end_date,
            days: request.days,
            reason: request.reason,
            status: request.status.as_str().to_string(),
            decided_by: request.decided_by,
            decision_note: request.decision_note,
            created_at: request.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct LeaveBalanceResponse {
    pub accrued: f64,
    pub used: f64,
    pub pending: f64,
    pub available: f64,
}

impl From<LeaveBalance> for LeaveBalanceResponse {
    fn from(b: LeaveBalance) -> Self {
        Self {
            accrued: b.accrued,
            used: b.used,
            pending: b.pending,
            available: b.available,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct MyLeaveResponse {
    pub balance: LeaveBalanceResponse,
    pub requests: Vec<LeaveRequestResponse>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeaveListQuery {
    /// Filter by status (`pending`, `approved`, `rejected`, `cancelled`).
    pub status: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LeaveDecisionRequest {
    pub approve: bool,
    pub note: Option<String>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Book leave.
#[utoipa::path(
    post,
    path = "/leave",
    request_body = CreateLeaveRequest,
    responses(
        (status = 201, description = "Request created", body = LeaveRequestResponse),
        (status = 400, description = "Invalid dates or leave type, or annual leave across two years"),
        (status = 409, description = "Overlapping request or insufficient balance")
    )
)]
pub async fn create_leave_handler(
    State(state): State<Arc<AppState>>,
    Extension(employee): Extension<Employee>,
    Json(req): Json<CreateLeaveRequest>,
) -> Result<(StatusCode, Json<LeaveRequestResponse>), ApiError> {
    let leave_type: LeaveType = req.leave_type.trim().parse()?;
    let days = requested_days(req.start_date, req.end_date, req.half_day)?;
    if req.reason.chars().count() > MAX_REASON_CHARS {
        return Err(ApiError::BadRequest(format!(
            "reason must be at most {} characters",
            MAX_REASON_CHARS
        )));
    }

    let rules = BookingRules {
        joined_on: employee.joined_on,
        today: ist_date(Utc::now()),
        policy: state.config.leave_policy,
    };
    let request = NewLeaveRequest {
        employee_id: employee.id,
        leave_type,
        start_date: req.start_date,
        end_date: req.end_date,
        days,
        reason: req.reason.trim().to_string(),
    };
    let check = |existing: &[LeaveRequest]| rules.check(&request, existing);
    let created = state
        .db
        .create_leave_request(request.clone(), &check)
        .await?;
    info!(employee_id = %employee.id, request_id = %created.id, days, "Leave requested");

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// The caller's leave requests and annual leave balance.
#[utoipa::path(
    get,
    path = "/leave",
    responses((status = 200, description = "Leave overview", body = MyLeaveResponse))
)]
pub async fn my_leave_handler(
    State(state): State<Arc<AppState>>,
    Extension(employee): Extension<Employee>,
) -> Result<Json<MyLeaveResponse>, ApiError> {
    let requests = state.db.list_leave_requests_for_employee(employee.id).await?;
    let today = ist_date(Utc::now());
    let current = balance(employee.joined_on, today, &requests, &state.config.leave_policy);
    Ok(Json(MyLeaveResponse {
        balance: current.into(),
        requests: requests.into_iter().map(Into::into).collect(),
    }))
}

/// Cancel one of the caller's pending requests.
#[utoipa::path(
    post,
    path = "/leave/{id}/cancel",
    params(("id" = Uuid, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Request cancelled", body = LeaveRequestResponse),
        (status = 404, description = "No such request"),
        (status = 409, description = "Request is no longer pending")
    )
)]
pub async fn cancel_leave_handler(
    State(state): State<Arc<AppState>>,
    Extension(employee): Extension<Employee>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<LeaveRequestResponse>, ApiError> {
    let request = state.db.get_leave_request(request_id).await?;
    if request.employee_id != employee.id {
        return Err(PortError::NotFound(format!("Leave request {} not found", request_id)).into());
    }
    let cancelled = state
        .db
        .update_leave_status(request_id, LeaveStatus::Cancelled, None, None)
        .await?;
    info!(employee_id = %employee.id, request_id = %request_id, "Leave cancelled");
    Ok(Json(cancelled.into()))
}

/// All leave requests, optionally filtered by status (admin only).
#[utoipa::path(
    get,
    path = "/admin/leave",
    params(LeaveListQuery),
    responses(
        (status = 200, description = "Leave requests", body = [LeaveRequestResponse]),
        (status = 400, description = "Unknown status")
    )
)]
pub async fn list_leave_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaveListQuery>,
) -> Result<Json<Vec<LeaveRequestResponse>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<LeaveStatus>)
        .transpose()?;
    let requests = state.db.list_leave_requests(status).await?;
    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

/// Approve or reject a pending request (admin only).
#[utoipa::path(
    post,
    path = "/admin/leave/{id}/decision",
    params(("id" = Uuid, Path, description = "Leave request id")),
    request_body = LeaveDecisionRequest,
    responses(
        (status = 200, description = "Decision recorded", body = LeaveRequestResponse),
        (status = 404, description = "No such request"),
        (status = 409, description = "Request is no longer pending")
    )
)]
pub async fn decide_leave_handler(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<Employee>,
    Path(request_id): Path<Uuid>,
    Json(req): Json<LeaveDecisionRequest>,
) -> Result<Json<LeaveRequestResponse>, ApiError> {
    let status = if req.approve {
        LeaveStatus::Approved
    } else {
        LeaveStatus::Rejected
    };
    let note = req
        .note
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let decided = state
        .db
        .update_leave_status(request_id, status, Some(admin.id), note)
        .await?;
    info!(
        admin_id = %admin.id,
        request_id = %request_id,
        status = status.as_str(),
        "Leave request decided"
    );
    Ok(Json(decided.into()))
}
