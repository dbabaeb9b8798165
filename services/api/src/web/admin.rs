//! services/api/src/web/admin.rs
//!
//! Admin-only endpoints: employee management, check-in PINs and the daily dashboard.

use attendance_core::{
    domain::{LeaveRequest, LeaveStatus, NewEmployee, Role, WorkMode, WorkSession},
    time::{format_minutes, ist_date, minutes_since_midnight, window_bounds},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::{
    auth::{hash_secret, EmployeeResponse},
    state::AppState,
};

const MIN_PASSWORD_CHARS: usize = 8;

static EMAIL_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static PIN_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn matches_pattern(cell: &'static OnceLock<Option<Regex>>, pattern: &str, value: &str) -> bool {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}

fn is_valid_email(email: &str) -> bool {
    matches_pattern(&EMAIL_PATTERN, r"^[^@\s]+@[^@\s]+\.[^@\s]+$", email)
}

fn is_valid_pin(pin: &str) -> bool {
    matches_pattern(&PIN_PATTERN, r"^[0-9]{4,6}$", pin)
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployeeRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// `employee` (default) or `admin`.
    pub role: Option<String>,
    /// Defaults to today (IST).
    pub joined_on: Option<NaiveDate>,
}

#[derive(Deserialize, ToSchema)]
pub struct SetPinRequest {
    /// 4 to 6 digits.
    pub pin: String,
}

#[derive(Serialize, ToSchema, Debug, PartialEq)]
pub struct DashboardResponse {
    pub date: NaiveDate,
    pub total_employees: usize,
    pub checked_in_today: usize,
    pub currently_checked_in: usize,
    pub office_today: usize,
    pub remote_today: usize,
    pub pending_leave_requests: usize,
    pub on_leave_today: usize,
    /// `HH:MM` in IST, absent when nobody has checked in yet.
    pub average_checkin_today: Option<String>,
}

fn validate_new_employee(req: &CreateEmployeeRequest) -> Result<Role, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }
    if !is_valid_email(req.email.trim()) {
        return Err(ApiError::BadRequest("email is not valid".to_string()));
    }
    if req.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ApiError::BadRequest(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_CHARS
        )));
    }
    match req.role.as_deref() {
        None => Ok(Role::Employee),
        Some(role) => Ok(role.trim().parse()?),
    }
}

/// Folds today's sessions and leave requests into the dashboard counters. Sessions
/// are expected oldest first so that the first one per employee decides the mode.
pub fn summarize_day(
    today: NaiveDate,
    total_employees: usize,
    sessions: &[WorkSession],
    pending: &[LeaveRequest],
    approved: &[LeaveRequest],
) -> DashboardResponse {
    let mut first_sessions: HashMap<Uuid, &WorkSession> = HashMap::new();
    for session in sessions {
        first_sessions.entry(session.employee_id).or_insert(session);
    }

    let currently_checked_in = sessions
        .iter()
        .filter(|s| s.is_open())
        .map(|s| s.employee_id)
        .collect::<HashSet<_>>()
        .len();
    let office_today = first_sessions
        .values()
        .filter(|s| s.mode == WorkMode::Office)
        .count();
    let on_leave_today = approved
        .iter()
        .filter(|r| r.covers(today))
        .map(|r| r.employee_id)
        .collect::<HashSet<_>>()
        .len();

    let checkins: Vec<u32> = first_sessions
        .values()
        .map(|s| minutes_since_midnight(s.checkin_at))
        .collect();
    let average_checkin_today = if checkins.is_empty() {
        None
    } else {
        let mean = checkins.iter().sum::<u32>() as f64 / checkins.len() as f64;
        Some(format_minutes(mean.round() as u32))
    };

    DashboardResponse {
        date: today,
        total_employees,
        checked_in_today: first_sessions.len(),
        currently_checked_in,
        office_today,
        remote_today: first_sessions.len() - office_today,
        pending_leave_requests: pending.len(),
        on_leave_today,
        average_checkin_today,
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Create an employee account.
#[utoipa::path(
    post,
    path = "/admin/employees",
    request_body = CreateEmployeeRequest,
    responses(
        (status = 201, description = "Employee created", body = EmployeeResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn create_employee_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateEmployeeRequest>,
) -> Result<(StatusCode, Json<EmployeeResponse>), ApiError> {
    let role = validate_new_employee(&req)?;
    let hashed_password = hash_secret(&req.password)?;

    let employee = state
        .db
        .create_employee(NewEmployee {
            name: req.name.trim().to_string(),
            email: req.email.trim().to_lowercase(),
            role,
            joined_on: req.joined_on.unwrap_or_else(|| ist_date(Utc::now())),
            hashed_password,
        })
        .await?;
    info!(employee_id = %employee.id, role = role.as_str(), "Employee created");

    Ok((StatusCode::CREATED, Json(employee.into())))
}

/// List every employee.
#[utoipa::path(
    get,
    path = "/admin/employees",
    responses((status = 200, description = "All employees", body = [EmployeeResponse]))
)]
pub async fn list_employees_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<EmployeeResponse>>, ApiError> {
    let employees = state.db.list_employees().await?;
    Ok(Json(employees.into_iter().map(Into::into).collect()))
}

/// Set or replace an employee's check-in PIN.
#[utoipa::path(
    put,
    path = "/admin/employees/{id}/pin",
    params(("id" = Uuid, Path, description = "Employee id")),
    request_body = SetPinRequest,
    responses(
        (status = 204, description = "PIN stored"),
        (status = 400, description = "PIN is not 4 to 6 digits"),
        (status = 404, description = "Unknown employee")
    )
)]
pub async fn set_pin_handler(
    State(state): State<Arc<AppState>>,
    Path(employee_id): Path<Uuid>,
    Json(req): Json<SetPinRequest>,
) -> Result<StatusCode, ApiError> {
    if !is_valid_pin(&req.pin) {
        return Err(ApiError::BadRequest("PIN must be 4 to 6 digits".to_string()));
    }
    let pin_hash = hash_secret(&req.pin)?;
    state
        .db
        .set_employee_pin(employee_id, Some(pin_hash.as_str()))
        .await?;
    info!(employee_id = %employee_id, "Check-in PIN set");
    Ok(StatusCode::NO_CONTENT)
}

/// Remove an employee's check-in PIN.
#[utoipa::path(
    delete,
    path = "/admin/employees/{id}/pin",
    params(("id" = Uuid, Path, description = "Employee id")),
    responses(
        (status = 204, description = "PIN removed"),
        (status = 404, description = "Unknown employee")
    )
)]
pub async fn clear_pin_handler(
    State(state): State<Arc<AppState>>,
    Path(employee_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.db.set_employee_pin(employee_id, None).await?;
    info!(employee_id = %employee_id, "Check-in PIN cleared");
    Ok(StatusCode::NO_CONTENT)
}

/// Today's attendance and leave at a glance.
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    responses((status = 200, description = "Dashboard counters", body = DashboardResponse))
)]
pub async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let now = Utc::now();
    let (from, to) = window_bounds(now, 1);
    let db = state.db.as_ref();

    let (employees, sessions, pending, approved) = futures::try_join!(
        db.list_employees(),
        db.get_all_work_sessions_in_range(from, to),
        db.list_leave_requests(Some(LeaveStatus::Pending)),
        db.list_leave_requests(Some(LeaveStatus::Approved)),
    )?;

    Ok(Json(summarize_day(
        ist_date(now),
        employees.len(),
        &sessions,
        &pending,
        &approved,
    )))
}
