//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification, plus the handlers that
//! do not belong to any feature module.

use axum::response::{IntoResponse, Json};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::web::{admin, assistant, attendance, auth, knowledge, leave};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        attendance::check_in_handler,
        attendance::check_out_handler,
        attendance::today_handler,
        attendance::history_handler,
        attendance::my_score_handler,
        attendance::employee_score_handler,
        leave::create_leave_handler,
        leave::my_leave_handler,
        leave::cancel_leave_handler,
        leave::list_leave_handler,
        leave::decide_leave_handler,
        admin::create_employee_handler,
        admin::list_employees_handler,
        admin::set_pin_handler,
        admin::clear_pin_handler,
        admin::dashboard_handler,
        assistant::chat_handler,
        assistant::insights_chat_handler,
        knowledge::list_knowledge_handler,
        knowledge::create_knowledge_handler,
        knowledge::update_knowledge_handler,
        knowledge::delete_knowledge_handler,
    ),
    components(
        schemas(
            HealthResponse,
            auth::LoginRequest,
            auth::EmployeeResponse,
            attendance::CheckInRequest,
            attendance::WorkSessionResponse,
            attendance::TodayResponse,
            attendance::HistoryResponse,
            attendance::ScoreResponse,
            leave::CreateLeaveRequest,
            leave::LeaveRequestResponse,
            leave::LeaveBalanceResponse,
            leave::MyLeaveResponse,
            leave::LeaveDecisionRequest,
            admin::CreateEmployeeRequest,
            admin::SetPinRequest,
            admin::DashboardResponse,
            assistant::ChatRoleDto,
            assistant::ChatMessageDto,
            assistant::ChatRequest,
            assistant::ChatResponse,
            knowledge::KnowledgeEntryRequest,
            knowledge::KnowledgeEntryResponse,
        )
    ),
    tags(
        (name = "Attendance API", description = "Attendance, punctuality scoring, leave and the workplace assistant.")
    )
)]
pub struct ApiDoc;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Serves the generated OpenAPI document.
pub async fn openapi_handler() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
