//! services/api/src/web/assistant.rs
//!
//! Chat endpoints backed by the `ChatCompletionService` port. Each request carries
//! the whole conversation; the server only adds a system prompt built from live
//! attendance and leave data.

use attendance_core::{
    domain::{ChatMessage, ChatRole, Employee, KnowledgeEntry, WorkSession},
    leave::{balance, LeaveBalance},
    scoring::{compute_score, ScoreResult, WINDOW_DAYS},
    time::{format_minutes, ist_date, minutes_since_midnight, window_bounds},
};
use axum::{extract::State, response::Json, Extension};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::{attendance::score_for, state::AppState};

pub const MAX_MESSAGES: usize = 20;
pub const MAX_MESSAGE_CHARS: usize = 4000;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, Serialize, ToSchema, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRoleDto {
    User,
    Assistant,
}

#[derive(Deserialize, Serialize, ToSchema, Clone, Debug)]
pub struct ChatMessageDto {
    pub role: ChatRoleDto,
    pub content: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessageDto>,
}

#[derive(Serialize, ToSchema)]
pub struct ChatResponse {
    pub reply: String,
}

/// Checks the conversation shape and converts it to domain messages.
pub fn validate_messages(messages: &[ChatMessageDto]) -> Result<Vec<ChatMessage>, ApiError> {
    if messages.is_empty() || messages.len() > MAX_MESSAGES {
        return Err(ApiError::BadRequest(format!(
            "a conversation must have between 1 and {} messages",
            MAX_MESSAGES
        )));
    }
    if messages.last().map(|m| m.role) != Some(ChatRoleDto::User) {
        return Err(ApiError::BadRequest(
            "the last message must come from the user".to_string(),
        ));
    }
    if messages
        .iter()
        .any(|m| m.content.chars().count() > MAX_MESSAGE_CHARS)
    {
        return Err(ApiError::BadRequest(format!(
            "messages must be at most {} characters",
            MAX_MESSAGE_CHARS
        )));
    }

    Ok(messages
        .iter()
        .map(|m| ChatMessage {
            role: match m.role {
                ChatRoleDto::User => ChatRole::User,
                ChatRoleDto::Assistant => ChatRole::Assistant,
            },
            content: m.content.clone(),
        })
        .collect())
}

//=========================================================================================
// Prompt Builders
//=========================================================================================

fn push_score(prompt: &mut String, score: &ScoreResult) {
    prompt.push_str(&format!(
        "- Punctuality score ({} days): {:.2} / {:.0}\n",
        WINDOW_DAYS, score.punctuality_score, score.max_score
    ));
    prompt.push_str(&format!("- Days without attendance: {}\n", score.no_fill_days));
    prompt.push_str(&format!("- Average check-in time: {}\n", score.avg_checkin_time));
    if let (Some(time), Some(status)) = (&score.today_checkin_time, score.checkin_status) {
        prompt.push_str(&format!("- Checked in today at {} ({})\n", time, status.as_str()));
    }
}

fn push_knowledge(prompt: &mut String, knowledge: &[KnowledgeEntry]) {
    if knowledge.is_empty() {
        return;
    }
    prompt.push_str("\nCompany knowledge base:\n");
    for entry in knowledge {
        prompt.push_str(&format!("## {}\n{}\n", entry.title, entry.content));
    }
}

/// The system prompt for an employee's personal assistant.
pub fn employee_prompt(
    employee: &Employee,
    today_sessions: &[WorkSession],
    leave: &LeaveBalance,
    score: &ScoreResult,
    knowledge: &[KnowledgeEntry],
    now: DateTime<Utc>,
) -> String {
    let mut prompt = String::from(
        "You are the workplace assistant of an attendance system. Answer questions about \
         the employee's attendance, leave and company policies using only the data below. \
         Times are in IST. If the data does not answer a question, say so.\n\n",
    );
    prompt.push_str(&format!("Employee: {}\n", employee.name));
    prompt.push_str(&format!("Today: {}\n", ist_date(now)));

    if today_sessions.is_empty() {
        prompt.push_str("- Not checked in today\n");
    }
    for session in today_sessions {
        let checkout = session
            .checkout_at
            .map(|t| format_minutes(minutes_since_midnight(t)))
            .unwrap_or_else(|| "still checked in".to_string());
        prompt.push_str(&format!(
            "- Session {} to {} ({}, {:.2} h)\n",
            format_minutes(minutes_since_midnight(session.checkin_at)),
            checkout,
            session.mode,
            session.hours_worked(now)
        ));
    }
    push_score(&mut prompt, score);
    prompt.push_str(&format!(
        "- Annual leave: {:.1} accrued, {:.1} used, {:.1} pending, {:.1} available\n",
        leave.accrued, leave.used, leave.pending, leave.available
    ));
    push_knowledge(&mut prompt, knowledge);
    prompt
}

/// The system prompt for the admin insights assistant.
pub fn insights_prompt(
    team: &[(Employee, ScoreResult)],
    knowledge: &[KnowledgeEntry],
    now: DateTime<Utc>,
) -> String {
    let mut prompt = String::from(
        "You are an analytics assistant for an attendance system administrator. Use the \
         team data below to answer questions about punctuality and attendance trends. \
         Times are in IST.\n\n",
    );
    prompt.push_str(&format!("Today: {}\n", ist_date(now)));
    for (employee, score) in team {
        prompt.push_str(&format!("\n{} ({})\n", employee.name, employee.email));
        push_score(&mut prompt, score);
        if score.today_checkin_time.is_none() {
            prompt.push_str("- Not checked in today\n");
        }
    }
    push_knowledge(&mut prompt, knowledge);
    prompt
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Chat with the personal assistant.
#[utoipa::path(
    post,
    path = "/assistant/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "Malformed conversation"),
        (status = 429, description = "Too many requests"),
        (status = 503, description = "Assistant not configured")
    )
)]
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(employee): Extension<Employee>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let chat = state.chat()?.clone();
    let messages = validate_messages(&req.messages)?;

    let now = Utc::now();
    let (from, to) = window_bounds(now, 1);
    let db = state.db.as_ref();
    let (today_sessions, requests, knowledge) = futures::try_join!(
        db.get_work_sessions_in_range(employee.id, from, to),
        db.list_leave_requests_for_employee(employee.id),
        db.list_knowledge_entries(),
    )?;
    let score = score_for(db, employee.id, now).await?;
    let leave = balance(
        employee.joined_on,
        ist_date(now),
        &requests,
        &state.config.leave_policy,
    );

    let prompt = employee_prompt(&employee, &today_sessions, &leave, &score, &knowledge, now);
    let reply = chat.complete(&prompt, &messages).await?;
    info!(employee_id = %employee.id, turns = messages.len(), "Assistant replied");

    Ok(Json(ChatResponse { reply }))
}

/// Chat about team-wide attendance (admin only).
#[utoipa::path(
    post,
    path = "/admin/insights/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "Malformed conversation"),
        (status = 429, description = "Too many requests"),
        (status = 503, description = "Assistant not configured")
    )
)]
pub async fn insights_chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<Employee>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let chat = state.chat()?.clone();
    let messages = validate_messages(&req.messages)?;

    let now = Utc::now();
    let (from, to) = window_bounds(now, WINDOW_DAYS);
    let db = state.db.as_ref();
    let (employees, sessions, knowledge) = futures::try_join!(
        db.list_employees(),
        db.get_all_work_sessions_in_range(from, to),
        db.list_knowledge_entries(),
    )?;

    let mut by_employee: HashMap<Uuid, Vec<WorkSession>> = HashMap::new();
    for session in sessions {
        by_employee.entry(session.employee_id).or_default().push(session);
    }
    let team: Vec<(Employee, ScoreResult)> = employees
        .into_iter()
        .map(|employee| {
            let own = by_employee.remove(&employee.id).unwrap_or_default();
            let score = compute_score(&own, now);
            (employee, score)
        })
        .collect();

    let prompt = insights_prompt(&team, &knowledge, now);
    let reply = chat.complete(&prompt, &messages).await?;
    info!(admin_id = %admin.id, turns = messages.len(), "Insights assistant replied");

    Ok(Json(ChatResponse { reply }))
}
