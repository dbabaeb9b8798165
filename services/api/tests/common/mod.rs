//! Shared fixtures for the HTTP tests: in-memory port implementations and a
//! helper that drives the real router with `oneshot`.

#![allow(dead_code)]

use api_lib::{
    config::{Config, RateLimitConfig},
    web::{app_router, auth::hash_secret, state::AppState},
};
use async_trait::async_trait;
use attendance_core::{
    domain::{
        ChatMessage, Employee, EmployeeCredentials, KnowledgeEntry, LeaveRequest, LeaveStatus,
        NewEmployee, NewLeaveRequest, Role, WorkMode, WorkSession,
    },
    leave::LeavePolicy,
    ports::{ChatCompletionService, DatabaseService, LeaveCheck, PortError, PortResult},
};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower::ServiceExt;
use uuid::Uuid;

//=========================================================================================
// In-memory DatabaseService
//=========================================================================================

struct StoredEmployee {
    employee: Employee,
    hashed_password: String,
    pin_hash: Option<String>,
}

#[derive(Default)]
struct Store {
    employees: Vec<StoredEmployee>,
    auth_sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    work_sessions: Vec<WorkSession>,
    leave_requests: Vec<LeaveRequest>,
    knowledge: Vec<KnowledgeEntry>,
    rate_limits: HashMap<(String, i64), u32>,
}

#[derive(Default)]
pub struct MockDb {
    store: RwLock<Store>,
}

impl MockDb {
    /// Inserts a work session directly, bypassing the open-session check.
    pub async fn insert_work_session(&self, session: WorkSession) {
        self.store.write().await.work_sessions.push(session);
    }

    pub async fn work_sessions(&self) -> Vec<WorkSession> {
        self.store.read().await.work_sessions.clone()
    }
}

fn not_found(what: &str, id: impl std::fmt::Display) -> PortError {
    PortError::NotFound(format!("{} {} not found", what, id))
}

#[async_trait]
impl DatabaseService for MockDb {
    async fn create_employee(&self, new: NewEmployee) -> PortResult<Employee> {
        let mut store = self.store.write().await;
        if store.employees.iter().any(|e| e.employee.email == new.email) {
            return Err(PortError::Conflict("Email already in use".to_string()));
        }
        let employee = Employee {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            role: new.role,
            joined_on: new.joined_on,
            has_pin: false,
        };
        store.employees.push(StoredEmployee {
            employee: employee.clone(),
            hashed_password: new.hashed_password,
            pin_hash: None,
        });
        Ok(employee)
    }

    async fn get_employee_by_id(&self, employee_id: Uuid) -> PortResult<Employee> {
        let store = self.store.read().await;
        store
            .employees
            .iter()
            .find(|e| e.employee.id == employee_id)
            .map(|e| Employee {
                has_pin: e.pin_hash.is_some(),
                ..e.employee.clone()
            })
            .ok_or_else(|| not_found("Employee", employee_id))
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<EmployeeCredentials> {
        let store = self.store.read().await;
        store
            .employees
            .iter()
            .find(|e| e.employee.email == email)
            .map(|e| EmployeeCredentials {
                employee_id: e.employee.id,
                email: e.employee.email.clone(),
                hashed_password: e.hashed_password.clone(),
            })
            .ok_or_else(|| not_found("Employee", email))
    }

    async fn list_employees(&self) -> PortResult<Vec<Employee>> {
        let store = self.store.read().await;
        Ok(store
            .employees
            .iter()
            .map(|e| Employee {
                has_pin: e.pin_hash.is_some(),
                ..e.employee.clone()
            })
            .collect())
    }

    async fn set_employee_pin(&self, employee_id: Uuid, pin_hash: Option<&str>) -> PortResult<()> {
        let mut store = self.store.write().await;
        let stored = store
            .employees
            .iter_mut()
            .find(|e| e.employee.id == employee_id)
            .ok_or_else(|| not_found("Employee", employee_id))?;
        stored.pin_hash = pin_hash.map(str::to_string);
        Ok(())
    }

    async fn get_employee_pin_hash(&self, employee_id: Uuid) -> PortResult<Option<String>> {
        let store = self.store.read().await;
        store
            .employees
            .iter()
            .find(|e| e.employee.id == employee_id)
            .map(|e| e.pin_hash.clone())
            .ok_or_else(|| not_found("Employee", employee_id))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        employee_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.store
            .write()
            .await
            .auth_sessions
            .insert(session_id.to_string(), (employee_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let store = self.store.read().await;
        match store.auth_sessions.get(session_id) {
            Some((employee_id, expires_at)) if *expires_at > Utc::now() => Ok(*employee_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.store.write().await.auth_sessions.remove(session_id);
        Ok(())
    }

    async fn get_open_work_session(&self, employee_id: Uuid) -> PortResult<Option<WorkSession>> {
        let store = self.store.read().await;
        Ok(store
            .work_sessions
            .iter()
            .find(|s| s.employee_id == employee_id && s.is_open())
            .cloned())
    }

    async fn create_work_session(
        &self,
        employee_id: Uuid,
        checkin_at: DateTime<Utc>,
        mode: WorkMode,
    ) -> PortResult<WorkSession> {
        let mut store = self.store.write().await;
        if store
            .work_sessions
            .iter()
            .any(|s| s.employee_id == employee_id && s.is_open())
        {
            return Err(PortError::Conflict("Already checked in".to_string()));
        }
        let session = WorkSession {
            id: Uuid::new_v4(),
            employee_id,
            checkin_at,
            checkout_at: None,
            mode,
        };
        store.work_sessions.push(session.clone());
        Ok(session)
    }

    async fn close_work_session(
        &self,
        session_id: Uuid,
        checkout_at: DateTime<Utc>,
    ) -> PortResult<WorkSession> {
        let mut store = self.store.write().await;
        let session = store
            .work_sessions
            .iter_mut()
            .find(|s| s.id == session_id && s.is_open())
            .ok_or_else(|| not_found("Open work session", session_id))?;
        session.checkout_at = Some(checkout_at);
        Ok(session.clone())
    }

    async fn get_work_sessions_in_range(
        &self,
        employee_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PortResult<Vec<WorkSession>> {
        let mut sessions: Vec<WorkSession> = self
            .get_all_work_sessions_in_range(from, to)
            .await?
            .into_iter()
            .filter(|s| s.employee_id == employee_id)
            .collect();
        sessions.sort_by_key(|s| s.checkin_at);
        Ok(sessions)
    }

    async fn get_all_work_sessions_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PortResult<Vec<WorkSession>> {
        let store = self.store.read().await;
        let mut sessions: Vec<WorkSession> = store
            .work_sessions
            .iter()
            .filter(|s| from <= s.checkin_at && s.checkin_at < to)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.checkin_at);
        Ok(sessions)
    }

    async fn create_leave_request(
        &self,
        request: NewLeaveRequest,
        check: LeaveCheck<'_>,
    ) -> PortResult<LeaveRequest> {
        let mut store = self.store.write().await;
        let existing: Vec<LeaveRequest> = store
            .leave_requests
            .iter()
            .filter(|r| r.employee_id == request.employee_id)
            .cloned()
            .collect();
        check(&existing)?;
        let created = LeaveRequest {
            id: Uuid::new_v4(),
            employee_id: request.employee_id,
            leave_type: request.leave_type,
            start_date: request.start_date,
            end_date: request.end_date,
            days: request.days,
            reason: request.reason,
            status: LeaveStatus::Pending,
            decided_by: None,
            decision_note: None,
            created_at: Utc::now(),
        };
        store.leave_requests.push(created.clone());
        Ok(created)
    }

    async fn get_leave_request(&self, request_id: Uuid) -> PortResult<LeaveRequest> {
        let store = self.store.read().await;
        store
            .leave_requests
            .iter()
            .find(|r| r.id == request_id)
            .cloned()
            .ok_or_else(|| not_found("Leave request", request_id))
    }

    async fn list_leave_requests_for_employee(
        &self,
        employee_id: Uuid,
    ) -> PortResult<Vec<LeaveRequest>> {
        let store = self.store.read().await;
        Ok(store
            .leave_requests
            .iter()
            .filter(|r| r.employee_id == employee_id)
            .cloned()
            .collect())
    }

    async fn list_leave_requests(
        &self,
        status: Option<LeaveStatus>,
    ) -> PortResult<Vec<LeaveRequest>> {
        let store = self.store.read().await;
        Ok(store
            .leave_requests
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect())
    }

    async fn update_leave_status(
        &self,
        request_id: Uuid,
        status: LeaveStatus,
        decided_by: Option<Uuid>,
        note: Option<String>,
    ) -> PortResult<LeaveRequest> {
        let mut store = self.store.write().await;
        let request = store
            .leave_requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or_else(|| not_found("Leave request", request_id))?;
        if request.status != LeaveStatus::Pending {
            return Err(PortError::Conflict(format!(
                "Leave request is already {}",
                request.status.as_str()
            )));
        }
        request.status = status;
        request.decided_by = decided_by;
        request.decision_note = note;
        Ok(request.clone())
    }

    async fn list_knowledge_entries(&self) -> PortResult<Vec<KnowledgeEntry>> {
        Ok(self.store.read().await.knowledge.clone())
    }

    async fn create_knowledge_entry(&self, title: &str, content: &str) -> PortResult<KnowledgeEntry> {
        let entry = KnowledgeEntry {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            updated_at: Utc::now(),
        };
        self.store.write().await.knowledge.push(entry.clone());
        Ok(entry)
    }

    async fn update_knowledge_entry(
        &self,
        entry_id: Uuid,
        title: &str,
        content: &str,
    ) -> PortResult<KnowledgeEntry> {
        let mut store = self.store.write().await;
        let entry = store
            .knowledge
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| not_found("Knowledge entry", entry_id))?;
        entry.title = title.to_string();
        entry.content = content.to_string();
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn delete_knowledge_entry(&self, entry_id: Uuid) -> PortResult<()> {
        let mut store = self.store.write().await;
        let before = store.knowledge.len();
        store.knowledge.retain(|e| e.id != entry_id);
        if store.knowledge.len() == before {
            return Err(not_found("Knowledge entry", entry_id));
        }
        Ok(())
    }

    async fn record_rate_limit_hit(
        &self,
        key: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> PortResult<u32> {
        let window_secs = window.num_seconds().max(1);
        let window_start = now.timestamp() - now.timestamp().rem_euclid(window_secs);
        let mut store = self.store.write().await;
        let hits = store
            .rate_limits
            .entry((key.to_string(), window_start))
            .or_insert(0);
        *hits += 1;
        Ok(*hits)
    }
}

//=========================================================================================
// Chat double
//=========================================================================================

/// Answers every conversation with a fixed reply and remembers the last prompt.
#[derive(Default)]
pub struct RecordingChat {
    pub last_prompt: Mutex<Option<String>>,
    pub last_turns: Mutex<usize>,
}

#[async_trait]
impl ChatCompletionService for RecordingChat {
    async fn complete(&self, system_prompt: &str, messages: &[ChatMessage]) -> PortResult<String> {
        *self.last_prompt.lock().await = Some(system_prompt.to_string());
        *self.last_turns.lock().await = messages.len();
        Ok("Here is what I found.".to_string())
    }
}

//=========================================================================================
// Test application
//=========================================================================================

pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        log_level: tracing::Level::INFO,
        cors_origin: "http://localhost:3000".to_string(),
        openai_api_key: None,
        openai_api_base: None,
        chat_models: vec!["test-model".to_string()],
        office: None,
        leave_policy: LeavePolicy::default(),
        rate_limit: RateLimitConfig {
            max_requests: 20,
            window_secs: 60,
        },
        session_ttl_days: 30,
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: Arc<MockDb>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(test_config(), None)
    }

    pub fn with_chat(chat: Arc<RecordingChat>) -> Self {
        Self::with(test_config(), Some(chat))
    }

    pub fn with(config: Config, chat: Option<Arc<RecordingChat>>) -> Self {
        let db = Arc::new(MockDb::default());
        let state = Arc::new(AppState {
            db: db.clone(),
            config: Arc::new(config),
            chat_adapter: chat.map(|c| c as Arc<dyn ChatCompletionService>),
        });
        Self {
            router: app_router(state),
            db,
        }
    }

    /// Creates an employee with the given password and a joining date far in the past.
    pub async fn seed_employee(&self, name: &str, role: Role, password: &str) -> Employee {
        let joined_on = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        self.db
            .create_employee(NewEmployee {
                name: name.to_string(),
                email: format!("{}@corp.in", name.to_lowercase()),
                role,
                joined_on,
                hashed_password: hash_secret(password).unwrap(),
            })
            .await
            .unwrap()
    }

    /// A valid `Cookie` header value for the employee, without going through login.
    pub async fn cookie_for(&self, employee: &Employee) -> String {
        let session_id = Uuid::new_v4().to_string();
        self.db
            .create_auth_session(&session_id, employee.id, Utc::now() + Duration::days(1))
            .await
            .unwrap();
        format!("session={}", session_id)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, _, body) = self.request_raw(method, uri, cookie, body, &[]).await;
        (status, body)
    }

    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
        extra_headers: &[(&str, &str)],
    ) -> (StatusCode, axum::http::HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        for (name, value) in extra_headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, headers, json)
    }
}
