//! crates/attendance_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::domain::{
    ChatMessage, Employee, EmployeeCredentials, KnowledgeEntry, LeaveRequest, LeaveStatus,
    NewEmployee, NewLeaveRequest, WorkMode, WorkSession,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    Invalid(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Validation run against an employee's existing leave requests before a new one is stored.
pub type LeaveCheck<'a> = &'a (dyn Fn(&[LeaveRequest]) -> PortResult<()> + Send + Sync);

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Employees ---
    async fn create_employee(&self, employee: NewEmployee) -> PortResult<Employee>;

    async fn get_employee_by_id(&self, employee_id: Uuid) -> PortResult<Employee>;

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<EmployeeCredentials>;

    async fn list_employees(&self) -> PortResult<Vec<Employee>>;

    /// Stores (or clears, with `None`) the hashed check-in PIN of an employee.
    async fn set_employee_pin(&self, employee_id: Uuid, pin_hash: Option<&str>) -> PortResult<()>;

    async fn get_employee_pin_hash(&self, employee_id: Uuid) -> PortResult<Option<String>>;

    // --- Auth Sessions ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        employee_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Work Sessions ---
    async fn get_open_work_session(&self, employee_id: Uuid) -> PortResult<Option<WorkSession>>;

    /// Opens a new session. Fails with `Conflict` if one is already open.
    async fn create_work_session(
        &self,
        employee_id: Uuid,
        checkin_at: DateTime<Utc>,
        mode: WorkMode,
    ) -> PortResult<WorkSession>;

    async fn close_work_session(
        &self,
        session_id: Uuid,
        checkout_at: DateTime<Utc>,
    ) -> PortResult<WorkSession>;

    /// Sessions of one employee whose check-in lies in `[from, to)`, oldest first.
    async fn get_work_sessions_in_range(
        &self,
        employee_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PortResult<Vec<WorkSession>>;

    /// Sessions of every employee whose check-in lies in `[from, to)`, oldest first.
    async fn get_all_work_sessions_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PortResult<Vec<WorkSession>>;

    // --- Leave ---
    /// Stores a new request once `check` accepts it against the employee's current
    /// requests. Reading those requests, running `check` and inserting happen
    /// atomically per employee, so concurrent bookings cannot both pass.
    async fn create_leave_request(
        &self,
        request: NewLeaveRequest,
        check: LeaveCheck<'_>,
    ) -> PortResult<LeaveRequest>;

    async fn get_leave_request(&self, request_id: Uuid) -> PortResult<LeaveRequest>;

    async fn list_leave_requests_for_employee(
        &self,
        employee_id: Uuid,
    ) -> PortResult<Vec<LeaveRequest>>;

    async fn list_leave_requests(&self, status: Option<LeaveStatus>)
        -> PortResult<Vec<LeaveRequest>>;

    /// Moves a pending request to `status` atomically. Fails with `Conflict` if the
    /// request is no longer pending.
    async fn update_leave_status(
        &self,
        request_id: Uuid,
        status: LeaveStatus,
        decided_by: Option<Uuid>,
        note: Option<String>,
    ) -> PortResult<LeaveRequest>;

    // --- Knowledge Base ---
    async fn list_knowledge_entries(&self) -> PortResult<Vec<KnowledgeEntry>>;

    async fn create_knowledge_entry(&self, title: &str, content: &str)
        -> PortResult<KnowledgeEntry>;

    async fn update_knowledge_entry(
        &self,
        entry_id: Uuid,
        title: &str,
        content: &str,
    ) -> PortResult<KnowledgeEntry>;

    async fn delete_knowledge_entry(&self, entry_id: Uuid) -> PortResult<()>;

    // --- Rate Limiting ---
    /// Records one hit for `key` in the fixed window containing `now` and returns the
    /// number of hits recorded in that window so far (including this one).
    async fn record_rate_limit_hit(
        &self,
        key: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> PortResult<u32>;
}

#[async_trait]
pub trait ChatCompletionService: Send + Sync {
    /// Produces the assistant's next reply for a conversation.
    async fn complete(&self, system_prompt: &str, messages: &[ChatMessage]) -> PortResult<String>;
}
