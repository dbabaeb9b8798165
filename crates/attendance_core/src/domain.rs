//! crates/attendance_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ports::PortError;

//=========================================================================================
// Employees & Authentication
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Employee,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "employee" => Ok(Role::Employee),
            "admin" => Ok(Role::Admin),
            other => Err(PortError::Invalid(format!("Unknown role '{}'", other))),
        }
    }
}

/// An employee as seen by the rest of the application.
#[derive(Debug, Clone)]
pub struct Employee {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub joined_on: NaiveDate,
    pub has_pin: bool,
}

impl Employee {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct EmployeeCredentials {
    pub employee_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// Everything needed to insert a new employee row.
#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub joined_on: NaiveDate,
    pub hashed_password: String,
}

//=========================================================================================
// Attendance
//=========================================================================================

/// Where a check-in happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkMode {
    Office,
    Remote,
}

impl WorkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkMode::Office => "office",
            WorkMode::Remote => "remote",
        }
    }
}

impl fmt::Display for WorkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkMode {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "office" => Ok(WorkMode::Office),
            "remote" => Ok(WorkMode::Remote),
            other => Err(PortError::Invalid(format!("Unknown work mode '{}'", other))),
        }
    }
}

/// One check-in event and its (optional) check-out.
#[derive(Debug, Clone)]
pub struct WorkSession {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub checkin_at: DateTime<Utc>,
    pub checkout_at: Option<DateTime<Utc>>,
    pub mode: WorkMode,
}

impl WorkSession {
    pub fn is_open(&self) -> bool {
        self.checkout_at.is_none()
    }

    /// Hours between check-in and check-out, or `now` while the session is open.
    /// A check-out recorded before the check-in counts as zero.
    pub fn hours_worked(&self, now: DateTime<Utc>) -> f64 {
        let end = self.checkout_at.unwrap_or(now);
        let seconds = (end - self.checkin_at).num_seconds().max(0);
        seconds as f64 / 3600.0
    }
}

//=========================================================================================
// Leave
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveType {
    Annual,
    Sick,
    Unpaid,
}

impl LeaveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveType::Annual => "annual",
            LeaveType::Sick => "sick",
            LeaveType::Unpaid => "unpaid",
        }
    }

    /// Only annual leave is taken out of the accrued balance.
    pub fn draws_on_balance(&self) -> bool {
        matches!(self, LeaveType::Annual)
    }
}

impl FromStr for LeaveType {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "annual" => Ok(LeaveType::Annual),
            "sick" => Ok(LeaveType::Sick),
            "unpaid" => Ok(LeaveType::Unpaid),
            other => Err(PortError::Invalid(format!("Unknown leave type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
            LeaveStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for LeaveStatus {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(LeaveStatus::Pending),
            "approved" => Ok(LeaveStatus::Approved),
            "rejected" => Ok(LeaveStatus::Rejected),
            "cancelled" => Ok(LeaveStatus::Cancelled),
            other => Err(PortError::Invalid(format!("Unknown leave status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LeaveRequest {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: f64,
    pub reason: String,
    pub status: LeaveStatus,
    pub decided_by: Option<Uuid>,
    pub decision_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LeaveRequest {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub employee_id: Uuid,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: f64,
    pub reason: String,
}

//=========================================================================================
// Assistant
//=========================================================================================

/// A single entry of the admin-curated knowledge base fed to the assistant.
#[derive(Debug, Clone)]
pub struct KnowledgeEntry {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of a conversation with the assistant.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}
