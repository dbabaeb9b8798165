pub mod domain;
pub mod leave;
pub mod location;
pub mod ports;
pub mod scoring;
pub mod time;

pub use domain::{
    ChatMessage, ChatRole, Employee, EmployeeCredentials, KnowledgeEntry,
    LeaveRequest, LeaveStatus, LeaveType, NewEmployee, NewLeaveRequest, Role, WorkMode,
    WorkSession,
};
pub use ports::{ChatCompletionService, DatabaseService, PortError, PortResult};
pub use scoring::{compute_score, CheckinStatus, DayScore, ScoreResult};
