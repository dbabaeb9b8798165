//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use attendance_core::domain::{
    Employee, EmployeeCredentials, KnowledgeEntry, LeaveRequest, LeaveStatus, NewEmployee,
    NewLeaveRequest, WorkMode, WorkSession,
};
use attendance_core::ports::{DatabaseService, LeaveCheck, PortError, PortResult};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// Error Mapping
//=========================================================================================

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(e: sqlx::Error, what: impl FnOnce() -> String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what()),
        _ => unexpected(e),
    }
}

fn conflict_or_unexpected(e: sqlx::Error, what: impl FnOnce() -> String) -> PortError {
    let unique_violation =
        matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation());
    if unique_violation {
        PortError::Conflict(what())
    } else {
        unexpected(e)
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const EMPLOYEE_COLUMNS: &str =
    "id, name, email, role, joined_on, pin_hash IS NOT NULL AS has_pin";

#[derive(FromRow)]
struct EmployeeRecord {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    joined_on: NaiveDate,
    has_pin: bool,
}
impl EmployeeRecord {
    fn to_domain(self) -> PortResult<Employee> {
        Ok(Employee {
            id: self.id,
            name: self.name,
            email: self.email,
            role: self.role.parse()?,
            joined_on: self.joined_on,
            has_pin: self.has_pin,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    hashed_password: String,
}

const WORK_SESSION_COLUMNS: &str = "id, employee_id, checkin_at, checkout_at, mode";

#[derive(FromRow)]
struct WorkSessionRecord {
    id: Uuid,
    employee_id: Uuid,
    checkin_at: DateTime<Utc>,
    checkout_at: Option<DateTime<Utc>>,
    mode: String,
}
impl WorkSessionRecord {
    fn to_domain(self) -> PortResult<WorkSession> {
        Ok(WorkSession {
            id: self.id,
            employee_id: self.employee_id,
            checkin_at: self.checkin_at,
            checkout_at: self.checkout_at,
            mode: self.mode.parse()?,
        })
    }
}

const LEAVE_COLUMNS: &str = "id, employee_id, leave_type, start_date, end_date, days, reason, \
     status, decided_by, decision_note, created_at";

#[derive(FromRow)]
struct LeaveRequestRecord {
    id: Uuid,
    employee_id: Uuid,
    leave_type: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    days: f64,
    reason: String,
    status: String,
    decided_by: Option<Uuid>,
    decision_note: Option<String>,
    created_at: DateTime<Utc>,
}
impl LeaveRequestRecord {
    fn to_domain(self) -> PortResult<LeaveRequest> {
        Ok(LeaveRequest {
            id: self.id,
            employee_id: self.employee_id,
            leave_type: self.leave_type.parse()?,
            start_date: self.start_date,
            end_date: self.end_date,
            days: self.days,
            reason: self.reason,
            status: self.status.parse()?,
            decided_by: self.decided_by,
            decision_note: self.decision_note,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct KnowledgeRecord {
    id: Uuid,
    title: String,
    content: String,
    updated_at: DateTime<Utc>,
}
impl KnowledgeRecord {
    fn to_domain(self) -> KnowledgeEntry {
        KnowledgeEntry {
            id: self.id,
            title: self.title,
            content: self.content,
            updated_at: self.updated_at,
        }
    }
}

fn collect<R, T>(records: Vec<R>, f: impl Fn(R) -> PortResult<T>) -> PortResult<Vec<T>> {
    records.into_iter().map(f).collect()
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_employee(&self, employee: NewEmployee) -> PortResult<Employee> {
        let email = employee.email.clone();
        let record = sqlx::query_as::<_, EmployeeRecord>(&format!(
            "INSERT INTO employees (id, name, email, role, joined_on, hashed_password) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            EMPLOYEE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(employee.role.as_str())
        .bind(employee.joined_on)
        .bind(&employee.hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_unexpected(e, || format!("Email {} is already registered", email)))?;
        record.to_domain()
    }

    async fn get_employee_by_id(&self, employee_id: Uuid) -> PortResult<Employee> {
        let record = sqlx::query_as::<_, EmployeeRecord>(&format!(
            "SELECT {} FROM employees WHERE id = $1",
            EMPLOYEE_COLUMNS
        ))
        .bind(employee_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, || format!("Employee {} not found", employee_id)))?;
        record.to_domain()
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<EmployeeCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, hashed_password FROM employees WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, || format!("No employee with email {}", email)))?;
        Ok(EmployeeCredentials {
            employee_id: record.id,
            email: record.email,
            hashed_password: record.hashed_password,
        })
    }

    async fn list_employees(&self) -> PortResult<Vec<Employee>> {
        let records = sqlx::query_as::<_, EmployeeRecord>(&format!(
            "SELECT {} FROM employees ORDER BY name ASC",
            EMPLOYEE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        collect(records, EmployeeRecord::to_domain)
    }

    async fn set_employee_pin(&self, employee_id: Uuid, pin_hash: Option<&str>) -> PortResult<()> {
        let result = sqlx::query("UPDATE employees SET pin_hash = $1 WHERE id = $2")
            .bind(pin_hash)
            .bind(employee_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Employee {} not found", employee_id)));
        }
        Ok(())
    }

    async fn get_employee_pin_hash(&self, employee_id: Uuid) -> PortResult<Option<String>> {
        sqlx::query_scalar::<_, Option<String>>("SELECT pin_hash FROM employees WHERE id = $1")
            .bind(employee_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, || format!("Employee {} not found", employee_id)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        employee_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, employee_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(employee_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT employee_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn get_open_work_session(&self, employee_id: Uuid) -> PortResult<Option<WorkSession>> {
        let record = sqlx::query_as::<_, WorkSessionRecord>(&format!(
            "SELECT {} FROM work_sessions WHERE employee_id = $1 AND checkout_at IS NULL",
            WORK_SESSION_COLUMNS
        ))
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record.map(WorkSessionRecord::to_domain).transpose()
    }

    async fn create_work_session(
        &self,
        employee_id: Uuid,
        checkin_at: DateTime<Utc>,
        mode: WorkMode,
    ) -> PortResult<WorkSession> {
        // The partial unique index on open sessions turns a concurrent double
        // check-in into a unique violation.
        let record = sqlx::query_as::<_, WorkSessionRecord>(&format!(
            "INSERT INTO work_sessions (id, employee_id, checkin_at, mode) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            WORK_SESSION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(employee_id)
        .bind(checkin_at)
        .bind(mode.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_unexpected(e, || "Already checked in".to_string()))?;
        record.to_domain()
    }

    async fn close_work_session(
        &self,
        session_id: Uuid,
        checkout_at: DateTime<Utc>,
    ) -> PortResult<WorkSession> {
        let record = sqlx::query_as::<_, WorkSessionRecord>(&format!(
            "UPDATE work_sessions SET checkout_at = $1 \
             WHERE id = $2 AND checkout_at IS NULL RETURNING {}",
            WORK_SESSION_COLUMNS
        ))
        .bind(checkout_at)
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, || format!("Open session {} not found", session_id)))?;
        record.to_domain()
    }

    async fn get_work_sessions_in_range(
        &self,
        employee_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PortResult<Vec<WorkSession>> {
        let records = sqlx::query_as::<_, WorkSessionRecord>(&format!(
            "SELECT {} FROM work_sessions \
             WHERE employee_id = $1 AND checkin_at >= $2 AND checkin_at < $3 \
             ORDER BY checkin_at ASC",
            WORK_SESSION_COLUMNS
        ))
        .bind(employee_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        collect(records, WorkSessionRecord::to_domain)
    }

    async fn get_all_work_sessions_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PortResult<Vec<WorkSession>> {
        let records = sqlx::query_as::<_, WorkSessionRecord>(&format!(
            "SELECT {} FROM work_sessions WHERE checkin_at >= $1 AND checkin_at < $2 \
             ORDER BY checkin_at ASC",
            WORK_SESSION_COLUMNS
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        collect(records, WorkSessionRecord::to_domain)
    }

    async fn create_leave_request(
        &self,
        request: NewLeaveRequest,
        check: LeaveCheck<'_>,
    ) -> PortResult<LeaveRequest> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // Serializes bookings per employee until commit.
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM employees WHERE id = $1 FOR UPDATE")
            .bind(request.employee_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| {
                PortError::NotFound(format!("Employee {} not found", request.employee_id))
            })?;

        let existing = sqlx::query_as::<_, LeaveRequestRecord>(&format!(
            "SELECT {} FROM leave_requests WHERE employee_id = $1",
            LEAVE_COLUMNS
        ))
        .bind(request.employee_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(unexpected)?;
        check(&collect(existing, LeaveRequestRecord::to_domain)?)?;

        let record = sqlx::query_as::<_, LeaveRequestRecord>(&format!(
            "INSERT INTO leave_requests \
             (id, employee_id, leave_type, start_date, end_date, days, reason) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            LEAVE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(request.employee_id)
        .bind(request.leave_type.as_str())
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.days)
        .bind(&request.reason)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        record.to_domain()
    }

    async fn get_leave_request(&self, request_id: Uuid) -> PortResult<LeaveRequest> {
        let record = sqlx::query_as::<_, LeaveRequestRecord>(&format!(
            "SELECT {} FROM leave_requests WHERE id = $1",
            LEAVE_COLUMNS
        ))
        .bind(request_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            not_found_or_unexpected(e, || format!("Leave request {} not found", request_id))
        })?;
        record.to_domain()
    }

    async fn list_leave_requests_for_employee(
        &self,
        employee_id: Uuid,
    ) -> PortResult<Vec<LeaveRequest>> {
        let records = sqlx::query_as::<_, LeaveRequestRecord>(&format!(
            "SELECT {} FROM leave_requests WHERE employee_id = $1 ORDER BY start_date DESC",
            LEAVE_COLUMNS
        ))
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        collect(records, LeaveRequestRecord::to_domain)
    }

    async fn list_leave_requests(
        &self,
        status: Option<LeaveStatus>,
    ) -> PortResult<Vec<LeaveRequest>> {
        let records = sqlx::query_as::<_, LeaveRequestRecord>(&format!(
            "SELECT {} FROM leave_requests WHERE ($1::TEXT IS NULL OR status = $1) \
             ORDER BY created_at ASC",
            LEAVE_COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        collect(records, LeaveRequestRecord::to_domain)
    }

    async fn update_leave_status(
        &self,
        request_id: Uuid,
        status: LeaveStatus,
        decided_by: Option<Uuid>,
        note: Option<String>,
    ) -> PortResult<LeaveRequest> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let current = sqlx::query_scalar::<_, String>(
            "SELECT status FROM leave_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Leave request {} not found", request_id)))?;

        if current.parse::<LeaveStatus>()? != LeaveStatus::Pending {
            return Err(PortError::Conflict(format!(
                "Leave request {} is already {}",
                request_id, current
            )));
        }

        let record = sqlx::query_as::<_, LeaveRequestRecord>(&format!(
            "UPDATE leave_requests SET status = $1, decided_by = $2, decision_note = $3 \
             WHERE id = $4 RETURNING {}",
            LEAVE_COLUMNS
        ))
        .bind(status.as_str())
        .bind(decided_by)
        .bind(note)
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        record.to_domain()
    }

    async fn list_knowledge_entries(&self) -> PortResult<Vec<KnowledgeEntry>> {
        let records = sqlx::query_as::<_, KnowledgeRecord>(
            "SELECT id, title, content, updated_at FROM knowledge_entries ORDER BY title ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_knowledge_entry(
        &self,
        title: &str,
        content: &str,
    ) -> PortResult<KnowledgeEntry> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let record = sqlx::query_as::<_, KnowledgeRecord>(
            "INSERT INTO knowledge_entries (id, title, content) VALUES ($1, $2, $3) \
             RETURNING id, title, content, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(content)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;
        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_knowledge_entry(
        &self,
        entry_id: Uuid,
        title: &str,
        content: &str,
    ) -> PortResult<KnowledgeEntry> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let record = sqlx::query_as::<_, KnowledgeRecord>(
            "UPDATE knowledge_entries SET title = $1, content = $2, updated_at = NOW() \
             WHERE id = $3 RETURNING id, title, content, updated_at",
        )
        .bind(title)
        .bind(content)
        .bind(entry_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            not_found_or_unexpected(e, || format!("Knowledge entry {} not found", entry_id))
        })?;
        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn delete_knowledge_entry(&self, entry_id: Uuid) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let result = sqlx::query("DELETE FROM knowledge_entries WHERE id = $1")
            .bind(entry_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Knowledge entry {} not found",
                entry_id
            )));
        }
        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn record_rate_limit_hit(
        &self,
        key: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> PortResult<u32> {
        let window_secs = window.num_seconds().max(1);
        let start_secs = now.timestamp() - now.timestamp().rem_euclid(window_secs);
        let window_start = DateTime::<Utc>::from_timestamp(start_secs, 0)
            .ok_or_else(|| PortError::Unexpected("Rate limit window out of range".to_string()))?;
        let expires_at = window_start + Duration::seconds(window_secs);

        sqlx::query("DELETE FROM rate_limit_counters WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        let hits = sqlx::query_scalar::<_, i32>(
            "INSERT INTO rate_limit_counters (key, window_start, hits, expires_at) \
             VALUES ($1, $2, 1, $3) \
             ON CONFLICT (key, window_start) \
             DO UPDATE SET hits = rate_limit_counters.hits + 1 \
             RETURNING hits",
        )
        .bind(key)
        .bind(window_start)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(hits.max(0) as u32)
    }
}
