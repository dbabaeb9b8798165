//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for login, logout and the current employee, plus the
//! Argon2 helpers shared by passwords and check-in PINs.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use attendance_core::{domain::Employee, ports::PortError};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "session";

//=========================================================================================
// Secret Hashing
//=========================================================================================

/// Hashes a password or PIN with Argon2 and a random salt.
pub fn hash_secret(secret: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash secret: {:?}", e);
            ApiError::Internal("Failed to hash secret".to_string())
        })
}

/// Checks a password or PIN against a stored Argon2 hash.
pub fn verify_secret(secret: &str, stored_hash: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(stored_hash).map_err(|e| {
        error!("Failed to parse stored hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed_hash)
        .is_ok())
}

/// The cookie lifetime and expiry instant for a session issued at `now`.
fn session_lifetime(
    now: DateTime<Utc>,
    ttl_days: i64,
) -> Result<(Duration, DateTime<Utc>), ApiError> {
    Duration::try_days(ttl_days)
        .filter(|ttl| *ttl > Duration::zero())
        .and_then(|ttl| now.checked_add_signed(ttl).map(|expires_at| (ttl, expires_at)))
        .ok_or_else(|| ApiError::Internal(format!("session lifetime of {} days", ttl_days)))
}

/// Pulls the session id out of the `Cookie` header, if any.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|id| !id.is_empty())
}

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub joined_on: NaiveDate,
    pub has_pin: bool,
}

impl From<Employee> for EmployeeResponse {
    fn from(employee: Employee) -> Self {
        Self {
            id: employee.id,
            name: employee.name,
            email: employee.email,
            role: employee.role.as_str().to_string(),
            joined_on: employee.joined_on,
            has_pin: employee.has_pin,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/login - Login with an existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = EmployeeResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many attempts"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Look up the credentials; unknown emails look exactly like wrong passwords.
    let email = req.email.trim().to_lowercase();
    let credentials = match state.db.get_credentials_by_email(&email).await {
        Ok(credentials) => credentials,
        Err(PortError::NotFound(_)) => {
            warn!("Login attempt for unknown email");
            return Err(PortError::Unauthorized.into());
        }
        Err(e) => return Err(e.into()),
    };

    // 2. Verify password
    if !verify_secret(&req.password, &credentials.hashed_password)? {
        warn!(employee_id = %credentials.employee_id, "Login attempt with wrong password");
        return Err(PortError::Unauthorized.into());
    }

    // 3. Create the server-side session
    let auth_session_id = Uuid::new_v4().to_string();
    let (ttl, expires_at) = session_lifetime(Utc::now(), state.config.session_ttl_days)?;
    state
        .db
        .create_auth_session(&auth_session_id, credentials.employee_id, expires_at)
        .await?;

    let employee = state.db.get_employee_by_id(credentials.employee_id).await?;
    info!(employee_id = %employee.id, "Employee logged in");

    // 4. Return response with cookie
    let cookie = format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        auth_session_id,
        ttl.num_seconds()
    );

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(EmployeeResponse::from(employee)),
    ))
}

/// POST /auth/logout - Logout and invalidate the session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let auth_session_id = session_id_from_headers(&headers).ok_or(PortError::Unauthorized)?;

    state.db.delete_auth_session(auth_session_id).await?;

    let cookie = format!(
        "{}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0",
        SESSION_COOKIE
    );
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)]))
}

/// GET /auth/me - The employee behind the current session
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current employee", body = EmployeeResponse),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn me_handler(Extension(employee): Extension<Employee>) -> Json<EmployeeResponse> {
    Json(EmployeeResponse::from(employee))
}
