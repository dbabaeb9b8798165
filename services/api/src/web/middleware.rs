//! services/api/src/web/middleware.rs
//!
//! Authentication, authorization and rate limiting middleware.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use attendance_core::{domain::Employee, ports::PortError};
use chrono::{Duration, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, warn};

use crate::error::ApiError;
use crate::web::{auth::session_id_from_headers, state::AppState};

/// Middleware that validates the auth session cookie and loads the employee.
///
/// If valid, inserts the `Employee` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_session_id = session_id_from_headers(req.headers())
        .map(str::to_string)
        .ok_or(PortError::Unauthorized)?;

    let employee_id = state
        .db
        .validate_auth_session(&auth_session_id)
        .await
        .map_err(|e| {
            if !matches!(e, PortError::Unauthorized) {
                error!("Failed to validate auth session: {:?}", e);
            }
            PortError::Unauthorized
        })?;

    // A session whose employee has been removed is no session at all.
    let employee = match state.db.get_employee_by_id(employee_id).await {
        Ok(employee) => employee,
        Err(PortError::NotFound(_)) => return Err(PortError::Unauthorized.into()),
        Err(e) => return Err(e.into()),
    };

    req.extensions_mut().insert(employee);
    Ok(next.run(req).await)
}

/// Middleware for admin-only routes. Must run after `require_auth`.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    let employee = req
        .extensions()
        .get::<Employee>()
        .ok_or(PortError::Unauthorized)?;
    if !employee.is_admin() {
        warn!(employee_id = %employee.id, path = %req.uri().path(), "Non-admin hit an admin route");
        return Err(ApiError::Forbidden);
    }
    Ok(next.run(req).await)
}

/// The client address used as the rate limit key: the first `X-Forwarded-For` hop
/// when behind a proxy, otherwise the peer address.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware that counts requests per client and path in the shared store and
/// rejects them with 429 once the window's budget is spent.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = format!("{}|{}", client_ip(req.headers(), peer), req.uri().path());

    let limits = state.config.rate_limit;
    let window = i64::try_from(limits.window_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| {
            ApiError::Internal(format!("rate limit window of {}s", limits.window_secs))
        })?;
    let hits = state
        .db
        .record_rate_limit_hit(&key, window, Utc::now())
        .await?;

    if hits > limits.max_requests {
        warn!(key = %key, hits, "Rate limit exceeded");
        return Err(ApiError::TooManyRequests);
    }
    Ok(next.run(req).await)
}
