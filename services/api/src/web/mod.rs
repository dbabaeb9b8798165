pub mod admin;
pub mod assistant;
pub mod attendance;
pub mod auth;
pub mod knowledge;
pub mod leave;
pub mod middleware;
pub mod rest;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use self::{
    middleware::{rate_limit, require_admin, require_auth},
    state::AppState,
};

/// Builds the full application router. Layers run outside-in, so in the
/// protected groups `require_auth` sees the request before `require_admin`
/// or `rate_limit`.
pub fn app_router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(rest::health_handler))
        .route("/api-docs/openapi.json", get(rest::openapi_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .merge(
            Router::new()
                .route("/auth/login", post(auth::login_handler))
                .layer(axum_middleware::from_fn_with_state(state.clone(), rate_limit)),
        );

    let employee_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route("/attendance/check-in", post(attendance::check_in_handler))
        .route("/attendance/check-out", post(attendance::check_out_handler))
        .route("/attendance/today", get(attendance::today_handler))
        .route("/attendance/history", get(attendance::history_handler))
        .route("/attendance/score", get(attendance::my_score_handler))
        .route(
            "/leave",
            post(leave::create_leave_handler).get(leave::my_leave_handler),
        )
        .route("/leave/{id}/cancel", post(leave::cancel_leave_handler))
        .merge(
            Router::new()
                .route("/assistant/chat", post(assistant::chat_handler))
                .layer(axum_middleware::from_fn_with_state(state.clone(), rate_limit)),
        );

    let admin_routes = Router::new()
        .route(
            "/admin/employees",
            post(admin::create_employee_handler).get(admin::list_employees_handler),
        )
        .route(
            "/admin/employees/{id}/pin",
            put(admin::set_pin_handler).delete(admin::clear_pin_handler),
        )
        .route(
            "/admin/employees/{id}/score",
            get(attendance::employee_score_handler),
        )
        .route("/admin/dashboard", get(admin::dashboard_handler))
        .route("/admin/leave", get(leave::list_leave_handler))
        .route("/admin/leave/{id}/decision", post(leave::decide_leave_handler))
        .route(
            "/admin/knowledge",
            get(knowledge::list_knowledge_handler).post(knowledge::create_knowledge_handler),
        )
        .route(
            "/admin/knowledge/{id}",
            put(knowledge::update_knowledge_handler).delete(knowledge::delete_knowledge_handler),
        )
        .merge(
            Router::new()
                .route("/admin/insights/chat", post(assistant::insights_chat_handler))
                .layer(axum_middleware::from_fn_with_state(state.clone(), rate_limit)),
        )
        .layer(axum_middleware::from_fn(require_admin));

    let protected_routes = Router::new()
        .merge(employee_routes)
        .merge(admin_routes)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
