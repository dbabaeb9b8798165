//! services/api/src/web/knowledge.rs
//!
//! Admin CRUD for the knowledge base the assistant answers from.

use attendance_core::domain::KnowledgeEntry;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct KnowledgeEntryRequest {
    pub title: String,
    pub content: String,
}

impl KnowledgeEntryRequest {
    fn validated(&self) -> Result<(&str, &str), ApiError> {
        let title = self.title.trim();
        let content = self.content.trim();
        if title.is_empty() || content.is_empty() {
            return Err(ApiError::BadRequest(
                "title and content must not be empty".to_string(),
            ));
        }
        Ok((title, content))
    }
}

#[derive(Serialize, ToSchema)]
pub struct KnowledgeEntryResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

impl From<KnowledgeEntry> for KnowledgeEntryResponse {
    fn from(entry: KnowledgeEntry) -> Self {
        Self {
            id: entry.id,
            title: entry.title,
            content: entry.content,
            updated_at: entry.updated_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/admin/knowledge",
    responses((status = 200, description = "All entries", body = [KnowledgeEntryResponse]))
)]
pub async fn list_knowledge_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<KnowledgeEntryResponse>>, ApiError> {
    let entries = state.db.list_knowledge_entries().await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/admin/knowledge",
    request_body = KnowledgeEntryRequest,
    responses(
        (status = 201, description = "Entry created", body = KnowledgeEntryResponse),
        (status = 400, description = "Empty title or content")
    )
)]
pub async fn create_knowledge_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<KnowledgeEntryRequest>,
) -> Result<(StatusCode, Json<KnowledgeEntryResponse>), ApiError> {
    let (title, content) = req.validated()?;
    let entry = state.db.create_knowledge_entry(title, content).await?;
    info!(entry_id = %entry.id, "Knowledge entry created");
    Ok((StatusCode::CREATED, Json(entry.into())))
}

#[utoipa::path(
    put,
    path = "/admin/knowledge/{id}",
    params(("id" = Uuid, Path, description = "Entry id")),
    request_body = KnowledgeEntryRequest,
    responses(
        (status = 200, description = "Entry updated", body = KnowledgeEntryResponse),
        (status = 400, description = "Empty title or content"),
        (status = 404, description = "Unknown entry")
    )
)]
pub async fn update_knowledge_handler(
    State(state): State<Arc<AppState>>,
    Path(entry_id): Path<Uuid>,
    Json(req): Json<KnowledgeEntryRequest>,
) -> Result<Json<KnowledgeEntryResponse>, ApiError> {
    let (title, content) = req.validated()?;
    let entry = state
        .db
        .update_knowledge_entry(entry_id, title, content)
        .await?;
    info!(entry_id = %entry.id, "Knowledge entry updated");
    Ok(Json(entry.into()))
}

#[utoipa::path(
    delete,
    path = "/admin/knowledge/{id}",
    params(("id" = Uuid, Path, description = "Entry id")),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 404, description = "Unknown entry")
    )
)]
pub async fn delete_knowledge_handler(
    State(state): State<Arc<AppState>>,
    Path(entry_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.db.delete_knowledge_entry(entry_id).await?;
    info!(entry_id = %entry_id, "Knowledge entry deleted");
    Ok(StatusCode::NO_CONTENT)
}
