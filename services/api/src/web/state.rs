//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::error::ApiError;
use attendance_core::ports::{ChatCompletionService, DatabaseService};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    /// `None` when no AI gateway key is configured.
    pub chat_adapter: Option<Arc<dyn ChatCompletionService>>,
}

impl AppState {
    pub fn chat(&self) -> Result<&Arc<dyn ChatCompletionService>, ApiError> {
        self.chat_adapter
            .as_ref()
            .ok_or_else(|| ApiError::Unavailable("The AI assistant is not configured".to_string()))
    }
}
