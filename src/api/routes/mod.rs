//! API routes module

pub mod chat;

use std::sync::Arc;

use crate::api::state::AppState;
use axum::Router;

type SharedState = Arc<AppState>;

/// Create the combined API router
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        // Chat relay routes
        .merge(chat::router(state))
}
