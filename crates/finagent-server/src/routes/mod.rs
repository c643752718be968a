//! API routes

use axum::Router;

use crate::AppState;

mod files;
mod query;

/// Build the API router with all endpoints
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(query::router())
        .nest("/files", files::router())
}
