//! API 模块
//!
//! HTTP handlers 和路由组装

pub mod artifacts;
pub mod health;
pub mod versions;
pub mod webhook;

use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// 构建完整的路由
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health & Status
        .merge(health::router())
        // Read-only version API
        .merge(versions::router())
        // Downloads
        .merge(artifacts::router())
        // GitHub webhook
        .merge(webhook::router())
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
