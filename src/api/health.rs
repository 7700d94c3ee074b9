//! 健康检查
//!
//! 包含 /health, /status 端点

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::config::env::constants::VERSION;
use crate::error::ApiResult;
use crate::state::AppState;

/// 父版本摘要
#[derive(Debug, Serialize)]
struct ParentSummary {
    name: String,
    repository: String,
    source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    latest: Option<String>,
    versions: usize,
}

/// 健康检查响应
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: String,
    started_at: String,
    api_enabled: bool,
    webhook_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    poll_interval_secs: Option<u64>,
    publishers: Vec<&'static str>,
    parents: Vec<ParentSummary>,
}

/// 创建健康检查路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(health_check))
}

/// 健康检查 - 返回状态、版本和每个父版本的最新版本
///
/// GET /health, GET /status
/// 不受 API_ENABLED 影响
async fn health_check(State(state): State<Arc<AppState>>) -> ApiResult<Json<HealthResponse>> {
    let mut parents = Vec::with_capacity(state.parents.len());
    for parent in &state.parents {
        let versions = state.registry.list(&parent.name).await?;
        parents.push(ParentSummary {
            name: parent.name.clone(),
            repository: parent.repository.clone(),
            source: parent.source.name(),
            latest: versions.last().map(|v| v.name.clone()),
            versions: versions.len(),
        });
    }

    let poll_interval_secs = Some(state.config.poll_interval_secs).filter(|s| *s > 0);

    Ok(Json(HealthResponse {
        status: "ok",
        service: "cloudnet-update-server",
        version: VERSION,
        timestamp: chrono::Utc::now().to_rfc3339(),
        started_at: state.started_at.to_rfc3339(),
        api_enabled: state.config.api_enabled,
        webhook_enabled: state.config.webhook_secret.is_some(),
        poll_interval_secs,
        publishers: state.publishers.names(),
        parents,
    }))
}
