//! 只读版本查询 API
//!
//! 包含 /api, /api/parents, /api/versions 以及按父版本查询的端点。
//! 除 `/api` 外全部受 `API_ENABLED` 控制

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::config::ParentVersion;
use crate::domain::CloudNetVersion;
use crate::error::{ApiError, ApiResult};
use crate::middleware::RequireApiEnabled;
use crate::state::AppState;

/// 代表最新版本的选择器
pub const LATEST: &str = "latest";

#[derive(Debug, Serialize)]
struct ApiStatusResponse {
    available: bool,
}

#[derive(Debug, Serialize)]
struct ParentListResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<String>,
    parents: Vec<String>,
}

#[derive(Debug, Serialize)]
struct VersionListResponse {
    parent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    latest: Option<String>,
    versions: Vec<String>,
}

/// 创建版本查询路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api", get(api_status))
        .route("/api/parents", get(list_parents))
        .route("/api/versions", get(list_default_versions))
        .route("/api/versions/:version", get(get_default_version))
        .route("/api/parents/:parent/versions", get(list_versions))
        .route("/api/parents/:parent/versions/:version", get(get_version))
}

/// 按名称查找父版本
pub(crate) fn find_parent<'a>(state: &'a AppState, name: &str) -> ApiResult<&'a ParentVersion> {
    state
        .parent(name)
        .ok_or_else(|| ApiError::not_found(format!("Parent {}", name)))
}

/// 默认父版本
pub(crate) fn default_parent(state: &AppState) -> ApiResult<&ParentVersion> {
    state
        .default_parent()
        .ok_or_else(|| ApiError::not_found("Default parent"))
}

/// 解析版本选择器，`latest` 在每次请求时重新查询
pub(crate) async fn resolve_version(
    state: &AppState,
    parent: &ParentVersion,
    selector: &str,
) -> ApiResult<CloudNetVersion> {
    let found = if selector == LATEST {
        state.registry.latest(&parent.name).await?
    } else {
        state.registry.get(&parent.name, selector).await?
    };

    found.ok_or_else(|| ApiError::not_found(format!("Version {}/{}", parent.name, selector)))
}

async fn version_list(state: &AppState, parent: &ParentVersion) -> ApiResult<VersionListResponse> {
    let versions = state.registry.list(&parent.name).await?;
    Ok(VersionListResponse {
        parent: parent.name.clone(),
        latest: versions.last().map(|v| v.name.clone()),
        versions: versions.into_iter().map(|v| v.name).collect(),
    })
}

/// API 是否开放
///
/// GET /api
async fn api_status(State(state): State<Arc<AppState>>) -> Json<ApiStatusResponse> {
    Json(ApiStatusResponse {
        available: state.config.api_enabled,
    })
}

/// GET /api/parents
async fn list_parents(
    _api: RequireApiEnabled,
    State(state): State<Arc<AppState>>,
) -> Json<ParentListResponse> {
    Json(ParentListResponse {
        default: state.default_parent().map(|p| p.name.clone()),
        parents: state.parents.iter().map(|p| p.name.clone()).collect(),
    })
}

/// GET /api/versions
async fn list_default_versions(
    _api: RequireApiEnabled,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<VersionListResponse>> {
    let parent = default_parent(&state)?;
    Ok(Json(version_list(&state, parent).await?))
}

/// GET /api/versions/:version
async fn get_default_version(
    _api: RequireApiEnabled,
    State(state): State<Arc<AppState>>,
    Path(version): Path<String>,
) -> ApiResult<Json<CloudNetVersion>> {
    let parent = default_parent(&state)?;
    Ok(Json(resolve_version(&state, parent, &version).await?))
}

/// GET /api/parents/:parent/versions
async fn list_versions(
    _api: RequireApiEnabled,
    State(state): State<Arc<AppState>>,
    Path(parent): Path<String>,
) -> ApiResult<Json<VersionListResponse>> {
    let parent = find_parent(&state, &parent)?;
    Ok(Json(version_list(&state, parent).await?))
}

/// GET /api/parents/:parent/versions/:version
async fn get_version(
    _api: RequireApiEnabled,
    State(state): State<Arc<AppState>>,
    Path((parent, version)): Path<(String, String)>,
) -> ApiResult<Json<CloudNetVersion>> {
    let parent = find_parent(&state, &parent)?;
    Ok(Json(resolve_version(&state, parent, &version).await?))
}
