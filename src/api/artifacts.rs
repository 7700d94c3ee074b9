//! 制品下载
//!
//! 从归档目录提供文件，所有请求路径都经过沙箱解析，越界返回 403。
//!
//! - `/versions/:version[/*path]`：默认父版本的版本文件
//! - `/docs/:version[/*path]`：默认父版本的文档
//! - `/parents/:parent/{versions|docs}/:version[/*path]`
//!
//! `:version` 可以是 `latest`，每次请求重新解析

use axum::{
    body::Body,
    extract::{Path, Request, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use super::versions::{default_parent, find_parent, resolve_version};
use crate::config::ParentVersion;
use crate::error::{ApiError, ApiResult};
use crate::services::sandbox::resolve_existing;
use crate::state::AppState;

/// 目录请求返回的文件
const INDEX_FILE: &str = "index.html";

/// 版本目录下的文档子目录
const DOCS_DIR: &str = "docs";

/// 下载分区
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtifactKind {
    Versions,
    Docs,
}

impl ArtifactKind {
    pub fn parse(segment: &str) -> Option<Self> {
        match segment {
            "versions" => Some(Self::Versions),
            "docs" => Some(Self::Docs),
            _ => None,
        }
    }

    fn root(self, version_dir: PathBuf) -> PathBuf {
        match self {
            Self::Versions => version_dir,
            Self::Docs => version_dir.join(DOCS_DIR),
        }
    }

    fn default_file(self, parent: &ParentVersion) -> &str {
        match self {
            Self::Versions => &parent.default_file,
            Self::Docs => INDEX_FILE,
        }
    }
}

/// 创建下载路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/versions/:version", get(default_versions_root))
        .route("/versions/:version/*path", get(default_versions_file))
        .route("/docs/:version", get(default_docs_root))
        .route("/docs/:version/*path", get(default_docs_file))
        .route("/parents/:parent/:kind/:version", get(parent_root))
        .route("/parents/:parent/:kind/:version/*path", get(parent_file))
}

/// 解析请求对应的磁盘文件
pub async fn resolve_artifact_path(
    state: &AppState,
    parent: Option<&str>,
    kind: ArtifactKind,
    selector: &str,
    sub_path: &str,
) -> ApiResult<PathBuf> {
    let parent = match parent {
        Some(name) => find_parent(state, name)?,
        None => default_parent(state)?,
    };
    let version = resolve_version(state, parent, selector).await?;
    let root = kind.root(state.archiver.version_dir(&parent.name, &version.name));

    let sub_path = sub_path.trim_matches('/');
    let requested = if sub_path.is_empty() {
        kind.default_file(parent)
    } else {
        sub_path
    };

    let resolved = resolve_existing(&root, requested)?;
    let is_dir = tokio::fs::metadata(&resolved)
        .await
        .map(|m| m.is_dir())
        .map_err(|_| ApiError::not_found(format!("File {}", requested)))?;
    if is_dir {
        return Ok(resolve_existing(&root, &format!("{}/{}", requested, INDEX_FILE))?);
    }
    Ok(resolved)
}

async fn serve(
    state: &AppState,
    parent: Option<&str>,
    kind: ArtifactKind,
    selector: &str,
    sub_path: &str,
    request: Request,
) -> ApiResult<Response> {
    let file = resolve_artifact_path(state, parent, kind, selector, sub_path).await?;

    match ServeFile::new(&file).oneshot(request).await {
        Ok(response) => Ok(response.map(Body::new).into_response()),
        Err(never) => match never {},
    }
}

/// GET /versions/:version
async fn default_versions_root(
    State(state): State<Arc<AppState>>,
    Path(version): Path<String>,
    request: Request,
) -> ApiResult<Response> {
    serve(&state, None, ArtifactKind::Versions, &version, "", request).await
}

/// GET /versions/:version/*path
async fn default_versions_file(
    State(state): State<Arc<AppState>>,
    Path((version, path)): Path<(String, String)>,
    request: Request,
) -> ApiResult<Response> {
    serve(&state, None, ArtifactKind::Versions, &version, &path, request).await
}

/// GET /docs/:version
async fn default_docs_root(
    State(state): State<Arc<AppState>>,
    Path(version): Path<String>,
    request: Request,
) -> ApiResult<Response> {
    serve(&state, None, ArtifactKind::Docs, &version, "", request).await
}

/// GET /docs/:version/*path
async fn default_docs_file(
    State(state): State<Arc<AppState>>,
    Path((version, path)): Path<(String, String)>,
    request: Request,
) -> ApiResult<Response> {
    serve(&state, None, ArtifactKind::Docs, &version, &path, request).await
}

/// GET /parents/:parent/:kind/:version
async fn parent_root(
    State(state): State<Arc<AppState>>,
    Path((parent, kind, version)): Path<(String, String, String)>,
    request: Request,
) -> ApiResult<Response> {
    let kind = ArtifactKind::parse(&kind).ok_or_else(|| ApiError::not_found(format!("Route /parents/{}/{}", parent, kind)))?;
    serve(&state, Some(&parent), kind, &version, "", request).await
}

/// GET /parents/:parent/:kind/:version/*path
async fn parent_file(
    State(state): State<Arc<AppState>>,
    Path((parent, kind, version, path)): Path<(String, String, String, String)>,
    request: Request,
) -> ApiResult<Response> {
    let kind = ArtifactKind::parse(&kind).ok_or_else(|| ApiError::not_found(format!("Route /parents/{}/{}", parent, kind)))?;
    serve(&state, Some(&parent), kind, &version, &path, request).await
}
