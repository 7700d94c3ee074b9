//! 只读 API 开关
//!
//! 提供 `RequireApiEnabled` extractor，`API_ENABLED=false` 时所有 `/api/*` 查询返回 503

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

/// API 开关 Extractor
///
/// ```ignore
/// async fn list_versions(
///     _api: RequireApiEnabled,
///     State(state): State<Arc<AppState>>,
/// ) -> ApiResult<Json<...>> { ... }
/// ```
#[derive(Debug, Clone)]
pub struct RequireApiEnabled;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireApiEnabled {
    type Rejection = ApiError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if state.config.api_enabled {
            Ok(RequireApiEnabled)
        } else {
            Err(ApiError::service_unavailable("The version API is disabled"))
        }
    }
}
