//! 基础设施模块
//!
//! 封装外部依赖（GitHub / Jenkins HTTP client）

pub mod github;
pub mod jenkins;

pub use github::GitHubClient;
pub use jenkins::{JenkinsBuild, JenkinsClient};

use reqwest::{RequestBuilder, Response, StatusCode};

/// 上游请求错误
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// 网络错误 / 超时
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// 资源不存在 (404)
    #[error("{0} not found")]
    NotFound(String),
    /// 其它非成功状态码
    #[error("{url} returned {status}")]
    Status { url: String, status: StatusCode },
}

/// 发送请求并检查状态码
pub(crate) async fn send_checked(request: RequestBuilder, url: &str) -> Result<Response, UpstreamError> {
    let response = request.send().await?;
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Err(UpstreamError::NotFound(url.to_string()));
    }
    if !status.is_success() {
        return Err(UpstreamError::Status {
            url: url.to_string(),
            status,
        });
    }

    Ok(response)
}
