//! GitHub HTTP Client
//!
//! 查询 release、解析提交哈希、下载 release 资源

use bytes::Bytes;
use reqwest::{header, Client};
use std::time::Duration;
use tracing::{debug, info};

use super::{send_checked, UpstreamError};
use crate::config::env::constants::{DOWNLOAD_TIMEOUT_SECS, UPSTREAM_TIMEOUT_SECS, USER_AGENT};
use crate::domain::ReleaseInfo;

/// GitHub 客户端
///
/// 复用连接池，所有请求带 User-Agent（GitHub API 要求）
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    /// 创建新的 GitHub 客户端
    ///
    /// # Arguments
    /// * `api_url` - API 地址，如 `https://api.github.com`
    /// * `token` - 访问令牌（可选，提高速率限制）
    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(UPSTREAM_TIMEOUT_SECS))
            .pool_max_idle_per_host(5)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// 获取仓库最新 release
    ///
    /// GET /repos/{repo}/releases/latest
    pub async fn latest_release(&self, repository: &str) -> Result<ReleaseInfo, UpstreamError> {
        let url = format!("{}/repos/{}/releases/latest", self.api_url, repository);
        let request = self
            .get(&url)
            .header(header::ACCEPT, "application/vnd.github+json");

        let release: ReleaseInfo = send_checked(request, &url).await?.json().await?;

        info!(
            repository = %repository,
            tag = %release.tag_name,
            assets = release.assets.len(),
            "Resolved latest GitHub release"
        );
        Ok(release)
    }

    /// 解析引用（tag/分支）对应的提交哈希
    ///
    /// GET /repos/{repo}/commits/{ref}，使用 sha 媒体类型直接返回哈希文本
    pub async fn commit_sha(&self, repository: &str, reference: &str) -> Result<String, UpstreamError> {
        let url = format!("{}/repos/{}/commits/{}", self.api_url, repository, reference);
        let request = self
            .get(&url)
            .header(header::ACCEPT, "application/vnd.github.sha");

        let sha = send_checked(request, &url).await?.text().await?;
        Ok(sha.trim().to_string())
    }

    /// 下载 release 资源
    pub async fn download(&self, url: &str) -> Result<Bytes, UpstreamError> {
        let request = self
            .get(url)
            .header(header::ACCEPT, "application/octet-stream")
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS));

        let bytes = send_checked(request, url).await?.bytes().await?;
        debug!(url = %url, size = bytes.len(), "Downloaded release asset");
        Ok(bytes)
    }
}
