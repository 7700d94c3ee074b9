//! release 资源加载器（事件模式）
//!
//! 直接下载 release 附带的资源，URL 来自 webhook payload 或 GitHub API

use async_trait::async_trait;
use tracing::{info, warn};

use super::{select_artifacts, LoadedArtifact, LoadedArtifacts, LoaderError, VersionFileLoader};
use crate::config::ParentVersion;
use crate::domain::{ReleaseAsset, ReleaseInfo};
use crate::infra::{GitHubClient, UpstreamError};

/// release 资源加载器
#[derive(Clone)]
pub struct GitHubReleaseLoader {
    github: GitHubClient,
}

impl GitHubReleaseLoader {
    pub fn new(github: GitHubClient) -> Self {
        Self { github }
    }

    /// 查询最新 release（Jenkins 加载器也用它确定版本名）
    pub(crate) async fn resolve_latest(&self, parent: &ParentVersion) -> Result<ReleaseInfo, LoaderError> {
        self.github
            .latest_release(&parent.repository)
            .await
            .map_err(|e| match e {
                UpstreamError::NotFound(_) => LoaderError::ArtifactMissing(format!(
                    "no published release for {}",
                    parent.repository
                )),
                other => LoaderError::UpstreamUnavailable(other.to_string()),
            })
    }
}

#[async_trait]
impl VersionFileLoader for GitHubReleaseLoader {
    async fn latest_release(&self, parent: &ParentVersion) -> Result<ReleaseInfo, LoaderError> {
        self.resolve_latest(parent).await
    }

    async fn fetch(
        &self,
        parent: &ParentVersion,
        release: &ReleaseInfo,
    ) -> Result<LoadedArtifacts, LoaderError> {
        let selected = select_artifacts(&parent.mappings, &release.assets, |a: &ReleaseAsset| {
            (a.name.as_str(), a.name.as_str())
        })?;

        let mut artifacts = Vec::with_capacity(selected.len());
        for (target, asset) in selected {
            let content = self.github.download(&asset.browser_download_url).await?;
            artifacts.push(LoadedArtifact { target, content });
        }

        // 提交哈希只用于记录，解析失败不影响安装
        let commit = match self.github.commit_sha(&parent.repository, &release.tag_name).await {
            Ok(sha) => Some(sha),
            Err(e) => {
                warn!(
                    parent = %parent.name,
                    tag = %release.tag_name,
                    error = %e,
                    "Failed to resolve commit for release"
                );
                None
            }
        };

        info!(
            parent = %parent.name,
            tag = %release.tag_name,
            artifacts = artifacts.len(),
            "Fetched release assets"
        );

        Ok(LoadedArtifacts { commit, artifacts })
    }
}
