//! 按父版本配置的制品来源分派加载器

use async_trait::async_trait;

use super::{GitHubReleaseLoader, JenkinsLoader, LoadedArtifacts, LoaderError, VersionFileLoader};
use crate::config::{ArtifactSource, EnvConfig, ParentVersion};
use crate::domain::ReleaseInfo;
use crate::infra::{GitHubClient, JenkinsClient};

/// 生产环境使用的加载器
pub struct UpstreamLoader {
    releases: GitHubReleaseLoader,
    /// 未配置 JENKINS_URL 时为 None
    jenkins: Option<JenkinsLoader>,
}

impl UpstreamLoader {
    pub fn new(releases: GitHubReleaseLoader, jenkins: Option<JenkinsLoader>) -> Self {
        Self { releases, jenkins }
    }

    /// 根据环境配置创建
    pub fn from_config(config: &EnvConfig) -> Result<Self, reqwest::Error> {
        let github = GitHubClient::new(config.github_api_url.clone(), config.github_token.clone())?;
        let releases = GitHubReleaseLoader::new(github);

        let jenkins = match &config.jenkins_url {
            Some(url) => Some(JenkinsLoader::new(JenkinsClient::new(url.clone())?, releases.clone())),
            None => None,
        };

        Ok(Self::new(releases, jenkins))
    }

    fn loader_for(&self, parent: &ParentVersion) -> Result<&dyn VersionFileLoader, LoaderError> {
        match parent.source {
            ArtifactSource::ReleaseAssets => Ok(&self.releases),
            ArtifactSource::Jenkins { .. } => self
                .jenkins
                .as_ref()
                .map(|j| j as &dyn VersionFileLoader)
                .ok_or_else(|| {
                    LoaderError::UpstreamUnavailable(format!(
                        "parent '{}' uses Jenkins but JENKINS_URL is not configured",
                        parent.name
                    ))
                }),
        }
    }
}

#[async_trait]
impl VersionFileLoader for UpstreamLoader {
    async fn latest_release(&self, parent: &ParentVersion) -> Result<ReleaseInfo, LoaderError> {
        self.loader_for(parent)?.latest_release(parent).await
    }

    async fn fetch(
        &self,
        parent: &ParentVersion,
        release: &ReleaseInfo,
    ) -> Result<LoadedArtifacts, LoaderError> {
        self.loader_for(parent)?.fetch(parent, release).await
    }
}
