//! Jenkins 加载器（轮询模式）
//!
//! 版本名取自 GitHub 最新 release，文件取自任务最近一次成功构建

use async_trait::async_trait;
use tracing::info;

use super::{
    select_artifacts, GitHubReleaseLoader, LoadedArtifact, LoadedArtifacts, LoaderError,
    VersionFileLoader,
};
use crate::config::{ArtifactSource, ParentVersion};
use crate::domain::ReleaseInfo;
use crate::infra::jenkins::JenkinsArtifact;
use crate::infra::JenkinsClient;

/// Jenkins 加载器
#[derive(Clone)]
pub struct JenkinsLoader {
    jenkins: JenkinsClient,
    releases: GitHubReleaseLoader,
}

impl JenkinsLoader {
    pub fn new(jenkins: JenkinsClient, releases: GitHubReleaseLoader) -> Self {
        Self { jenkins, releases }
    }
}

#[async_trait]
impl VersionFileLoader for JenkinsLoader {
    async fn latest_release(&self, parent: &ParentVersion) -> Result<ReleaseInfo, LoaderError> {
        self.releases.resolve_latest(parent).await
    }

    async fn fetch(
        &self,
        parent: &ParentVersion,
        release: &ReleaseInfo,
    ) -> Result<LoadedArtifacts, LoaderError> {
        let ArtifactSource::Jenkins { job } = &parent.source else {
            return Err(LoaderError::UpstreamUnavailable(format!(
                "parent '{}' has no Jenkins job configured",
                parent.name
            )));
        };

        let build = self.jenkins.last_successful_build(job).await?;

        let selected = select_artifacts(&parent.mappings, &build.artifacts, |a: &JenkinsArtifact| {
            (a.file_name.as_str(), a.relative_path.as_str())
        })?;

        let mut artifacts = Vec::with_capacity(selected.len());
        for (target, artifact) in selected {
            let content = self
                .jenkins
                .download_artifact(job, build.number, &artifact.relative_path)
                .await?;
            artifacts.push(LoadedArtifact { target, content });
        }

        info!(
            parent = %parent.name,
            tag = %release.tag_name,
            job = %job,
            build = build.number,
            artifacts = artifacts.len(),
            "Fetched Jenkins artifacts"
        );

        Ok(LoadedArtifacts {
            commit: build.commit,
            artifacts,
        })
    }
}
