//! Jenkins HTTP Client
//!
//! 查询任务最近一次成功构建并下载其制品

use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{send_checked, UpstreamError};
use crate::config::env::constants::{DOWNLOAD_TIMEOUT_SECS, UPSTREAM_TIMEOUT_SECS, USER_AGENT};

/// 构建制品
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JenkinsArtifact {
    pub file_name: String,
    pub relative_path: String,
}

#[derive(Debug, Deserialize)]
struct Revision {
    #[serde(rename = "SHA1")]
    sha1: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildAction {
    #[serde(default)]
    last_built_revision: Option<Revision>,
}

#[derive(Debug, Deserialize)]
struct BuildResponse {
    number: u64,
    #[serde(default)]
    artifacts: Vec<JenkinsArtifact>,
    #[serde(default)]
    actions: Vec<Option<BuildAction>>,
}

/// 一次成功构建
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JenkinsBuild {
    pub number: u64,
    pub artifacts: Vec<JenkinsArtifact>,
    /// git 插件记录的提交哈希
    pub commit: Option<String>,
}

impl From<BuildResponse> for JenkinsBuild {
    fn from(response: BuildResponse) -> Self {
        let commit = response
            .actions
            .into_iter()
            .flatten()
            .find_map(|a| a.last_built_revision.map(|r| r.sha1));

        Self {
            number: response.number,
            artifacts: response.artifacts,
            commit,
        }
    }
}

/// Jenkins 客户端
#[derive(Clone)]
pub struct JenkinsClient {
    client: Client,
    base_url: String,
}

impl JenkinsClient {
    /// 创建新的 Jenkins 客户端
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(UPSTREAM_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// 任务路径：`folder/job` -> `job/folder/job/job`
    fn job_url(&self, job: &str) -> String {
        let path = job
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| format!("job/{}", s))
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}", self.base_url, path)
    }

    /// 获取最近一次成功构建
    pub async fn last_successful_build(&self, job: &str) -> Result<JenkinsBuild, UpstreamError> {
        let url = format!(
            "{}/lastSuccessfulBuild/api/json?tree=number,artifacts[fileName,relativePath],actions[lastBuiltRevision[SHA1]]",
            self.job_url(job)
        );

        let response: BuildResponse = send_checked(self.client.get(&url), &url).await?.json().await?;
        let build = JenkinsBuild::from(response);

        info!(
            job = %job,
            build = build.number,
            artifacts = build.artifacts.len(),
            commit = ?build.commit,
            "Resolved last successful Jenkins build"
        );
        Ok(build)
    }

    /// 下载指定构建的制品
    pub async fn download_artifact(
        &self,
        job: &str,
        build_number: u64,
        relative_path: &str,
    ) -> Result<Bytes, UpstreamError> {
        let url = format!("{}/{}/artifact/{}", self.job_url(job), build_number, relative_path);
        let request = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS));

        let bytes = send_checked(request, &url).await?.bytes().await?;
        debug!(url = %url, size = bytes.len(), "Downloaded Jenkins artifact");
        Ok(bytes)
    }
}
