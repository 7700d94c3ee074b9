//! 版本文件加载器
//!
//! 从上游（Jenkins 构建或 GitHub release 资源）获取某个父版本的构建制品，
//! 并按映射表选择、重命名

pub mod github;
pub mod jenkins;
pub mod upstream;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::{ArtifactFileMapping, ParentVersion};
use crate::domain::ReleaseInfo;
use crate::infra::UpstreamError;
use crate::services::sandbox::{normalize_relative, to_record_path};

pub use github::GitHubReleaseLoader;
pub use jenkins::JenkinsLoader;
pub use upstream::UpstreamLoader;

/// 加载错误
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// 上游不可达或返回错误
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    /// 期望的制品不存在
    #[error("artifact missing: {0}")]
    ArtifactMissing(String),
}

impl From<UpstreamError> for LoaderError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::NotFound(url) => LoaderError::ArtifactMissing(url),
            other => LoaderError::UpstreamUnavailable(other.to_string()),
        }
    }
}

/// 映射后的制品
#[derive(Clone, Debug)]
pub struct LoadedArtifact {
    /// 归档中的相对路径
    pub target: String,
    /// 文件内容
    pub content: Bytes,
}

/// 一次加载的结果
#[derive(Clone, Debug, Default)]
pub struct LoadedArtifacts {
    /// 构建对应的提交哈希（如果上游提供）
    pub commit: Option<String>,
    /// 按映射顺序排列的制品
    pub artifacts: Vec<LoadedArtifact>,
}

/// 版本文件加载器
///
/// 轮询模式和事件模式共用同一接口：轮询时先 `latest_release` 再 `fetch`，
/// 事件模式直接使用 webhook 提供的 release 调用 `fetch`
#[async_trait]
pub trait VersionFileLoader: Send + Sync {
    /// 查询父版本当前最新的 release
    async fn latest_release(&self, parent: &ParentVersion) -> Result<ReleaseInfo, LoaderError>;

    /// 获取 release 的制品（已应用映射，未映射的制品被丢弃）
    async fn fetch(
        &self,
        parent: &ParentVersion,
        release: &ReleaseInfo,
    ) -> Result<LoadedArtifacts, LoaderError>;
}

/// 按映射表从候选制品中选择
///
/// - 映射表为空时保留所有制品，目标为其文件名
/// - 否则按映射顺序输出，必选映射找不到来源时返回 `ArtifactMissing`
/// - 结果为空同样视为 `ArtifactMissing`
///
/// `key` 返回候选的 (文件名, 相对路径)
pub fn select_artifacts<T, F>(
    mappings: &[ArtifactFileMapping],
    candidates: &[T],
    key: F,
) -> Result<Vec<(String, T)>, LoaderError>
where
    T: Clone,
    F: Fn(&T) -> (&str, &str),
{
    let mut selected: Vec<(String, T)> = Vec::new();

    if mappings.is_empty() {
        for candidate in candidates {
            let (file_name, _) = key(candidate);
            let Ok(target) = normalize_relative(std::path::Path::new(file_name)) else {
                tracing::warn!(file = %file_name, "Dropping artifact with unsafe name");
                continue;
            };
            let target = to_record_path(&target);
            if target.is_empty() || selected.iter().any(|(t, _)| *t == target) {
                continue;
            }
            selected.push((target, candidate.clone()));
        }
    } else {
        for mapping in mappings {
            let found = candidates.iter().find(|&c| {
                let (file_name, relative_path) = key(c);
                mapping.matches(file_name, relative_path)
            });

            match found {
                Some(candidate) => {
                    if selected.iter().any(|(t, _)| *t == mapping.target) {
                        continue;
                    }
                    selected.push((mapping.target.clone(), candidate.clone()));
                }
                None if mapping.optional => {
                    tracing::debug!(source = %mapping.source, "Optional artifact not present upstream");
                }
                None => return Err(LoaderError::ArtifactMissing(mapping.source.clone())),
            }
        }
    }

    if selected.is_empty() {
        return Err(LoaderError::ArtifactMissing(
            "no artifact matched the mapping table".to_string(),
        ));
    }

    Ok(selected)
}
