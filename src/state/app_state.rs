//! 应用状态

use anyhow::Context;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{load_parents_from_env, EnvConfig, ParentVersion};
use crate::services::archiver::ReleaseArchiver;
use crate::services::loader::{UpstreamLoader, VersionFileLoader};
use crate::services::publish::PublisherSet;

use super::registry::{FileVersionRegistry, VersionRegistry};

/// 应用状态
pub struct AppState {
    /// 环境配置
    pub config: EnvConfig,
    /// 父版本（配置顺序，webhook 匹配时第一个命中的生效）
    pub parents: Vec<ParentVersion>,
    /// 服务启动时间
    pub started_at: DateTime<Utc>,

    /// 版本库
    pub registry: Arc<dyn VersionRegistry>,
    /// 归档器
    pub archiver: ReleaseArchiver,
    /// 已启用的发布端点
    pub publishers: PublisherSet,

    /// 关闭信号，后台任务监听它退出
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        config: EnvConfig,
        parents: Vec<ParentVersion>,
        registry: Arc<dyn VersionRegistry>,
        loader: Arc<dyn VersionFileLoader>,
        publishers: PublisherSet,
    ) -> Self {
        let archiver = ReleaseArchiver::new(config.archive_dir.clone(), registry.clone(), loader);

        Self {
            config,
            parents,
            started_at: Utc::now(),
            registry,
            archiver,
            publishers,
            shutdown: CancellationToken::new(),
        }
    }

    /// 按环境配置组装生产状态
    pub async fn from_config(config: EnvConfig) -> anyhow::Result<Self> {
        let parents = load_parents_from_env(&config.artifact_mappings);
        if parents.is_empty() {
            warn!("No parent versions configured, set PARENTS and PARENT_<NAME>_REPO");
        }
        for parent in &parents {
            info!(
                parent = %parent.name,
                repository = %parent.repository,
                source = parent.source.name(),
                mappings = parent.mappings.len(),
                "Loaded parent version"
            );
        }

        let registry_path = config.registry_path();
        let registry = Arc::new(
            FileVersionRegistry::open(&registry_path)
                .await
                .with_context(|| format!("failed to open version registry {}", registry_path.display()))?,
        );

        let loader = Arc::new(UpstreamLoader::from_config(&config).context("failed to create upstream clients")?);

        let publishers = PublisherSet::initialize(PublisherSet::builtin(), &config.publishers_dir()).await;

        let state = Self::new(config, parents, registry, loader, publishers);

        state
            .archiver
            .cleanup_staging()
            .await
            .with_context(|| format!("failed to prepare archive directory {}", state.config.archive_dir.display()))?;

        Ok(state)
    }

    /// 按名称查找父版本
    pub fn parent(&self, name: &str) -> Option<&ParentVersion> {
        self.parents.iter().find(|p| p.name == name)
    }

    /// 默认父版本：DEFAULT_PARENT，未配置时为第一个父版本
    pub fn default_parent(&self) -> Option<&ParentVersion> {
        match &self.config.default_parent {
            Some(name) => self.parent(name),
            None => self.parents.first(),
        }
    }

    /// 按 release 事件匹配父版本，第一个命中的生效
    pub fn match_release(&self, repository: &str, target_commitish: Option<&str>) -> Option<&ParentVersion> {
        self.parents
            .iter()
            .find(|p| p.matches_event(repository, target_commitish))
    }
}
