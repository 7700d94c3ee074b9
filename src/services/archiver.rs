//! Release 归档器
//!
//! 负责一个版本磁盘目录和版本库记录的 exactly-once 构建：
//! 1. 确定 release 标识并获取制品列表
//! 2. 创建暂存目录
//! 3. 写入所有制品（同时计算校验和）
//! 4. 原子 rename 到 `archive/<parent>/<name>/`
//! 5. 写入版本库
//!
//! 2-5 任一步失败都会清理暂存目录，不会留下版本库记录。
//! 同一父版本的安装由每父版本一把锁串行化，不同父版本可并发

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use crate::config::env::constants::STAGING_DIR_NAME;
use crate::config::ParentVersion;
use crate::domain::{ArtifactDescriptor, CloudNetVersion, ReleaseInfo};
use crate::services::loader::{LoadedArtifacts, LoaderError, VersionFileLoader};
use crate::services::sandbox::is_safe_segment;
use crate::state::registry::{RegistryError, VersionRegistry};

/// 归档错误
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// 版本已注册，无需安装
    #[error("no new release for {parent}: {name} is already registered")]
    NoNewRelease { parent: String, name: String },
    /// 版本名不能作为目录名
    #[error("invalid version name: {0:?}")]
    InvalidVersionName(String),
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    /// 预期内的结果（重复投递、轮询无新版本），不需要告警
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            ArchiveError::NoNewRelease { .. }
                | ArchiveError::Registry(RegistryError::AlreadyExists { .. })
        )
    }
}

/// 每父版本的安装锁
#[derive(Default)]
pub struct InstallLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl InstallLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取父版本的安装锁
    pub async fn acquire(&self, parent: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(parent.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Release 归档器
pub struct ReleaseArchiver {
    archive_root: PathBuf,
    registry: Arc<dyn VersionRegistry>,
    loader: Arc<dyn VersionFileLoader>,
    locks: InstallLocks,
}

impl ReleaseArchiver {
    pub fn new(
        archive_root: impl Into<PathBuf>,
        registry: Arc<dyn VersionRegistry>,
        loader: Arc<dyn VersionFileLoader>,
    ) -> Self {
        Self {
            archive_root: archive_root.into(),
            registry,
            loader,
            locks: InstallLocks::new(),
        }
    }

    /// 版本目录 `archive/<parent>/<name>`
    pub fn version_dir(&self, parent: &str, name: &str) -> PathBuf {
        self.archive_root.join(parent).join(name)
    }

    fn staging_root(&self) -> PathBuf {
        self.archive_root.join(STAGING_DIR_NAME)
    }

    /// 清理上次运行残留的暂存目录
    pub async fn cleanup_staging(&self) -> std::io::Result<()> {
        let staging = self.staging_root();
        match fs::remove_dir_all(&staging).await {
            Ok(()) => {
                info!(path = %staging.display(), "Removed stale staging directory");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        fs::create_dir_all(&staging).await
    }

    /// 安装父版本的最新 release
    ///
    /// `release` 为 None 时通过加载器查询最新 release（轮询模式），
    /// 否则使用外部提供的 release（webhook）
    pub async fn install_latest_release(
        &self,
        parent: &ParentVersion,
        release: Option<ReleaseInfo>,
    ) -> Result<CloudNetVersion, ArchiveError> {
        // Step 1: release 标识
        let release = match release {
            Some(release) => release,
            None => self.loader.latest_release(parent).await?,
        };
        let name = release.tag_name.clone();

        if !is_safe_segment(&name) {
            return Err(ArchiveError::InvalidVersionName(name));
        }
        self.ensure_not_registered(parent, &name).await?;

        // Step 1: 制品列表
        let loaded = self.loader.fetch(parent, &release).await?;

        // Step 2-6 在父版本锁内执行
        let _guard = self.locks.acquire(&parent.name).await;
        self.ensure_not_registered(parent, &name).await?;

        let files = self.stage_and_publish(parent, &name, &loaded).await?;

        let version = CloudNetVersion {
            parent: parent.name.clone(),
            name: name.clone(),
            release_id: Some(release.id),
            commit: loaded.commit,
            release_url: release.html_url,
            changelog: release.body,
            created_at: release.published_at.unwrap_or_else(Utc::now),
            registered_at: Utc::now(),
            files,
        };

        if let Err(e) = self.registry.register(version.clone()).await {
            let final_dir = self.version_dir(&parent.name, &name);
            if let Err(cleanup) = fs::remove_dir_all(&final_dir).await {
                warn!(path = %final_dir.display(), error = %cleanup, "Failed to roll back version directory");
            }
            return Err(e.into());
        }

        info!(
            parent = %parent.name,
            version = %name,
            files = version.files.len(),
            size = version.total_size(),
            "Installed release"
        );
        Ok(version)
    }

    async fn ensure_not_registered(&self, parent: &ParentVersion, name: &str) -> Result<(), ArchiveError> {
        if self.registry.get(&parent.name, name).await?.is_some() {
            return Err(ArchiveError::NoNewRelease {
                parent: parent.name.clone(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// 写入暂存目录并原子移动到最终位置
    async fn stage_and_publish(
        &self,
        parent: &ParentVersion,
        name: &str,
        loaded: &LoadedArtifacts,
    ) -> Result<Vec<ArtifactDescriptor>, ArchiveError> {
        let staging = self
            .staging_root()
            .join(format!("{}-{}-{}", parent.name, name, uuid::Uuid::new_v4()));

        match self.write_staging(&staging, loaded).await {
            Ok(files) => match self.move_into_place(&staging, parent, name).await {
                Ok(()) => Ok(files),
                Err(e) => {
                    discard(&staging).await;
                    Err(e.into())
                }
            },
            Err(e) => {
                discard(&staging).await;
                Err(e.into())
            }
        }
    }

    async fn write_staging(
        &self,
        staging: &Path,
        loaded: &LoadedArtifacts,
    ) -> std::io::Result<Vec<ArtifactDescriptor>> {
        fs::create_dir_all(staging).await?;

        let mut files = Vec::with_capacity(loaded.artifacts.len());
        for artifact in &loaded.artifacts {
            let path = staging.join(&artifact.target);
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir).await?;
            }

            let mut file = fs::File::create(&path).await?;
            file.write_all(&artifact.content).await?;
            file.sync_all().await?;

            files.push(ArtifactDescriptor {
                path: artifact.target.clone(),
                size: artifact.content.len() as u64,
                sha256: sha256_hex(&artifact.content),
            });
        }

        Ok(files)
    }

    async fn move_into_place(&self, staging: &Path, parent: &ParentVersion, name: &str) -> std::io::Result<()> {
        let final_dir = self.version_dir(&parent.name, name);

        // 目录存在但没有版本库记录：上次安装在提交前中断
        if fs::try_exists(&final_dir).await? {
            warn!(
                parent = %parent.name,
                version = %name,
                path = %final_dir.display(),
                "Removing orphaned version directory"
            );
            fs::remove_dir_all(&final_dir).await?;
        }

        fs::create_dir_all(self.archive_root.join(&parent.name)).await?;
        fs::rename(staging, &final_dir).await
    }
}

async fn discard(staging: &Path) {
    if let Err(e) = fs::remove_dir_all(staging).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %staging.display(), error = %e, "Failed to discard staging directory");
        }
    }
}

/// 计算 SHA-256（小写 hex）
pub fn sha256_hex(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}
