//! 版本库
//!
//! 只追加的已安装版本账本：按 (parent, name) 唯一，"最新" 永远是最后注册的版本

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::info;

use crate::domain::CloudNetVersion;

/// 版本库错误
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// (parent, name) 已注册
    #[error("version {parent}/{name} is already registered")]
    AlreadyExists { parent: String, name: String },
    /// 存储读写失败
    #[error("registry I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// 存储内容无法解析
    #[error("registry serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 版本库接口
///
/// 实现必须线性一致：`register` 返回后，`latest` 必须能看到新版本
#[async_trait]
pub trait VersionRegistry: Send + Sync {
    /// 注册版本，(parent, name) 已存在时返回 `AlreadyExists`
    async fn register(&self, version: CloudNetVersion) -> Result<(), RegistryError>;

    /// 父版本最近注册的版本
    async fn latest(&self, parent: &str) -> Result<Option<CloudNetVersion>, RegistryError>;

    /// 按名称查找
    async fn get(&self, parent: &str, name: &str) -> Result<Option<CloudNetVersion>, RegistryError>;

    /// 父版本的所有版本（注册顺序）
    async fn list(&self, parent: &str) -> Result<Vec<CloudNetVersion>, RegistryError>;

    /// 所有版本（注册顺序）
    async fn list_all(&self) -> Result<Vec<CloudNetVersion>, RegistryError>;
}

/// 持久化格式
#[derive(Debug, Serialize, Deserialize)]
struct PersistedRegistry {
    /// 格式版本号
    version: u32,
    saved_at: DateTime<Utc>,
    versions: Vec<CloudNetVersion>,
}

/// 基于 JSON 文件的版本库
///
/// 每次注册都在写锁内原子重写整个文件（临时文件 + rename）
pub struct FileVersionRegistry {
    path: PathBuf,
    versions: RwLock<Vec<CloudNetVersion>>,
}

impl FileVersionRegistry {
    /// 打开版本库，文件不存在时创建空库
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();

        let versions = match fs::read_to_string(&path).await {
            Ok(content) => {
                let persisted: PersistedRegistry = serde_json::from_str(&content)?;
                info!(
                    path = %path.display(),
                    versions = persisted.versions.len(),
                    saved_at = %persisted.saved_at,
                    "Loaded version registry"
                );
                persisted.versions
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Creating empty version registry");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            versions: RwLock::new(versions),
        })
    }

    /// 存储文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 原子写入
    async fn save(&self, versions: &[CloudNetVersion]) -> Result<(), RegistryError> {
        let temp_path = self.path.with_extension("json.tmp");

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(&PersistedRegistry {
            version: 1,
            saved_at: Utc::now(),
            versions: versions.to_vec(),
        })?;

        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl VersionRegistry for FileVersionRegistry {
    async fn register(&self, version: CloudNetVersion) -> Result<(), RegistryError> {
        let mut versions = self.versions.write().await;

        if versions
            .iter()
            .any(|v| v.parent == version.parent && v.name == version.name)
        {
            return Err(RegistryError::AlreadyExists {
                parent: version.parent,
                name: version.name,
            });
        }

        versions.push(version);

        if let Err(e) = self.save(&versions).await {
            // 写入失败回滚内存中的追加
            versions.pop();
            return Err(e);
        }

        if let Some(v) = versions.last() {
            info!(
                parent = %v.parent,
                version = %v.name,
                files = v.files.len(),
                "Registered version"
            );
        }
        Ok(())
    }

    async fn latest(&self, parent: &str) -> Result<Option<CloudNetVersion>, RegistryError> {
        let versions = self.versions.read().await;
        Ok(versions.iter().rev().find(|v| v.belongs_to(parent)).cloned())
    }

    async fn get(&self, parent: &str, name: &str) -> Result<Option<CloudNetVersion>, RegistryError> {
        let versions = self.versions.read().await;
        Ok(versions
            .iter()
            .find(|v| v.belongs_to(parent) && v.name == name)
            .cloned())
    }

    async fn list(&self, parent: &str) -> Result<Vec<CloudNetVersion>, RegistryError> {
        let versions = self.versions.read().await;
        Ok(versions.iter().filter(|v| v.belongs_to(parent)).cloned().collect())
    }

    async fn list_all(&self) -> Result<Vec<CloudNetVersion>, RegistryError> {
        Ok(self.versions.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(parent: &str, name: &str) -> CloudNetVersion {
        CloudNetVersion {
            parent: parent.to_string(),
            name: name.to_string(),
            release_id: None,
            commit: None,
            release_url: None,
            changelog: None,
            created_at: Utc::now(),
            registered_at: Utc::now(),
            files: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = FileVersionRegistry::open(tmp.path().join("versions.json"))
            .await
            .unwrap();

        assert!(registry.latest("P").await.unwrap().is_none());

        registry.register(version("P", "v1.0")).await.unwrap();
        registry.register(version("Q", "v9.0")).await.unwrap();

        let found = registry.get("P", "v1.0").await.unwrap().unwrap();
        assert_eq!(found.name, "v1.0");
        assert!(registry.get("Q", "v1.0").await.unwrap().is_none());
        assert_eq!(registry.latest("P").await.unwrap().unwrap().name, "v1.0");
        assert_eq!(registry.list("P").await.unwrap().len(), 1);
        assert_eq!(registry.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_register_duplicate_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = FileVersionRegistry::open(tmp.path().join("versions.json"))
            .await
            .unwrap();

        registry.register(version("P", "v1.0")).await.unwrap();
        let err = registry.register(version("P", "v1.0")).await.unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyExists { .. }));
        assert_eq!(registry.list_all().await.unwrap().len(), 1);

        // 同名不同父版本互不影响
        registry.register(version("Q", "v1.0")).await.unwrap();
    }

    #[tokio::test]
    async fn test_latest_follows_registration_order() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = FileVersionRegistry::open(tmp.path().join("versions.json"))
            .await
            .unwrap();

        // 注册顺序与名称排序、发布时间都无关
        for name in ["v2.0", "v1.0", "v1.5"] {
            registry.register(version("P", name)).await.unwrap();
            assert_eq!(registry.latest("P").await.unwrap().unwrap().name, name);
        }
    }

    #[tokio::test]
    async fn test_reopen_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("data").join("versions.json");

        {
            let registry = FileVersionRegistry::open(&path).await.unwrap();
            registry.register(version("P", "v1.0")).await.unwrap();
            registry.register(version("P", "v1.1")).await.unwrap();
        }

        let reopened = FileVersionRegistry::open(&path).await.unwrap();
        assert_eq!(reopened.latest("P").await.unwrap().unwrap().name, "v1.1");
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(reopened.path(), path.as_path());
    }

    #[tokio::test]
    async fn test_open_corrupt_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("versions.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            FileVersionRegistry::open(&path).await,
            Err(RegistryError::Serialization(_))
        ));
    }
}
