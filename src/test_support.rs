//! 测试辅助：模拟加载器、记录型发布端点和临时状态

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::parent::DEFAULT_VERSION_FILE;
use crate::config::{ArtifactSource, EnvConfig, ParentVersion};
use crate::domain::{CloudNetVersion, ReleaseInfo};
use crate::services::loader::{select_artifacts, LoadedArtifact, LoadedArtifacts, LoaderError, VersionFileLoader};
use crate::services::publish::{PublishEndpoint, PublishError, PublisherSet};
use crate::state::registry::FileVersionRegistry;
use crate::state::AppState;

pub const TEST_SECRET: &str = "It's a Secret to Everybody";

pub fn parent(name: &str) -> ParentVersion {
    ParentVersion {
        name: name.to_string(),
        repository: format!("CloudNetService/{}", name),
        branch: None,
        source: ArtifactSource::ReleaseAssets,
        mappings: Vec::new(),
        default_file: DEFAULT_VERSION_FILE.to_string(),
    }
}

pub fn sample_version(parent: &str, name: &str) -> CloudNetVersion {
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

pub fn test_config(root: &Path) -> EnvConfig {
    EnvConfig {
        port: 0,
        webhook_secret: Some(TEST_SECRET.to_string()),
        github_api_url: "http://127.0.0.1:9".to_string(),
        github_token: None,
        jenkins_url: None,
        archive_dir: root.join("archive"),
        data_dir: root.join("data"),
        poll_interval_secs: 0,
        api_enabled: true,
        default_parent: None,
        artifact_mappings: Vec::new(),
    }
}

/// 模拟加载器：返回固定的文件，文件名即目标路径
pub struct MockLoader {
    latest: Option<ReleaseInfo>,
    files: Vec<(String, Bytes)>,
    fail: bool,
    delay: Duration,
    fetches: AtomicUsize,
}

impl MockLoader {
    pub fn new(files: &[(&str, &[u8])]) -> Self {
        Self {
            latest: None,
            files: files
                .iter()
                .map(|(name, content)| (name.to_string(), Bytes::copy_from_slice(content)))
                .collect(),
            fail: false,
            delay: Duration::ZERO,
            fetches: AtomicUsize::new(0),
        }
    }

    /// 所有调用都返回 `UpstreamUnavailable`
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(&[])
        }
    }

    pub fn with_latest(mut self, release: ReleaseInfo) -> Self {
        self.latest = Some(release);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VersionFileLoader for MockLoader {
    async fn latest_release(&self, _parent: &ParentVersion) -> Result<ReleaseInfo, LoaderError> {
        if self.fail {
            return Err(LoaderError::UpstreamUnavailable("mock upstream down".to_string()));
        }
        self.latest
            .clone()
            .ok_or_else(|| LoaderError::ArtifactMissing("no release".to_string()))
    }

    async fn fetch(&self, parent: &ParentVersion, _release: &ReleaseInfo) -> Result<LoadedArtifacts, LoaderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(LoaderError::UpstreamUnavailable("mock upstream down".to_string()));
        }

        let selected = select_artifacts(&parent.mappings, &self.files, |f: &(String, Bytes)| {
            (f.0.as_str(), f.0.as_str())
        })?;

        Ok(LoadedArtifacts {
            commit: Some("0123456789abcdef".to_string()),
            artifacts: selected
                .into_iter()
                .map(|(target, (_, content))| LoadedArtifact { target, content })
                .collect(),
        })
    }
}

/// 记录收到的通知
pub struct RecordingEndpoint {
    name: &'static str,
    enabled: bool,
    fail: bool,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingEndpoint {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            enabled: true,
            fail: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(name: &'static str) -> Self {
        Self {
            fail: true,
            ..Self::new(name)
        }
    }

    pub fn disabled(name: &'static str) -> Self {
        Self {
            enabled: false,
            ..Self::new(name)
        }
    }
}

#[async_trait]
impl PublishEndpoint for RecordingEndpoint {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn initialize(&mut self, _config_path: &Path) -> Result<bool, PublishError> {
        Ok(self.enabled)
    }

    async fn publish(&self, parent: &ParentVersion, version: &CloudNetVersion) -> Result<(), PublishError> {
        self.calls
            .lock()
            .await
            .push(format!("{}/{}", parent.name, version.name));
        if self.fail {
            return Err(PublishError::Config("mock failure".to_string()));
        }
        Ok(())
    }
}

/// 基于临时目录的完整状态
pub async fn test_state(
    root: &Path,
    loader: Arc<MockLoader>,
    publishers: PublisherSet,
    parents: Vec<ParentVersion>,
) -> Arc<AppState> {
    test_state_with_config(test_config(root), loader, publishers, parents).await
}

pub async fn test_state_with_config(
    config: EnvConfig,
    loader: Arc<MockLoader>,
    publishers: PublisherSet,
    parents: Vec<ParentVersion>,
) -> Arc<AppState> {
    let registry = Arc::new(FileVersionRegistry::open(config.registry_path()).await.unwrap());
    let state = AppState::new(config, parents, registry, loader, publishers);
    state.archiver.cleanup_staging().await.unwrap();
    Arc::new(state)
}

/// 在归档目录中直接放置一个已注册版本
pub async fn seed_version(state: &AppState, parent: &str, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
    let dir = state.archiver.version_dir(parent, name);
    for (path, content) in files {
        let path = dir.join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
    state.registry.register(sample_version(parent, name)).await.unwrap();
    dir
}

/// 轮询等待异步条件成立（最多约 2 秒）
pub async fn eventually<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// 生成 `X-Hub-Signature-256` 头
pub fn sign(secret: &str, body: &[u8]) -> String {
    use hmac::{Hmac, Mac};
    let mut mac = Hmac::<sha2::Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
