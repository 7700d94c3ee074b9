//! 发布端点
//!
//! 新版本注册成功后依次通知所有启用的端点。单个端点失败只记录日志，
//! 不影响其他端点，也不回滚已完成的安装

pub mod discord;
pub mod webhook;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

use crate::config::ParentVersion;
use crate::domain::CloudNetVersion;

pub use discord::DiscordPublisher;
pub use webhook::WebhookPublisher;

/// 端点发布错误
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// 对端返回非 2xx
    #[error("endpoint {url} rejected the notification with status {status}")]
    Rejected { url: String, status: u16 },
    #[error("invalid endpoint configuration: {0}")]
    Config(String),
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 发布端点
#[async_trait]
pub trait PublishEndpoint: Send + Sync {
    /// 端点名称，同时决定配置文件名 `<name>.json`
    fn name(&self) -> &'static str;

    /// 读取配置，返回端点是否启用
    async fn initialize(&mut self, config_path: &Path) -> Result<bool, PublishError>;

    /// 通知新版本
    async fn publish(&self, parent: &ParentVersion, version: &CloudNetVersion) -> Result<(), PublishError>;

    /// 关闭时释放资源
    async fn shutdown(&self) {}
}

/// 一次扇出的结果
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: usize,
}

/// 已启用的端点集合
#[derive(Default)]
pub struct PublisherSet {
    endpoints: Vec<Box<dyn PublishEndpoint>>,
}

impl PublisherSet {
    /// 不含任何端点
    pub fn empty() -> Self {
        Self::default()
    }

    /// 使用已初始化的端点
    pub fn from_enabled(endpoints: Vec<Box<dyn PublishEndpoint>>) -> Self {
        Self { endpoints }
    }

    /// 内置端点
    pub fn builtin() -> Vec<Box<dyn PublishEndpoint>> {
        vec![
            Box::new(DiscordPublisher::new()),
            Box::new(WebhookPublisher::new()),
        ]
    }

    /// 初始化候选端点，只保留启用的
    pub async fn initialize(candidates: Vec<Box<dyn PublishEndpoint>>, config_dir: &Path) -> Self {
        if let Err(e) = fs::create_dir_all(config_dir).await {
            warn!(path = %config_dir.display(), error = %e, "Failed to create publisher config directory");
        }

        let mut endpoints = Vec::new();
        for mut endpoint in candidates {
            let path = config_dir.join(format!("{}.json", endpoint.name()));
            match endpoint.initialize(&path).await {
                Ok(true) => {
                    info!(publisher = endpoint.name(), "Publisher enabled");
                    endpoints.push(endpoint);
                }
                Ok(false) => {
                    info!(publisher = endpoint.name(), config = %path.display(), "Publisher disabled");
                }
                Err(e) => {
                    warn!(publisher = endpoint.name(), error = %e, "Failed to initialize publisher");
                }
            }
        }

        Self { endpoints }
    }

    /// 启用的端点名称
    pub fn names(&self) -> Vec<&'static str> {
        self.endpoints.iter().map(|e| e.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// 依次通知所有端点
    pub async fn publish_all(&self, parent: &ParentVersion, version: &CloudNetVersion) -> PublishReport {
        let mut report = PublishReport::default();

        for endpoint in &self.endpoints {
            match endpoint.publish(parent, version).await {
                Ok(()) => {
                    report.delivered += 1;
                    info!(
                        publisher = endpoint.name(),
                        parent = %parent.name,
                        version = %version.name,
                        "Published version"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        publisher = endpoint.name(),
                        parent = %parent.name,
                        version = %version.name,
                        error = %e,
                        "Failed to publish version"
                    );
                }
            }
        }

        report
    }

    pub async fn shutdown_all(&self) {
        for endpoint in &self.endpoints {
            endpoint.shutdown().await;
        }
    }
}

/// 读取端点配置，文件不存在时写入默认配置
///
/// 返回 (配置, 是否新建)
pub(crate) async fn load_or_create_config<T>(path: &Path) -> Result<(T, bool), PublishError>
where
    T: Default + Serialize + DeserializeOwned,
{
    match fs::read_to_string(path).await {
        Ok(content) => Ok((serde_json::from_str(&content)?, false)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let config = T::default();
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir).await?;
            }
            fs::write(path, serde_json::to_string_pretty(&config)?).await?;
            Ok((config, true))
        }
        Err(e) => Err(e.into()),
    }
}

/// 检查响应状态
pub(crate) fn check_status(url: &str, response: &reqwest::Response) -> Result<(), PublishError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(PublishError::Rejected {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}
