//! 通用 HTTP 回调
//!
//! 向配置的地址 POST 一个 JSON 事件

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use super::{check_status, load_or_create_config, PublishEndpoint, PublishError};
use crate::config::env::constants::PUBLISH_TIMEOUT_SECS;
use crate::config::ParentVersion;
use crate::domain::CloudNetVersion;

/// `publishers/webhook.json`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// 回调地址，为空时端点禁用
    pub urls: Vec<String>,
    /// 附加请求头（例如鉴权 token）
    pub headers: HashMap<String, String>,
}

/// 回调负载
#[derive(Debug, Serialize)]
pub struct VersionPublishedEvent<'a> {
    pub event: &'static str,
    pub parent: &'a str,
    pub version: &'a CloudNetVersion,
}

pub struct WebhookPublisher {
    client: Client,
    config: WebhookConfig,
}

impl WebhookPublisher {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            config: WebhookConfig::default(),
        }
    }
}

impl Default for WebhookPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PublishEndpoint for WebhookPublisher {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn initialize(&mut self, config_path: &Path) -> Result<bool, PublishError> {
        let (config, _) = load_or_create_config::<WebhookConfig>(config_path).await?;

        for name in config.headers.keys() {
            if reqwest::header::HeaderName::from_bytes(name.as_bytes()).is_err() {
                return Err(PublishError::Config(format!("invalid header name: {}", name)));
            }
        }

        self.config = config;
        Ok(!self.config.urls.is_empty())
    }

    async fn publish(&self, parent: &ParentVersion, version: &CloudNetVersion) -> Result<(), PublishError> {
        let payload = VersionPublishedEvent {
            event: "version_published",
            parent: &parent.name,
            version,
        };

        let mut first_error = None;
        for url in &self.config.urls {
            let mut request = self
                .client
                .post(url)
                .timeout(Duration::from_secs(PUBLISH_TIMEOUT_SECS))
                .json(&payload);
            for (name, value) in &self.config.headers {
                request = request.header(name.as_str(), value.as_str());
            }

            let outcome = match request.send().await {
                Ok(response) => check_status(url, &response),
                Err(e) => Err(e.into()),
            };
            if let Err(e) = outcome {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
