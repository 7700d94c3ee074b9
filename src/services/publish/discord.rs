//! Discord webhook 通知

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;

use super::{check_status, load_or_create_config, PublishEndpoint, PublishError};
use crate::config::env::constants::PUBLISH_TIMEOUT_SECS;
use crate::config::ParentVersion;
use crate::domain::CloudNetVersion;

/// embed 描述长度上限（Discord 限制为 4096）
const MAX_DESCRIPTION_CHARS: usize = 2000;

/// embed 颜色
const EMBED_COLOR: u32 = 0x00_7A_CC;

/// `publishers/discord.json`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Discord webhook 地址，为空时端点禁用
    pub webhook_urls: Vec<String>,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    /// 下载链接前缀，例如 `https://update.example.com`
    pub download_base_url: Option<String>,
}

pub struct DiscordPublisher {
    client: Client,
    config: DiscordConfig,
}

impl DiscordPublisher {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            config: DiscordConfig::default(),
        }
    }

    pub fn with_config(config: DiscordConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// 构造 webhook 消息
    pub fn build_message(&self, parent: &ParentVersion, version: &CloudNetVersion) -> Value {
        let mut fields = vec![json!({ "name": "Parent", "value": parent.name, "inline": true })];

        if let Some(commit) = &version.commit {
            let short: String = commit.chars().take(7).collect();
            fields.push(json!({ "name": "Commit", "value": short, "inline": true }));
        }

        if let Some(base) = &self.config.download_base_url {
            let link = format!(
                "{}/parents/{}/versions/{}/{}",
                base.trim_end_matches('/'),
                parent.name,
                version.name,
                parent.default_file
            );
            fields.push(json!({ "name": "Download", "value": link }));
        }

        let mut embed = json!({
            "title": format!("CloudNet {} released", version.name),
            "color": EMBED_COLOR,
            "fields": fields,
            "timestamp": version.created_at.to_rfc3339(),
        });

        if let Some(changelog) = version.changelog.as_deref().filter(|c| !c.trim().is_empty()) {
            embed["description"] = Value::String(truncate(changelog, MAX_DESCRIPTION_CHARS));
        }
        if let Some(url) = &version.release_url {
            embed["url"] = Value::String(url.clone());
        }

        let mut message = json!({ "embeds": [embed] });
        if let Some(username) = &self.config.username {
            message["username"] = Value::String(username.clone());
        }
        if let Some(avatar_url) = &self.config.avatar_url {
            message["avatar_url"] = Value::String(avatar_url.clone());
        }
        message
    }
}

impl Default for DiscordPublisher {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    truncated.push_str("...");
    truncated
}

#[async_trait]
impl PublishEndpoint for DiscordPublisher {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn initialize(&mut self, config_path: &Path) -> Result<bool, PublishError> {
        let (config, _) = load_or_create_config::<DiscordConfig>(config_path).await?;

        if config.webhook_urls.iter().any(|u| !u.starts_with("http")) {
            return Err(PublishError::Config("webhook_urls must be http(s) URLs".to_string()));
        }

        self.config = config;
        Ok(!self.config.webhook_urls.is_empty())
    }

    async fn publish(&self, parent: &ParentVersion, version: &CloudNetVersion) -> Result<(), PublishError> {
        let message = self.build_message(parent, version);

        // 所有地址都尝试一次，返回第一个错误
        let mut first_error = None;
        for url in &self.config.webhook_urls {
            let result = self
                .client
                .post(url)
                .timeout(Duration::from_secs(PUBLISH_TIMEOUT_SECS))
                .json(&message)
                .send()
                .await;

            let outcome = match result {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{parent, sample_version};

    #[test]
    fn test_build_message() {
        let publisher = DiscordPublisher::with_config(DiscordConfig {
            webhook_urls: vec!["https://discord.com/api/webhooks/1/x".to_string()],
            username: Some("CloudNet".to_string()),
            avatar_url: None,
            download_base_url: Some("https://update.example.com/".to_string()),
        });

        let mut version = sample_version("v3", "3.4.0");
        version.commit = Some("0123456789abcdef".to_string());
        version.changelog = Some("Fixed things".to_string());

        let message = publisher.build_message(&parent("v3"), &version);

        assert_eq!(message["username"], "CloudNet");
        assert!(message.get("avatar_url").is_none());

        let embed = &message["embeds"][0];
        assert_eq!(embed["title"], "CloudNet 3.4.0 released");
        assert_eq!(embed["description"], "Fixed things");

        let fields = embed["fields"].as_array().unwrap();
        assert_eq!(fields[1]["value"], "0123456");
        assert_eq!(
            fields[2]["value"],
            "https://update.example.com/parents/v3/versions/3.4.0/CloudNet.zip"
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
    }

    #[tokio::test]
    async fn test_initialize_rejects_invalid_url() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("discord.json");
        std::fs::write(&path, r#"{"webhook_urls":["ftp://nope"]}"#).unwrap();

        let mut publisher = DiscordPublisher::new();
        assert!(matches!(
            publisher.initialize(&path).await,
            Err(PublishError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_unreachable_reports_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("discord.json");
        std::fs::write(&path, r#"{"webhook_urls":["http://127.0.0.1:9/hook"]}"#).unwrap();

        let mut publisher = DiscordPublisher::new();
        assert!(publisher.initialize(&path).await.unwrap());
        assert!(publisher
            .publish(&parent("v3"), &sample_version("v3", "3.4.0"))
            .await
            .is_err());
    }
}
