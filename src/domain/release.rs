//! 上游 release 相关领域模型
//!
//! 字段名与 GitHub REST / webhook payload 保持一致，可直接反序列化

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// release 附带的下载资源
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

/// 触发安装的 release 描述（不持久化）
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReleaseInfo {
    /// release ID
    pub id: u64,
    /// tag 名称，作为版本名
    pub tag_name: String,
    /// 显示名称
    #[serde(default)]
    pub name: Option<String>,
    /// 更新日志
    #[serde(default)]
    pub body: Option<String>,
    /// 目标分支或提交
    #[serde(default)]
    pub target_commitish: Option<String>,
    /// release 页面
    #[serde(default)]
    pub html_url: Option<String>,
    /// 发布时间
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// 资源列表
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

impl ReleaseInfo {
    /// 创建只有 tag 的 release
    #[cfg(test)]
    pub fn with_tag(id: u64, tag_name: impl Into<String>) -> Self {
        Self {
            id,
            tag_name: tag_name.into(),
            name: None,
            body: None,
            target_commitish: None,
            html_url: None,
            published_at: None,
            assets: Vec::new(),
        }
    }
}

/// 仓库信息（webhook payload 中的 repository 字段）
#[derive(Clone, Debug, Deserialize)]
pub struct RepositoryInfo {
    pub full_name: String,
}

/// GitHub `release` 事件
#[derive(Clone, Debug, Deserialize)]
pub struct ReleaseEvent {
    pub action: String,
    pub release: ReleaseInfo,
    pub repository: RepositoryInfo,
}

impl ReleaseEvent {
    /// 是否为 "release published" 事件
    pub fn is_published(&self) -> bool {
        self.action == "published"
    }
}
