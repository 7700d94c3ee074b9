//! 环境变量配置加载

use std::env;
use std::path::PathBuf;
use tracing::warn;

use crate::config::mapping::ArtifactFileMapping;

/// 环境配置
#[derive(Clone, Debug)]
pub struct EnvConfig {
    /// 服务监听端口
    pub port: u16,
    /// GitHub webhook 共享密钥（未配置时拒绝所有 webhook）
    pub webhook_secret: Option<String>,
    /// GitHub API 地址
    pub github_api_url: String,
    /// GitHub token（可选）
    pub github_token: Option<String>,
    /// Jenkins 地址
    pub jenkins_url: Option<String>,
    /// 归档根目录
    pub archive_dir: PathBuf,
    /// 数据目录（版本库文件、发布端点配置）
    pub data_dir: PathBuf,
    /// 轮询间隔（秒），0 表示禁用
    pub poll_interval_secs: u64,
    /// 是否开放只读 API
    pub api_enabled: bool,
    /// 默认父版本
    pub default_parent: Option<String>,
    /// 全局文件映射
    pub artifact_mappings: Vec<ArtifactFileMapping>,
}

impl EnvConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);

        let webhook_secret = env::var("GITHUB_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty());
        if webhook_secret.is_none() {
            warn!("GITHUB_WEBHOOK_SECRET is not set, all webhook deliveries will be rejected");
        }

        let github_api_url = env::var("GITHUB_API_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| "https://api.github.com".to_string());

        let github_token = env::var("GITHUB_TOKEN").ok().filter(|s| !s.is_empty());

        let jenkins_url = env::var("JENKINS_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|v| v.trim_end_matches('/').to_string());

        let archive_dir = env::var("ARCHIVE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("archive"));

        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let poll_interval_secs = env::var("POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        let api_enabled = env::var("API_ENABLED")
            .ok()
            .map(|v| parse_bool(&v))
            .unwrap_or(true);

        let default_parent = env::var("DEFAULT_PARENT").ok().filter(|s| !s.is_empty());

        let artifact_mappings = env::var("ARTIFACT_MAPPINGS")
            .map(|v| ArtifactFileMapping::parse_mappings(&v))
            .unwrap_or_default();

        Self {
            port,
            webhook_secret,
            github_api_url,
            github_token,
            jenkins_url,
            archive_dir,
            data_dir,
            poll_interval_secs,
            api_enabled,
            default_parent,
            artifact_mappings,
        }
    }

    /// 版本库文件路径
    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join(constants::REGISTRY_FILE_NAME)
    }

    /// 发布端点配置目录
    pub fn publishers_dir(&self) -> PathBuf {
        self.data_dir.join("publishers")
    }
}

fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// 常量
pub mod constants {
    /// 上游 API 请求超时（秒）
    pub const UPSTREAM_TIMEOUT_SECS: u64 = 30;

    /// 制品下载超时（秒）
    pub const DOWNLOAD_TIMEOUT_SECS: u64 = 300;

    /// 发布端点请求超时（秒）
    pub const PUBLISH_TIMEOUT_SECS: u64 = 15;

    /// 版本库文件名
    pub const REGISTRY_FILE_NAME: &str = "versions.json";

    /// 暂存目录名（位于归档根目录下）
    pub const STAGING_DIR_NAME: &str = ".staging";

    /// webhook 请求体上限
    pub const MAX_WEBHOOK_BODY_BYTES: usize = 5 * 1024 * 1024;

    /// 版本号
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    /// 对外 User-Agent
    pub const USER_AGENT: &str = concat!("cloudnet-update-server/", env!("CARGO_PKG_VERSION"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("1"));
        assert!(parse_bool("TRUE"));
        assert!(!parse_bool("no"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn test_derived_paths() {
        let mut config = EnvConfig::from_env();
        config.data_dir = PathBuf::from("/srv/data");
        assert_eq!(config.registry_path(), PathBuf::from("/srv/data/versions.json"));
        assert_eq!(config.publishers_dir(), PathBuf::from("/srv/data/publishers"));
    }
}
