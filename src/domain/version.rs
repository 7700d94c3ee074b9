//! 已归档版本的领域模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 版本目录中的单个文件描述
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    /// 相对版本目录的路径（使用 `/` 分隔）
    pub path: String,
    /// 文件大小（字节）
    pub size: u64,
    /// SHA-256 校验和（小写 hex）
    pub sha256: String,
}

/// 已安装的版本记录
///
/// 创建后不可变，由 (parent, name) 唯一标识
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CloudNetVersion {
    /// 所属父版本名称
    pub parent: String,
    /// 版本名称（release tag）
    pub name: String,
    /// 上游 release ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_id: Option<u64>,
    /// 构建对应的提交哈希
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    /// release 页面地址
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_url: Option<String>,
    /// 更新日志
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,
    /// 发布时间
    pub created_at: DateTime<Utc>,
    /// 注册到版本库的时间
    pub registered_at: DateTime<Utc>,
    /// 文件列表（按写入顺序）
    pub files: Vec<ArtifactDescriptor>,
}

impl CloudNetVersion {
    /// 按路径查找文件
    pub fn file(&self, path: &str) -> Option<&ArtifactDescriptor> {
        self.files.iter().find(|f| f.path == path)
    }

    /// 所有文件的总大小
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// 是否属于指定父版本
    pub fn belongs_to(&self, parent: &str) -> bool {
        self.parent == parent
    }
}
