//! 制品文件映射
//!
//! 将上游制品的文件名/相对路径翻译为归档目录中的规范文件名

use std::path::Path;

use tracing::warn;

use crate::services::sandbox::{normalize_relative, to_record_path};

/// 单条映射规则
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactFileMapping {
    /// 上游文件名或相对路径（精确匹配）
    pub source: String,
    /// 归档中的目标路径（已折叠的相对路径）
    pub target: String,
    /// 可选映射：上游缺失时不报错
    pub optional: bool,
}

impl ArtifactFileMapping {
    /// 创建映射，目标路径非法时返回 None
    pub fn new(source: impl Into<String>, target: &str, optional: bool) -> Option<Self> {
        let target = normalize_relative(Path::new(target)).ok()?;
        if target.as_os_str().is_empty() {
            return None;
        }
        Some(Self {
            source: source.into(),
            target: to_record_path(&target),
            optional,
        })
    }

    /// 解析映射字符串
    ///
    /// 格式: `source:target[,source:target...]`，`?` 前缀表示可选
    /// 例如: `CloudNet.zip:CloudNet.zip,?docs.zip:docs/docs.zip`
    pub fn parse_mappings(mappings_str: &str) -> Vec<Self> {
        mappings_str
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| {
                let (optional, rule) = match s.strip_prefix('?') {
                    Some(rest) => (true, rest),
                    None => (false, s),
                };
                let parsed = rule
                    .split_once(':')
                    .filter(|(source, _)| !source.is_empty())
                    .and_then(|(source, target)| Self::new(source, target, optional));
                if parsed.is_none() {
                    warn!(rule = %s, "Ignoring invalid artifact mapping");
                }
                parsed
            })
            .collect()
    }

    /// 判断上游制品是否匹配此规则
    pub fn matches(&self, file_name: &str, relative_path: &str) -> bool {
        self.source == file_name || self.source == relative_path
    }
}
