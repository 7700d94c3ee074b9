//! 父版本配置
//!
//! 每个父版本对应一条独立版本化的产品线，有自己的上游仓库和归档分区

use std::env;
use tracing::warn;

use super::env::constants::STAGING_DIR_NAME;
use super::mapping::ArtifactFileMapping;
use crate::services::sandbox::is_safe_segment;

/// 默认下载文件
pub const DEFAULT_VERSION_FILE: &str = "CloudNet.zip";

/// 制品来源
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArtifactSource {
    /// Jenkins 任务的最近一次成功构建（轮询模式）
    Jenkins { job: String },
    /// release 自带的资源文件（事件模式）
    ReleaseAssets,
}

impl ArtifactSource {
    pub fn name(&self) -> &'static str {
        match self {
            ArtifactSource::Jenkins { .. } => "jenkins",
            ArtifactSource::ReleaseAssets => "release_assets",
        }
    }
}

/// 父版本
#[derive(Clone, Debug)]
pub struct ParentVersion {
    /// 名称（同时作为归档子目录名）
    pub name: String,
    /// GitHub 仓库 `owner/repo`
    pub repository: String,
    /// 分支过滤（webhook 匹配用）
    pub branch: Option<String>,
    /// 制品来源
    pub source: ArtifactSource,
    /// 文件映射表
    pub mappings: Vec<ArtifactFileMapping>,
    /// `/versions/<v>/` 默认返回的文件
    pub default_file: String,
}

impl ParentVersion {
    /// 判断 webhook 事件是否属于此父版本
    ///
    /// 仓库名不区分大小写；配置了分支时要求 target_commitish 一致
    pub fn matches_event(&self, repository: &str, target_commitish: Option<&str>) -> bool {
        if !self.repository.eq_ignore_ascii_case(repository) {
            return false;
        }
        match &self.branch {
            Some(branch) => target_commitish == Some(branch.as_str()),
            None => true,
        }
    }
}

/// 按环境变量名规则转换：`v3-dev` -> `V3_DEV`
fn env_key(name: &str) -> String {
    name.to_uppercase().replace('-', "_")
}

/// 父版本名同时是归档目录下的子目录名，不能与暂存目录重名
fn is_valid_parent_name(name: &str) -> bool {
    is_safe_segment(name) && name != STAGING_DIR_NAME
}

/// 从环境变量加载父版本
pub fn load_parents_from_env(global_mappings: &[ArtifactFileMapping]) -> Vec<ParentVersion> {
    load_parents(|key| env::var(key).ok(), global_mappings)
}

/// 加载父版本配置
///
/// `PARENTS` 给出有序名称列表，其余字段读取 `PARENT_<NAME>_*`
pub fn load_parents(
    lookup: impl Fn(&str) -> Option<String>,
    global_mappings: &[ArtifactFileMapping],
) -> Vec<ParentVersion> {
    let Some(names) = lookup("PARENTS") else {
        return Vec::new();
    };

    let mut parents: Vec<ParentVersion> = Vec::new();

    for name in names.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !is_valid_parent_name(name) {
            warn!(parent = %name, "Skipping parent with invalid name");
            continue;
        }
        if parents.iter().any(|p| p.name == name) {
            warn!(parent = %name, "Skipping duplicated parent");
            continue;
        }

        let key = env_key(name);
        let var = |suffix: &str| {
            lookup(&format!("PARENT_{}_{}", key, suffix)).filter(|v| !v.trim().is_empty())
        };

        let Some(repository) = var("REPO") else {
            warn!(parent = %name, "Skipping parent without PARENT_{}_REPO", key);
            continue;
        };

        let source = match var("JENKINS_JOB") {
            Some(job) => ArtifactSource::Jenkins { job },
            None => ArtifactSource::ReleaseAssets,
        };

        let mappings = var("MAPPINGS")
            .map(|v| ArtifactFileMapping::parse_mappings(&v))
            .unwrap_or_else(|| global_mappings.to_vec());

        parents.push(ParentVersion {
            name: name.to_string(),
            repository,
            branch: var("BRANCH"),
            source,
            mappings,
            default_file: var("DEFAULT_FILE").unwrap_or_else(|| DEFAULT_VERSION_FILE.to_string()),
        });
    }

    parents
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_parents_in_order() {
        let global = ArtifactFileMapping::parse_mappings("CloudNet.zip:CloudNet.zip");
        let parents = load_parents(
            lookup(&[
                ("PARENTS", "v3, v3-dev"),
                ("PARENT_V3_REPO", "CloudNetService/CloudNet-v3"),
                ("PARENT_V3_JENKINS_JOB", "CloudNet-v3/master"),
                ("PARENT_V3_DEV_REPO", "CloudNetService/CloudNet-v3"),
                ("PARENT_V3_DEV_BRANCH", "development"),
                ("PARENT_V3_DEV_MAPPINGS", "a.jar:a.jar"),
                ("PARENT_V3_DEV_DEFAULT_FILE", "a.jar"),
            ]),
            &global,
        );

        assert_eq!(parents.len(), 2);
        assert_eq!(parents[0].name, "v3");
        assert_eq!(
            parents[0].source,
            ArtifactSource::Jenkins { job: "CloudNet-v3/master".to_string() }
        );
        assert_eq!(parents[0].mappings, global);
        assert_eq!(parents[0].default_file, DEFAULT_VERSION_FILE);

        assert_eq!(parents[1].name, "v3-dev");
        assert_eq!(parents[1].source, ArtifactSource::ReleaseAssets);
        assert_eq!(parents[1].branch.as_deref(), Some("development"));
        assert_eq!(parents[1].mappings[0].source, "a.jar");
        assert_eq!(parents[1].default_file, "a.jar");
    }

    #[test]
    fn test_load_parents_skips_invalid() {
        let parents = load_parents(
            lookup(&[
                ("PARENTS", "norepo,../x,.staging,ok,ok"),
                ("PARENT_OK_REPO", "a/b"),
                ("PARENT_.STAGING_REPO", "a/b"),
            ]),
            &[],
        );
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].name, "ok");
    }

    #[test]
    fn test_load_parents_without_list() {
        assert!(load_parents(lookup(&[]), &[]).is_empty());
    }

    #[test]
    fn test_matches_event() {
        let mut parent = load_parents(
            lookup(&[("PARENTS", "v3"), ("PARENT_V3_REPO", "CloudNetService/CloudNet-v3")]),
            &[],
        )
        .remove(0);

        assert!(parent.matches_event("cloudnetservice/cloudnet-v3", None));
        assert!(!parent.matches_event("other/repo", None));

        parent.branch = Some("master".to_string());
        assert!(parent.matches_event("CloudNetService/CloudNet-v3", Some("master")));
        assert!(!parent.matches_event("CloudNetService/CloudNet-v3", Some("development")));
        assert!(!parent.matches_event("CloudNetService/CloudNet-v3", None));
    }
}
