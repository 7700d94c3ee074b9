//! 归档目录沙箱
//!
//! 所有来自外部的路径（请求路径、映射目标、版本名）都经过这里校验，
//! 保证解析结果不会逃出给定的根目录

use std::path::{Component, Path, PathBuf};

/// 路径校验错误
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PathError {
    /// 路径试图逃出根目录
    #[error("path escapes the sandbox: {0}")]
    Forbidden(String),
    /// 路径不存在
    #[error("path not found: {0}")]
    NotFound(String),
}

/// 按词法折叠 `.` / `..`，不允许越过相对根
///
/// 绝对路径、Windows 前缀都会被拒绝
pub fn normalize_relative(path: &Path) -> Result<PathBuf, PathError> {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(segment) => out.push(segment),
            Component::ParentDir => {
                if !out.pop() {
                    return Err(PathError::Forbidden(path.display().to_string()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(PathError::Forbidden(path.display().to_string()));
            }
        }
    }

    Ok(out)
}

/// 校验单个目录名（父版本名、版本名）
///
/// 必须是非空的普通路径段，不含分隔符
pub fn is_safe_segment(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// 在 `root` 下解析已存在的文件
///
/// 1. 词法折叠，拒绝越界的 `..`
/// 2. canonicalize，文件不存在返回 `NotFound`
/// 3. 校验最终路径仍位于 canonical 根目录之下（防止符号链接逃逸）
pub fn resolve_existing(root: &Path, relative: &str) -> Result<PathBuf, PathError> {
    let relative = relative.replace('\\', "/");
    let safe = normalize_relative(Path::new(relative.trim_start_matches('/')))?;

    let canonical_root = root
        .canonicalize()
        .map_err(|_| PathError::NotFound(root.display().to_string()))?;

    let canonical = canonical_root
        .join(&safe)
        .canonicalize()
        .map_err(|_| PathError::NotFound(safe.display().to_string()))?;

    if canonical.starts_with(&canonical_root) {
        Ok(canonical)
    } else {
        Err(PathError::Forbidden(safe.display().to_string()))
    }
}

/// 将折叠后的相对路径转为统一的 `/` 分隔字符串（用于记录）
pub fn to_record_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_relative() {
        assert_eq!(
            normalize_relative(Path::new("a/./b/../c.txt")).unwrap(),
            PathBuf::from("a/c.txt")
        );
        assert!(normalize_relative(Path::new("../etc/passwd")).is_err());
        assert!(normalize_relative(Path::new("a/../../b")).is_err());
        assert!(normalize_relative(Path::new("/etc/passwd")).is_err());
    }

    #[test]
    fn test_is_safe_segment() {
        assert!(is_safe_segment("3.4.0-RELEASE"));
        assert!(!is_safe_segment(""));
        assert!(!is_safe_segment(".."));
        assert!(!is_safe_segment("a/b"));
        assert!(!is_safe_segment("a\\b"));
    }

    #[test]
    fn test_resolve_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("v1");
        std::fs::create_dir_all(root.join("docs")).unwrap();
        std::fs::write(root.join("docs/index.html"), "hi").unwrap();
        std::fs::write(tmp.path().join("secret.txt"), "nope").unwrap();

        let resolved = resolve_existing(&root, "docs/index.html").unwrap();
        assert!(resolved.ends_with("docs/index.html"));

        // 前导斜杠视为相对路径
        assert!(resolve_existing(&root, "/docs/index.html").is_ok());

        assert!(matches!(
            resolve_existing(&root, "../secret.txt"),
            Err(PathError::Forbidden(_))
        ));
        assert!(matches!(
            resolve_existing(&root, "docs/../../secret.txt"),
            Err(PathError::Forbidden(_))
        ));
        assert!(matches!(
            resolve_existing(&root, "..\\secret.txt"),
            Err(PathError::Forbidden(_))
        ));
        assert!(matches!(
            resolve_existing(&root, "missing.bin"),
            Err(PathError::NotFound(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_existing_rejects_symlink_escape() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("v1");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(tmp.path().join("secret.txt"), "nope").unwrap();
        std::os::unix::fs::symlink(tmp.path().join("secret.txt"), root.join("link")).unwrap();

        assert!(matches!(
            resolve_existing(&root, "link"),
            Err(PathError::Forbidden(_))
        ));
    }

    #[test]
    fn test_to_record_path() {
        assert_eq!(to_record_path(Path::new("docs/api/index.html")), "docs/api/index.html");
    }
}
