//! 配置模块
//!
//! 环境变量解析与配置管理

pub mod env;
pub mod mapping;
pub mod parent;

pub use env::EnvConfig;
pub use mapping::ArtifactFileMapping;
pub use parent::{load_parents_from_env, ArtifactSource, ParentVersion};
