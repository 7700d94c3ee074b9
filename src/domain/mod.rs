//! 领域模型模块
//!
//! 纯数据结构，不依赖 axum/tokio

pub mod release;
pub mod version;

// Re-exports for convenience
pub use release::{ReleaseAsset, ReleaseEvent, ReleaseInfo, RepositoryInfo};
pub use version::{ArtifactDescriptor, CloudNetVersion};
