//! 运行时状态模块
//!
//! 管理应用状态和版本库

pub mod app_state;
pub mod registry;

pub use app_state::AppState;
pub use registry::{FileVersionRegistry, RegistryError, VersionRegistry};
