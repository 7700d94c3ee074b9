//! 服务层模块
//!
//! 包含核心业务逻辑

pub mod archiver;
pub mod loader;
pub mod poller;
pub mod publish;
pub mod release;
pub mod sandbox;
