//! 安装并发布
//!
//! webhook、轮询和 CLI 共用的入口：安装成功后扇出到发布端点

use std::sync::Arc;
use tracing::{error, info};

use crate::config::ParentVersion;
use crate::domain::{CloudNetVersion, ReleaseInfo};
use crate::services::archiver::ArchiveError;
use crate::state::AppState;

/// 安装 release 并通知发布端点
///
/// 发布在安装锁释放后进行，端点失败不影响返回值
pub async fn install_and_publish(
    state: &AppState,
    parent: &ParentVersion,
    release: Option<ReleaseInfo>,
) -> Result<CloudNetVersion, ArchiveError> {
    let version = state.archiver.install_latest_release(parent, release).await?;
    state.publishers.publish_all(parent, &version).await;
    Ok(version)
}

/// 后台安装，只记录结果
pub async fn trigger_install(state: Arc<AppState>, parent: ParentVersion, release: Option<ReleaseInfo>) {
    match install_and_publish(&state, &parent, release).await {
        Ok(version) => {
            info!(parent = %parent.name, version = %version.name, "Release installed and published");
        }
        Err(e) if e.is_expected() => {
            info!(parent = %parent.name, "{}", e);
        }
        Err(e) => {
            error!(parent = %parent.name, error = %e, "Release installation failed");
        }
    }
}
