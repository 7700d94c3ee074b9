//! 上游轮询
//!
//! 按固定间隔检查每个父版本的最新 release，有新版本时安装并发布

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::services::release::trigger_install;
use crate::state::AppState;

/// 启动轮询任务，间隔为 0 时不启动
pub fn start(state: Arc<AppState>) -> Option<JoinHandle<()>> {
    let secs = state.config.poll_interval_secs;
    if secs == 0 {
        info!("Upstream polling disabled");
        return None;
    }

    info!(interval_secs = secs, parents = state.parents.len(), "Starting upstream poller");

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = state.shutdown.cancelled() => {
                    info!("Upstream poller stopped");
                    break;
                }
                _ = interval.tick() => {
                    poll_once(&state).await;
                }
            }
        }
    }))
}

/// 检查一次所有父版本
pub async fn poll_once(state: &Arc<AppState>) {
    for parent in &state.parents {
        if state.shutdown.is_cancelled() {
            break;
        }
        debug!(parent = %parent.name, "Polling upstream");
        trigger_install(state.clone(), parent.clone(), None).await;
    }
}
