//! CloudNet Update Server - 版本分发服务
//!
//! 监听上游 release（GitHub webhook 或定时轮询），把构建制品归档为不可变的版本目录，
//! 并通过 HTTP 提供下载和只读查询

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod middleware;
pub mod services;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

use anyhow::Context;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::env::constants::VERSION;
use crate::config::EnvConfig;
use crate::state::AppState;

/// 默认日志过滤（可用 RUST_LOG 覆盖）
const DEFAULT_LOG_FILTER: &str = "info,tower_http=info";

/// 初始化日志
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // 重复初始化（例如测试中）时忽略
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// 启动 HTTP 服务和后台轮询，直到收到关闭信号
pub async fn run_server(config: EnvConfig) -> anyhow::Result<()> {
    let port = config.port;
    let state = Arc::new(AppState::from_config(config).await?);

    info!(
        version = VERSION,
        port = port,
        parents = state.parents.len(),
        archive = %state.config.archive_dir.display(),
        "Starting CloudNet update server"
    );

    let poller = services::poller::start(state.clone());

    let app = api::router(state.clone());
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {}", port))?;
    info!(addr = %listener.local_addr()?, "Listening");

    let shutdown = state.shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = shutdown_signal().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            shutdown.cancel();
        })
        .await
        .context("HTTP server failed")?;

    state.shutdown.cancel();
    if let Some(poller) = poller {
        let _ = poller.await;
    }
    state.publishers.shutdown_all().await;

    info!("Server shutdown complete");
    Ok(())
}

/// 等待 Ctrl+C 或 SIGTERM
async fn shutdown_signal() -> anyhow::Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<anyhow::Result<()>>();

    tokio::select! {
        res = ctrl_c => res?,
        res = terminate => res?,
    }

    info!("Shutdown signal received");
    Ok(())
}
