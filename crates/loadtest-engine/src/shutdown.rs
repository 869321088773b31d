//! 停止信号
//!
//! 调度器通过 `watch::channel(false)` 广播停止，所有虚拟用户共享同一个接收端的克隆。

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

/// 等待停止信号变为 `true`
///
/// 发送端被丢弃时视为永远不会停止，future 保持挂起
pub async fn wait_for(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// 等待 Ctrl+C 或 SIGTERM
pub async fn signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "无法监听 Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "无法监听 SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到 Ctrl+C，停止压测");
        }
        _ = terminate => {
            info!("收到 SIGTERM，停止压测");
        }
    }
}
