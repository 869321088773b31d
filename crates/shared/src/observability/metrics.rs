//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。
//! 引擎侧只通过 `record_*` 函数写入，从不读取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;
use crate::error::LoadTestError;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
///
/// drop 时终止指标 HTTP 服务任务
pub struct MetricsHandle {
    server_handle: tokio::task::JoinHandle<()>,
}

impl Drop for MetricsHandle {
    fn drop(&mut self) {
        self.server_handle.abort();
    }
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| LoadTestError::Metrics(e.to_string()))?;

    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    describe_metrics();
    metrics::counter!("service_starts_total", "service" => config.service_name.clone())
        .increment(1);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle { server_handle })
}

/// 注册指标描述，这些描述会出现在 /metrics 端点的 HELP 注释中
fn describe_metrics() {
    metrics::describe_counter!(
        "loadtest_requests_total",
        "Total number of scenario requests dispatched"
    );
    metrics::describe_histogram!(
        "loadtest_request_duration_seconds",
        "Scenario request duration in seconds"
    );
    metrics::describe_counter!(
        "loadtest_step_failures_total",
        "Total number of failed scenario steps by reason"
    );
    metrics::describe_counter!("loadtest_cycles_total", "Total number of task cycles");
    metrics::describe_gauge!("loadtest_active_users", "Number of running virtual users");
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 指标记录函数
// ============================================================================

/// 记录一次场景请求
///
/// `status` 为空表示请求未拿到响应（网络错误、超时或被中止）
#[inline]
pub fn record_request(name: &str, method: &str, status: Option<u16>, success: bool, duration_secs: f64) {
    let status_str = status.map_or_else(|| "none".to_string(), |s| s.to_string());
    let result = if success { "success" } else { "failure" };

    metrics::counter!(
        "loadtest_requests_total",
        "name" => name.to_string(),
        "method" => method.to_string(),
        "status" => status_str,
        "result" => result
    )
    .increment(1);

    metrics::histogram!(
        "loadtest_request_duration_seconds",
        "name" => name.to_string(),
        "method" => method.to_string()
    )
    .record(duration_secs);
}

/// 记录步骤失败原因
#[inline]
pub fn record_step_failure(name: &str, reason: &str) {
    metrics::counter!(
        "loadtest_step_failures_total",
        "name" => name.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// 记录一轮任务循环
#[inline]
pub fn record_cycle(aborted: bool) {
    metrics::counter!("loadtest_cycles_total", "aborted" => aborted.to_string()).increment(1);
}

/// 更新运行中的虚拟用户数
#[inline]
pub fn set_active_users(count: usize) {
    metrics::gauge!("loadtest_active_users").set(count as f64);
}
