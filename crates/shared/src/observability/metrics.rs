//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 与 `/health` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册业务指标描述
///
/// 这些描述会出现在 /metrics 端点的 HELP 注释中
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!(
        "activity_gradings_total",
        "Total number of activity gradings, labelled initial/regrade"
    );
    metrics::describe_counter!(
        "activity_deletions_total",
        "Total number of reviewed or pending activities deleted by admins"
    );
    metrics::describe_counter!(
        "points_adjustments_total",
        "Total number of non-zero point balance adjustments"
    );
    metrics::describe_counter!("badge_grants_total", "Total number of badges granted");
    metrics::describe_counter!("redemptions_total", "Total number of reward redemptions");
    metrics::describe_histogram!(
        "redemption_duration_seconds",
        "Reward redemption duration in seconds"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
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
// 便捷的指标记录函数
// ============================================================================

/// 记录活动评分，kind 为 initial 或 regrade
#[inline]
pub fn record_grading(kind: &str) {
    metrics::counter!("activity_gradings_total", "kind" => kind.to_string()).increment(1);
}

/// 记录活动删除
#[inline]
pub fn record_activity_deletion() {
    metrics::counter!("activity_deletions_total").increment(1);
}

/// 记录积分变动
#[inline]
pub fn record_points_adjustment(change_type: &str) {
    metrics::counter!(
        "points_adjustments_total",
        "change_type" => change_type.to_string()
    )
    .increment(1);
}

/// 记录徽章授予
#[inline]
pub fn record_badge_grant(badge_code: &str) {
    metrics::counter!("badge_grants_total", "badge_code" => badge_code.to_string()).increment(1);
}

/// 记录兑换
#[inline]
pub fn record_redemption(status: &str, duration_secs: f64) {
    metrics::counter!("redemptions_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("redemption_duration_seconds", "status" => status.to_string())
        .record(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_functions_do_not_panic() {
        // 即使没有初始化 recorder，这些函数也不应该 panic
        record_grading("initial");
        record_activity_deletion();
        record_points_adjustment("GRADE");
        record_badge_grant("FIRST_STEPS");
        record_redemption("success", 0.3);
        assert!(get_handle().is_none());
    }
}
