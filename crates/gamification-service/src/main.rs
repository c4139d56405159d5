//! 积分玩法服务
//!
//! 装配积分账本、活动审核、徽章评估与奖励兑换服务，并在关闭信号到来前保持运行。

use std::sync::Arc;

use anyhow::Result;
use eco_shared::{config::AppConfig, database::Database, observability};
use tokio::signal;
use tracing::{error, info, warn};

use gamification::{GamificationServices, LocalEvidenceStore, LogNotificationSink, MIGRATOR};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 统一加载配置：从 config/{service_name}.toml 加载，包含可观测性配置
    let config = AppConfig::load("gamification-service").unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    // 2. 从 AppConfig 中提取可观测性配置并注入服务名
    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!("Starting gamification-service...");
    info!(
        environment = %config.environment,
        "Configuration loaded"
    );

    // 3. 初始化数据库连接并执行迁移
    let db = Database::connect(&config.database).await?;
    db.health_check().await?;
    db.run_migrations(&MIGRATOR).await?;
    let pool = db.pool().clone();
    info!("Database connection established");

    // 4. 创建服务
    let evidence_store = Arc::new(LocalEvidenceStore::new(
        &config.gamification.evidence_root,
    ));
    let services = GamificationServices::build(
        pool,
        &config.gamification,
        Arc::new(LogNotificationSink),
        evidence_store,
    )
    .await;

    // 5. 同步徽章目录
    let seeded = services.seed_badge_catalog().await?;
    info!(badges = seeded, "Badge catalog synchronized");

    info!("Services initialized");

    shutdown_signal().await;

    db.close().await;
    info!("Service shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
///
/// 监听 Ctrl+C 和 SIGTERM 信号，用于 Kubernetes 优雅关闭
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}
