//! 数据库连接管理模块
//!
//! 各服务共用的 PostgreSQL 连接池。迁移脚本由服务通过 `sqlx::migrate!` 内嵌，
//! 启动时依次执行 [`Database::connect`]、[`Database::health_check`]、[`Database::run_migrations`]。

use crate::config::DatabaseConfig;
use crate::error::{Result, SharedError};
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

/// 服务共享的连接池
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 按配置建立连接池
    #[instrument(skip(config), fields(max_connections = config.max_connections))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await?;

        info!(size = pool.size(), "连接池已建立");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 连通性检查，启动时在迁移之前调用
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(SharedError::from)?;
        info!(idle = self.pool.num_idle(), "数据库连通性检查通过");
        Ok(())
    }

    /// 执行服务内嵌的迁移脚本
    #[instrument(skip(self, migrator))]
    pub async fn run_migrations(&self, migrator: &Migrator) -> Result<()> {
        migrator
            .run(&self.pool)
            .await
            .map_err(|e| SharedError::Internal(format!("迁移执行失败: {}", e)))?;
        info!(migrations = migrator.iter().count(), "数据库迁移已执行");
        Ok(())
    }

    /// 等待在途查询结束后关闭连接池
    pub async fn close(&self) {
        self.pool.close().await;
        info!("连接池已关闭");
    }
}
