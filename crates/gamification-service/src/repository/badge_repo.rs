//! 徽章仓储
//!
//! 负责目录落库和用户徽章的追加，不提供任何删除操作

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use super::traits::UserBadgeRepositoryTrait;
use crate::catalog::BadgeCatalog;
use crate::error::Result;
use crate::models::UserBadge;

pub struct BadgeRepository {
    pool: PgPool,
}

impl BadgeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 将静态目录写入 badges 表（幂等 upsert）
    ///
    /// 服务启动时执行一次，返回写入的定义数量
    pub async fn seed_catalog(&self, catalog: &BadgeCatalog) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for def in catalog.definitions() {
            let result = sqlx::query(
                r#"
                INSERT INTO badges (id, code, name, description, criteria_type, criteria_threshold, criteria_activity_type, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
                ON CONFLICT (id) DO UPDATE
                SET code = EXCLUDED.code,
                    name = EXCLUDED.name,
                    description = EXCLUDED.description,
                    criteria_type = EXCLUDED.criteria_type,
                    criteria_threshold = EXCLUDED.criteria_threshold,
                    criteria_activity_type = EXCLUDED.criteria_activity_type,
                    updated_at = NOW()
                "#,
            )
            .bind(def.id)
            .bind(def.code)
            .bind(def.name)
            .bind(def.description)
            .bind(def.criteria.criteria_type())
            .bind(def.criteria.threshold())
            .bind(def.criteria.activity_type())
            .execute(&mut *tx)
            .await?;

            written += result.rows_affected();
        }

        tx.commit().await?;
        info!(count = written, "徽章目录已同步");

        Ok(written)
    }

    pub async fn list_user_badges(&self, user_id: &str) -> Result<Vec<UserBadge>> {
        let badges = sqlx::query_as::<_, UserBadge>(
            r#"
            SELECT user_id, badge_id, obtained_at
            FROM user_badges
            WHERE user_id = $1
            ORDER BY obtained_at, badge_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(badges)
    }

    /// 一次性追加多个徽章，已获得的由主键冲突跳过
    pub async fn grant_badges(&self, user_id: &str, badge_ids: &[i64]) -> Result<Vec<i64>> {
        if badge_ids.is_empty() {
            return Ok(Vec::new());
        }

        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO user_badges (user_id, badge_id, obtained_at)
            SELECT $1, badge_id, NOW()
            FROM UNNEST($2::BIGINT[]) AS t(badge_id)
            ON CONFLICT (user_id, badge_id) DO NOTHING
            RETURNING badge_id
            "#,
        )
        .bind(user_id)
        .bind(badge_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(inserted)
    }
}

#[async_trait]
impl UserBadgeRepositoryTrait for BadgeRepository {
    async fn list_user_badges(&self, user_id: &str) -> Result<Vec<UserBadge>> {
        self.list_user_badges(user_id).await
    }

    async fn grant_badges(&self, user_id: &str, badge_ids: &[i64]) -> Result<Vec<i64>> {
        self.grant_badges(user_id, badge_ids).await
    }
}
