//! 活动仓储
//!
//! 活动记录只由审核流程修改；activity_reviewed 快照只追加

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use super::traits::ActivityRepositoryTrait;
use crate::error::Result;
use crate::models::{
    Activity, ActivityReviewed, ActivityType, NewActivity, PlatformStats, ReviewedStats,
};

/// 按活动类型分组的聚合行
#[derive(Debug, sqlx::FromRow)]
struct TypeAggregate {
    activity_type: ActivityType,
    activity_count: i64,
    total_quantity: f64,
}

pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_activity(&self, id: i64) -> Result<Option<Activity>> {
        let activity = sqlx::query_as::<_, Activity>(
            r#"
            SELECT id, user_id, title, description, activity_type, quantity, status,
                   points, evidence_keys, occurred_at, created_at, updated_at
            FROM activities
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(activity)
    }

    pub async fn list_user_activities(&self, user_id: &str) -> Result<Vec<Activity>> {
        let activities = sqlx::query_as::<_, Activity>(
            r#"
            SELECT id, user_id, title, description, activity_type, quantity, status,
                   points, evidence_keys, occurred_at, created_at, updated_at
            FROM activities
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(activities)
    }

    pub async fn reviewed_stats(&self, user_id: &str) -> Result<ReviewedStats> {
        let rows = sqlx::query_as::<_, TypeAggregate>(
            r#"
            SELECT activity_type,
                   COUNT(*) AS activity_count,
                   COALESCE(SUM(quantity), 0)::DOUBLE PRECISION AS total_quantity
            FROM activities
            WHERE user_id = $1 AND status = 'REVIEWED'
            GROUP BY activity_type
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut stats = ReviewedStats::default();
        for row in rows {
            stats.reviewed_count += row.activity_count;
            stats
                .quantity_by_type
                .insert(row.activity_type, row.total_quantity);
        }

        Ok(stats)
    }

    pub async fn platform_stats(&self) -> Result<PlatformStats> {
        let rows = sqlx::query_as::<_, TypeAggregate>(
            r#"
            SELECT activity_type,
                   COUNT(*) AS activity_count,
                   COALESCE(SUM(quantity), 0)::DOUBLE PRECISION AS total_quantity
            FROM activity_reviewed
            GROUP BY activity_type
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stats = PlatformStats::default();
        for row in rows {
            stats.total_submissions += row.activity_count;
            stats
                .submissions_by_type
                .insert(row.activity_type, row.activity_count);
            stats
                .quantity_by_type
                .insert(row.activity_type, row.total_quantity);
        }

        Ok(stats)
    }

    // ==================== 事务操作 ====================

    /// 在事务中获取活动（带行级锁）
    ///
    /// 同一活动的并发评分、删除在此串行化，后到者读取前者提交后的 points
    pub async fn get_for_update(conn: &mut PgConnection, id: i64) -> Result<Option<Activity>> {
        let activity = sqlx::query_as::<_, Activity>(
            r#"
            SELECT id, user_id, title, description, activity_type, quantity, status,
                   points, evidence_keys, occurred_at, created_at, updated_at
            FROM activities
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(activity)
    }

    /// 在事务中创建待审核活动
    pub async fn create_in_tx(conn: &mut PgConnection, new: &NewActivity) -> Result<Activity> {
        let activity = sqlx::query_as::<_, Activity>(
            r#"
            INSERT INTO activities (user_id, title, description, activity_type, quantity,
                                    status, points, evidence_keys, occurred_at)
            VALUES ($1, $2, $3, $4, $5, 'PENDING_REVIEW', 0, $6, $7)
            RETURNING id, user_id, title, description, activity_type, quantity, status,
                      points, evidence_keys, occurred_at, created_at, updated_at
            "#,
        )
        .bind(&new.user_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.activity_type)
        .bind(new.quantity)
        .bind(&new.evidence_keys)
        .bind(new.occurred_at)
        .fetch_one(conn)
        .await?;

        Ok(activity)
    }

    /// 在事务中追加提交快照
    pub async fn create_snapshot_in_tx(
        conn: &mut PgConnection,
        snapshot: &ActivityReviewed,
    ) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO activity_reviewed (activity_id, user_id, title, activity_type, quantity, occurred_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(snapshot.activity_id)
        .bind(&snapshot.user_id)
        .bind(&snapshot.title)
        .bind(snapshot.activity_type)
        .bind(snapshot.quantity)
        .bind(snapshot.occurred_at)
        .bind(snapshot.created_at)
        .fetch_one(conn)
        .await?;

        Ok(id)
    }

    /// 在事务中整体更新活动
    pub async fn update_in_tx(conn: &mut PgConnection, activity: &Activity) -> Result<Activity> {
        let updated = sqlx::query_as::<_, Activity>(
            r#"
            UPDATE activities
            SET title = $2, description = $3, activity_type = $4, quantity = $5,
                status = $6, points = $7, evidence_keys = $8, occurred_at = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, title, description, activity_type, quantity, status,
                      points, evidence_keys, occurred_at, created_at, updated_at
            "#,
        )
        .bind(activity.id)
        .bind(&activity.title)
        .bind(&activity.description)
        .bind(activity.activity_type)
        .bind(activity.quantity)
        .bind(activity.status)
        .bind(activity.points)
        .bind(&activity.evidence_keys)
        .bind(activity.occurred_at)
        .fetch_one(conn)
        .await?;

        Ok(updated)
    }

    /// 在事务中删除活动，返回是否有记录被删除
    pub async fn delete_in_tx(conn: &mut PgConnection, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM activities WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ActivityRepositoryTrait for ActivityRepository {
    async fn get_activity(&self, id: i64) -> Result<Option<Activity>> {
        self.get_activity(id).await
    }

    async fn list_user_activities(&self, user_id: &str) -> Result<Vec<Activity>> {
        self.list_user_activities(user_id).await
    }

    async fn reviewed_stats(&self, user_id: &str) -> Result<ReviewedStats> {
        self.reviewed_stats(user_id).await
    }

    async fn platform_stats(&self) -> Result<PlatformStats> {
        self.platform_stats().await
    }
}
