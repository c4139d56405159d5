//! 奖励仓储
//!
//! 奖励的增删改由外部管理端负责，这里只提供读取和兑换时的库存扣减

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use super::traits::RewardRepositoryTrait;
use crate::error::Result;
use crate::models::Reward;

pub struct RewardRepository {
    pool: PgPool,
}

impl RewardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_reward(&self, id: i64) -> Result<Option<Reward>> {
        let reward = sqlx::query_as::<_, Reward>(
            r#"
            SELECT id, title, description, category, points_cost, quantity, available,
                   expires_at, created_at, updated_at
            FROM rewards
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reward)
    }

    // ==================== 事务操作 ====================

    /// 在事务中扣减一件库存
    ///
    /// 单条条件 UPDATE 完成扣减与可用状态切换，并持有奖励行锁直到事务结束。
    /// 返回扣减后的完整奖励行，扣分与快照以它为准。
    /// 不限量奖励只校验可用状态。奖励已不可用、已过期或库存为 0 时返回 None。
    pub async fn decrement_stock_in_tx(
        conn: &mut PgConnection,
        reward_id: i64,
    ) -> Result<Option<Reward>> {
        let reward = sqlx::query_as::<_, Reward>(
            r#"
            UPDATE rewards
            SET quantity = CASE WHEN quantity IS NULL THEN NULL ELSE quantity - 1 END,
                available = CASE WHEN quantity IS NULL THEN available ELSE quantity - 1 > 0 END,
                updated_at = NOW()
            WHERE id = $1
              AND available
              AND (quantity IS NULL OR quantity > 0)
              AND (expires_at IS NULL OR expires_at > NOW())
            RETURNING id, title, description, category, points_cost, quantity, available,
                      expires_at, created_at, updated_at
            "#,
        )
        .bind(reward_id)
        .fetch_optional(conn)
        .await?;

        Ok(reward)
    }
}

#[async_trait]
impl RewardRepositoryTrait for RewardRepository {
    async fn get_reward(&self, id: i64) -> Result<Option<Reward>> {
        self.get_reward(id).await
    }
}
