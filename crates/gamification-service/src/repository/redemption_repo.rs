//! 兑换凭证仓储
//!
//! 凭证创建后不可修改、不可删除

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use super::traits::RedemptionRepositoryTrait;
use crate::error::Result;
use crate::models::{Redemption, RewardSnapshot};

/// 待写入的兑换凭证
#[derive(Debug, Clone)]
pub struct NewRedemption<'a> {
    pub user_id: &'a str,
    pub reward_id: i64,
    pub folio: &'a str,
    pub redeemed_at: DateTime<Utc>,
    pub reward_limit_to_use: DateTime<Utc>,
    pub snapshot: &'a RewardSnapshot,
}

pub struct RedemptionRepository {
    pool: PgPool,
}

impl RedemptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_folio(&self, folio: &str) -> Result<Option<Redemption>> {
        let redemption = sqlx::query_as::<_, Redemption>(
            r#"
            SELECT id, user_id, reward_id, folio, redeemed_at, reward_limit_to_use, reward_snapshot
            FROM redemptions
            WHERE folio = $1
            "#,
        )
        .bind(folio)
        .fetch_optional(&self.pool)
        .await?;

        Ok(redemption)
    }

    pub async fn list_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<Redemption>> {
        let redemptions = sqlx::query_as::<_, Redemption>(
            r#"
            SELECT id, user_id, reward_id, folio, redeemed_at, reward_limit_to_use, reward_snapshot
            FROM redemptions
            WHERE user_id = $1
            ORDER BY redeemed_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(redemptions)
    }

    // ==================== 事务操作 ====================

    /// 在事务中创建兑换凭证
    ///
    /// folio 已被占用时不写入并返回 None，由调用方换一个 folio 重试
    pub async fn create_in_tx(
        conn: &mut PgConnection,
        new: &NewRedemption<'_>,
    ) -> Result<Option<Redemption>> {
        let redemption = sqlx::query_as::<_, Redemption>(
            r#"
            INSERT INTO redemptions (user_id, reward_id, folio, redeemed_at, reward_limit_to_use, reward_snapshot)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (folio) DO NOTHING
            RETURNING id, user_id, reward_id, folio, redeemed_at, reward_limit_to_use, reward_snapshot
            "#,
        )
        .bind(new.user_id)
        .bind(new.reward_id)
        .bind(new.folio)
        .bind(new.redeemed_at)
        .bind(new.reward_limit_to_use)
        .bind(Json(new.snapshot))
        .fetch_optional(conn)
        .await?;

        Ok(redemption)
    }
}

#[async_trait]
impl RedemptionRepositoryTrait for RedemptionRepository {
    async fn get_by_folio(&self, folio: &str) -> Result<Option<Redemption>> {
        self.get_by_folio(folio).await
    }

    async fn list_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<Redemption>> {
        self.list_by_user(user_id, limit).await
    }
}
