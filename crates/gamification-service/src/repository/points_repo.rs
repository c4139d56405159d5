//! 积分仓储
//!
//! users.points 是唯一权威余额，point_ledger 记录每一次非零变动

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use super::traits::PointsRepositoryTrait;
use crate::error::Result;
use crate::models::{BalanceChange, LedgerContext, PointLedgerEntry};

pub struct PointsRepository {
    pool: PgPool,
}

impl PointsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 确保用户存在（用户由认证侧创建，这里仅在缺失时补一条零余额记录）
    pub async fn ensure_user(&self, user_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, points)
            VALUES ($1, 0)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_balance(&self, user_id: &str) -> Result<Option<i64>> {
        let balance = sqlx::query_scalar::<_, i64>("SELECT points FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(balance)
    }

    /// 按时间倒序列出积分流水
    pub async fn list_entries(&self, user_id: &str, limit: i64) -> Result<Vec<PointLedgerEntry>> {
        let entries = sqlx::query_as::<_, PointLedgerEntry>(
            r#"
            SELECT id, user_id, change_type, requested_delta, applied_delta,
                   balance_after, ref_id, remark, created_at
            FROM point_ledger
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    // ==================== 事务操作 ====================

    /// 在事务中读取余额（带行级锁）
    ///
    /// 同一用户的并发余额变动在此串行化
    pub async fn get_balance_for_update(conn: &mut PgConnection, user_id: &str) -> Result<Option<i64>> {
        let balance = sqlx::query_scalar::<_, i64>(
            "SELECT points FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

        Ok(balance)
    }

    /// 在事务中写入新余额，调用方必须已持有行锁
    pub async fn set_balance_in_tx(conn: &mut PgConnection, user_id: &str, balance: i64) -> Result<()> {
        sqlx::query("UPDATE users SET points = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(balance)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// 在事务中条件扣减余额
    ///
    /// 余额不足时不修改任何数据并返回 None
    pub async fn debit_if_sufficient_in_tx(
        conn: &mut PgConnection,
        user_id: &str,
        amount: i64,
    ) -> Result<Option<i64>> {
        let balance = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE users
            SET points = points - $2, updated_at = NOW()
            WHERE id = $1 AND points >= $2
            RETURNING points
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(conn)
        .await?;

        Ok(balance)
    }

    /// 在事务中读取余额（无锁）
    pub async fn get_balance_in_tx(conn: &mut PgConnection, user_id: &str) -> Result<Option<i64>> {
        let balance = sqlx::query_scalar::<_, i64>("SELECT points FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(conn)
            .await?;

        Ok(balance)
    }

    /// 在事务中写入流水
    pub async fn create_entry_in_tx(
        conn: &mut PgConnection,
        user_id: &str,
        change: &BalanceChange,
        ctx: &LedgerContext,
    ) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO point_ledger (user_id, change_type, requested_delta, applied_delta, balance_after, ref_id, remark)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(ctx.change_type)
        .bind(change.requested_delta)
        .bind(change.applied_delta())
        .bind(change.new_balance)
        .bind(&ctx.ref_id)
        .bind(&ctx.remark)
        .fetch_one(conn)
        .await?;

        Ok(id)
    }
}

#[async_trait]
impl PointsRepositoryTrait for PointsRepository {
    async fn get_balance(&self, user_id: &str) -> Result<Option<i64>> {
        self.get_balance(user_id).await
    }

    async fn list_entries(&self, user_id: &str, limit: i64) -> Result<Vec<PointLedgerEntry>> {
        self.list_entries(user_id, limit).await
    }
}
