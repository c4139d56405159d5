//! 积分账本服务
//!
//! 用户余额的唯一修改入口。所有变动遵循下限截断策略：
//! `new_balance = max(0, current + delta)`，账本永远不会出现负余额。
//! 兑换等消费场景使用条件扣减 [`PointsLedger::debit_in_tx`]，余额不足直接失败。
//!
//! 事务内变动以关联函数提供，由评分、删除、兑换流程在各自事务中调用；
//! 同一用户的并发变动通过 users 行锁串行化。

use std::sync::Arc;

use sqlx::{PgConnection, PgPool};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use validator::Validate;

use eco_shared::observability::metrics as app_metrics;

use crate::error::{LedgerError, Result};
use crate::models::{BalanceChange, ChangeType, LedgerContext, PointLedgerEntry};
use crate::repository::{PointsRepository, PointsRepositoryTrait};
use crate::service::badge_evaluator::BadgeEvaluator;
use crate::service::dto::ManualAdjustRequest;

/// 默认的流水查询条数上限
const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// 积分账本
pub struct PointsLedger {
    pool: PgPool,
    points_repo: Arc<dyn PointsRepositoryTrait>,
    history_limit: i64,
    /// 徽章评估器（延迟注入，手动调整后触发重新评估）
    badge_evaluator: RwLock<Option<Arc<BadgeEvaluator>>>,
}

impl PointsLedger {
    pub fn new(pool: PgPool, points_repo: Arc<dyn PointsRepositoryTrait>) -> Self {
        Self {
            pool,
            points_repo,
            history_limit: DEFAULT_HISTORY_LIMIT,
            badge_evaluator: RwLock::new(None),
        }
    }

    pub fn with_history_limit(mut self, limit: i64) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    /// 设置徽章评估器
    pub async fn set_badge_evaluator(&self, evaluator: Arc<BadgeEvaluator>) {
        let mut guard = self.badge_evaluator.write().await;
        *guard = Some(evaluator);
        info!("PointsLedger 徽章评估器已设置");
    }

    /// 查询用户余额
    #[instrument(skip(self))]
    pub async fn balance(&self, user_id: &str) -> Result<i64> {
        self.points_repo
            .get_balance(user_id)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(user_id.to_string()))
    }

    /// 查询积分流水，按时间倒序，条数不超过配置上限
    ///
    /// 用户不存在时返回 `UserNotFound`，而不是空列表
    #[instrument(skip(self))]
    pub async fn history(&self, user_id: &str, limit: i64) -> Result<Vec<PointLedgerEntry>> {
        if self.points_repo.get_balance(user_id).await?.is_none() {
            return Err(LedgerError::UserNotFound(user_id.to_string()));
        }
        let limit = limit.clamp(1, self.history_limit);
        self.points_repo.list_entries(user_id, limit).await
    }

    /// 调整余额（独立事务）
    #[instrument(skip(self, ctx))]
    pub async fn adjust_balance(
        &self,
        user_id: &str,
        delta: i64,
        ctx: LedgerContext,
    ) -> Result<BalanceChange> {
        let mut tx = self.pool.begin().await?;
        let change = Self::adjust_balance_in_tx(&mut tx, user_id, delta, &ctx).await?;
        tx.commit().await?;

        if !change.is_noop() {
            app_metrics::record_points_adjustment(ctx.change_type.as_str());
        }

        Ok(change)
    }

    /// 运营手动调整积分
    ///
    /// 调整提交后触发徽章重新评估，评估失败不影响调整结果
    #[instrument(skip(self, request), fields(user_id = %request.user_id, delta = request.delta))]
    pub async fn manual_adjust(&self, request: ManualAdjustRequest) -> Result<BalanceChange> {
        request.validate()?;
        if request.delta == 0 {
            return Err(LedgerError::Validation("el ajuste no puede ser 0".to_string()));
        }

        let ctx = LedgerContext::new(ChangeType::ManualAdjustment).with_remark(&request.reason);
        let change = self
            .adjust_balance(&request.user_id, request.delta, ctx)
            .await?;

        info!(
            user_id = %request.user_id,
            requested_delta = request.delta,
            applied_delta = change.applied_delta(),
            new_balance = change.new_balance,
            "积分手动调整完成"
        );

        let evaluator = self.badge_evaluator.read().await.clone();
        match evaluator {
            Some(evaluator) => {
                evaluator.reevaluate_best_effort(&request.user_id).await;
            }
            None => warn!(user_id = %request.user_id, "未设置徽章评估器，跳过评估"),
        }

        Ok(change)
    }

    // ==================== 事务操作 ====================

    /// 在事务中调整余额（下限截断）
    ///
    /// 锁定用户行后计算新余额，非零变动写入流水。用户不存在返回 UserNotFound。
    pub async fn adjust_balance_in_tx(
        conn: &mut PgConnection,
        user_id: &str,
        delta: i64,
        ctx: &LedgerContext,
    ) -> Result<BalanceChange> {
        let current = PointsRepository::get_balance_for_update(&mut *conn, user_id)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(user_id.to_string()))?;

        let change = BalanceChange::compute(current, delta);
        if change.is_noop() {
            return Ok(change);
        }

        PointsRepository::set_balance_in_tx(&mut *conn, user_id, change.new_balance).await?;
        PointsRepository::create_entry_in_tx(&mut *conn, user_id, &change, ctx).await?;

        Ok(change)
    }

    /// 在事务中条件扣减余额
    ///
    /// 余额不足时不做任何修改并返回 InsufficientPoints
    pub async fn debit_in_tx(
        conn: &mut PgConnection,
        user_id: &str,
        amount: i64,
        ctx: &LedgerContext,
    ) -> Result<BalanceChange> {
        let Some(new_balance) =
            PointsRepository::debit_if_sufficient_in_tx(&mut *conn, user_id, amount).await?
        else {
            let available = PointsRepository::get_balance_in_tx(&mut *conn, user_id)
                .await?
                .ok_or_else(|| LedgerError::UserNotFound(user_id.to_string()))?;
            return Err(LedgerError::InsufficientPoints {
                required: amount,
                available,
            });
        };

        let change = BalanceChange {
            previous_balance: new_balance + amount,
            new_balance,
            requested_delta: -amount,
        };
        PointsRepository::create_entry_in_tx(&mut *conn, user_id, &change, ctx).await?;

        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockPointsRepositoryTrait;

    fn lazy_pool() -> PgPool {
        PgPool::connect_lazy("postgres://localhost/unused").unwrap()
    }

    #[tokio::test]
    async fn test_balance_unknown_user() {
        let mut repo = MockPointsRepositoryTrait::new();
        repo.expect_get_balance().returning(|_| Ok(None));

        let ledger = PointsLedger::new(lazy_pool(), Arc::new(repo));
        let result = ledger.balance("ghost").await;
        assert!(matches!(result, Err(LedgerError::UserNotFound(id)) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_history_unknown_user() {
        let mut repo = MockPointsRepositoryTrait::new();
        repo.expect_get_balance().returning(|_| Ok(None));
        repo.expect_list_entries().never();

        let ledger = PointsLedger::new(lazy_pool(), Arc::new(repo));
        let result = ledger.history("ghost", 10).await;
        assert!(matches!(result, Err(LedgerError::UserNotFound(id)) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_history_limit_is_capped() {
        let mut repo = MockPointsRepositoryTrait::new();
        repo.expect_get_balance().returning(|_| Ok(Some(0)));
        repo.expect_list_entries()
            .withf(|user_id, limit| user_id == "user-1" && *limit == 20)
            .times(1)
            .returning(|_, _| Ok(Vec::new()));

        let ledger = PointsLedger::new(lazy_pool(), Arc::new(repo)).with_history_limit(20);
        let entries = ledger.history("user-1", 500).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_manual_adjust_rejects_zero_and_invalid() {
        let repo = MockPointsRepositoryTrait::new();
        let ledger = PointsLedger::new(lazy_pool(), Arc::new(repo));

        let zero = ManualAdjustRequest {
            user_id: "user-1".to_string(),
            delta: 0,
            reason: "corrección".to_string(),
        };
        assert!(matches!(
            ledger.manual_adjust(zero).await,
            Err(LedgerError::Validation(_))
        ));

        let no_reason = ManualAdjustRequest {
            user_id: "user-1".to_string(),
            delta: 10,
            reason: String::new(),
        };
        assert!(matches!(
            ledger.manual_adjust(no_reason).await,
            Err(LedgerError::Validation(_))
        ));
    }
}
