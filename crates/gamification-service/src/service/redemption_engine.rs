//! 奖励兑换引擎
//!
//! 将积分兑换为奖励凭证。
//!
//! ## 兑换流程
//!
//! 1. 读取奖励 -> 2. 可用性 -> 3. 有效期 -> 4. 余额预检
//!    -> 5. 事务写入（库存扣减 + 凭证 + 扣分） -> 6. 通知与徽章评估
//!
//! 第 1-4 步只做快速拒绝；扣分金额与凭证快照取自第 5 步库存扣减锁定的奖励行，
//! 校验之后的价格或有效期变更以事务内的行为准。
//!
//! 第 5 步是一个原子单元：库存、凭证与扣分要么全部发生，要么全部不发生。
//! 库存扣减是带条件的单条 UPDATE，两个并发兑换争抢最后一件库存时只有一个成功，
//! 另一个得到 `RewardUnavailable`。扣分同样带余额条件，同一用户的并发兑换不会透支。
//!
//! 兑换不是幂等操作：结果不明时调用方应先通过 folio 或兑换列表确认，再决定是否重试。

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rand::Rng;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use eco_shared::config::GamificationSettings;
use eco_shared::observability::metrics as app_metrics;

use crate::error::{LedgerError, Result};
use crate::models::{ChangeType, LedgerContext, Redemption};
use crate::notification::NotificationSender;
use crate::repository::{
    NewRedemption, PointsRepositoryTrait, RedemptionRepository, RedemptionRepositoryTrait,
    RewardRepository, RewardRepositoryTrait,
};
use crate::service::badge_evaluator::BadgeEvaluator;
use crate::service::points_ledger::PointsLedger;

/// folio 字符集：大写字母与数字，去掉易混淆的 0/O/1/I
const FOLIO_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// 生成随机 folio
fn generate_folio(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| FOLIO_ALPHABET[rng.random_range(0..FOLIO_ALPHABET.len())] as char)
        .collect()
}

/// 奖励兑换引擎
pub struct RedemptionEngine {
    pool: PgPool,
    reward_repo: Arc<dyn RewardRepositoryTrait>,
    redemption_repo: Arc<dyn RedemptionRepositoryTrait>,
    points_repo: Arc<dyn PointsRepositoryTrait>,
    badge_evaluator: Arc<BadgeEvaluator>,
    notification_sender: NotificationSender,
    folio_length: usize,
    folio_max_attempts: u32,
}

impl RedemptionEngine {
    pub fn new(
        pool: PgPool,
        reward_repo: Arc<dyn RewardRepositoryTrait>,
        redemption_repo: Arc<dyn RedemptionRepositoryTrait>,
        points_repo: Arc<dyn PointsRepositoryTrait>,
        badge_evaluator: Arc<BadgeEvaluator>,
        notification_sender: NotificationSender,
    ) -> Self {
        let settings = GamificationSettings::default();
        Self {
            pool,
            reward_repo,
            redemption_repo,
            points_repo,
            badge_evaluator,
            notification_sender,
            folio_length: settings.folio_length,
            folio_max_attempts: settings.folio_max_attempts,
        }
    }

    pub fn with_settings(mut self, settings: &GamificationSettings) -> Self {
        self.folio_length = settings.folio_length.max(4);
        self.folio_max_attempts = settings.folio_max_attempts.max(1);
        self
    }

    /// 兑换奖励
    #[instrument(skip(self))]
    pub async fn redeem(&self, user_id: &str, reward_id: i64) -> Result<Redemption> {
        let start = Instant::now();
        let result = self.execute_redeem(user_id, reward_id).await;

        let status = match &result {
            Ok(_) => "success".to_string(),
            Err(e) => e.error_code().to_lowercase(),
        };
        app_metrics::record_redemption(&status, start.elapsed().as_secs_f64());

        if let Err(e) = &result {
            if e.is_business_error() {
                info!(user_id = %user_id, reward_id = reward_id, error = %e, "兑换被拒绝");
            } else {
                warn!(user_id = %user_id, reward_id = reward_id, error = %e, "兑换失败");
            }
        }

        result
    }

    async fn execute_redeem(&self, user_id: &str, reward_id: i64) -> Result<Redemption> {
        let now = Utc::now();

        // 1. 读取奖励
        let reward = self
            .reward_repo
            .get_reward(reward_id)
            .await?
            .ok_or(LedgerError::RewardNotFound(reward_id))?;

        // 2-3. 可用性与有效期
        reward.ensure_redeemable(now)?;

        // 4. 余额预检（最终以事务内锁定行的价格扣分）
        let quoted_cost = i64::from(reward.points_cost);
        let balance = self
            .points_repo
            .get_balance(user_id)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(user_id.to_string()))?;
        if balance < quoted_cost {
            return Err(LedgerError::InsufficientPoints {
                required: quoted_cost,
                available: balance,
            });
        }

        // 5. 事务写入
        let mut tx = self.pool.begin().await?;

        // 5.1 扣减库存（持有奖励行锁），之后以锁定行为准
        let locked = RewardRepository::decrement_stock_in_tx(&mut tx, reward_id)
            .await?
            .ok_or(LedgerError::RewardUnavailable(reward_id))?;
        let cost = i64::from(locked.points_cost);

        // 5.2 创建凭证，folio 冲突时重新生成
        let snapshot = locked.snapshot();
        let redeemed_at = Utc::now();
        let reward_limit_to_use = Redemption::usage_deadline(redeemed_at);

        let mut created = None;
        for attempt in 1..=self.folio_max_attempts {
            let folio = generate_folio(self.folio_length);
            let new = NewRedemption {
                user_id,
                reward_id,
                folio: &folio,
                redeemed_at,
                reward_limit_to_use,
                snapshot: &snapshot,
            };
            if let Some(redemption) = RedemptionRepository::create_in_tx(&mut tx, &new).await? {
                created = Some(redemption);
                break;
            }
            warn!(attempt = attempt, folio = %folio, "folio 冲突，重新生成");
        }
        let redemption = created.ok_or_else(|| {
            LedgerError::Internal(format!(
                "no se pudo generar un folio único tras {} intentos",
                self.folio_max_attempts
            ))
        })?;

        // 5.3 扣分（余额条件扣减）
        let ctx = LedgerContext::new(ChangeType::Redemption)
            .with_ref(redemption.folio.clone())
            .with_remark(&locked.title);
        let change = PointsLedger::debit_in_tx(&mut tx, user_id, cost, &ctx).await?;

        tx.commit().await?;

        info!(
            user_id = %user_id,
            reward_id = reward_id,
            folio = %redemption.folio,
            points_cost = cost,
            new_balance = change.new_balance,
            remaining_quantity = ?locked.quantity,
            available = locked.available,
            "奖励兑换成功"
        );
        app_metrics::record_points_adjustment(ChangeType::Redemption.as_str());

        // 6. 通知与徽章评估
        self.notification_sender.send_reward_redeemed(
            user_id,
            &locked.title,
            &redemption.folio,
            redemption.reward_limit_to_use,
        );
        self.badge_evaluator.reevaluate_best_effort(user_id).await;

        Ok(redemption)
    }

    /// 按 folio 查询凭证
    #[instrument(skip(self))]
    pub async fn get_by_folio(&self, folio: &str) -> Result<Redemption> {
        self.redemption_repo
            .get_by_folio(folio)
            .await?
            .ok_or_else(|| LedgerError::RedemptionNotFound(folio.to_string()))
    }

    /// 查询用户兑换记录，按兑换时间倒序
    #[instrument(skip(self))]
    pub async fn list_user_redemptions(&self, user_id: &str, limit: i64) -> Result<Vec<Redemption>> {
        self.redemption_repo
            .list_by_user(user_id, limit.clamp(1, 200))
            .await
    }
}
