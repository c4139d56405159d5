//! 奖励与兑换凭证实体定义
//!
//! 兑换记录保存奖励字段的完整快照，之后对奖励定义的修改不会影响已发放的凭证

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::error::{LedgerError, Result};

/// 兑换凭证的使用期限（天）
pub const REDEMPTION_USAGE_DAYS: i64 = 15;

/// 可兑换奖励
///
/// `quantity` 为 None 表示不限量；限量奖励库存归零时 `available` 自动置为 false
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub id: i64,
    pub title: String,
    #[sqlx(default)]
    pub description: Option<String>,
    pub category: String,
    pub points_cost: i32,
    #[sqlx(default)]
    pub quantity: Option<i32>,
    pub available: bool,
    #[sqlx(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reward {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }

    /// 兑换前置校验：可用状态、有效期
    ///
    /// 余额校验与库存扣减在兑换事务中完成
    pub fn ensure_redeemable(&self, now: DateTime<Utc>) -> Result<()> {
        if !self.available {
            return Err(LedgerError::RewardUnavailable(self.id));
        }
        if let Some(expired_at) = self.expires_at.filter(|expires_at| *expires_at < now) {
            return Err(LedgerError::RewardExpired {
                reward_id: self.id,
                expired_at,
            });
        }
        Ok(())
    }

    /// 兑换时刻的奖励快照
    ///
    /// 应在库存扣减返回的行上调用，`quantity_at_redemption` 记录扣减前的库存
    pub fn snapshot(&self) -> RewardSnapshot {
        RewardSnapshot {
            reward_id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            points_cost: self.points_cost,
            quantity_at_redemption: self.quantity.map(|remaining| remaining + 1),
            expires_at: self.expires_at,
        }
    }
}

/// 奖励字段快照（JSONB 持久化）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardSnapshot {
    pub reward_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub points_cost: i32,
    /// 兑换前的剩余库存
    pub quantity_at_redemption: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// 兑换凭证
///
/// 创建后不可修改，`folio` 全局唯一
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    pub id: i64,
    pub user_id: String,
    pub reward_id: i64,
    pub folio: String,
    pub redeemed_at: DateTime<Utc>,
    pub reward_limit_to_use: DateTime<Utc>,
    pub reward_snapshot: Json<RewardSnapshot>,
}

impl Redemption {
    /// 凭证使用截止时间
    pub fn usage_deadline(redeemed_at: DateTime<Utc>) -> DateTime<Utc> {
        redeemed_at + Duration::days(REDEMPTION_USAGE_DAYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_reward() -> Reward {
        let now = Utc::now();
        Reward {
            id: 3,
            title: "Termo reutilizable".to_string(),
            description: Some("Termo de acero inoxidable".to_string()),
            category: "ARTICULOS".to_string(),
            points_cost: 50,
            quantity: Some(1),
            available: true,
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_available_reward_is_redeemable() {
        assert!(sample_reward().ensure_redeemable(Utc::now()).is_ok());
    }

    #[test]
    fn test_unavailable_reward_is_rejected() {
        let mut reward = sample_reward();
        reward.available = false;
        assert!(matches!(
            reward.ensure_redeemable(Utc::now()),
            Err(LedgerError::RewardUnavailable(3))
        ));
    }

    #[test]
    fn test_expired_reward_is_rejected() {
        let now = Utc::now();
        let mut reward = sample_reward();
        reward.expires_at = Some(now - Duration::hours(1));

        assert!(reward.is_expired_at(now));
        assert!(matches!(
            reward.ensure_redeemable(now),
            Err(LedgerError::RewardExpired { reward_id: 3, .. })
        ));

        reward.expires_at = Some(now + Duration::hours(1));
        assert!(reward.ensure_redeemable(now).is_ok());
    }

    #[test]
    fn test_unavailable_takes_precedence_over_expired() {
        let now = Utc::now();
        let mut reward = sample_reward();
        reward.available = false;
        reward.expires_at = Some(now - Duration::days(1));
        assert!(matches!(
            reward.ensure_redeemable(now),
            Err(LedgerError::RewardUnavailable(_))
        ));
    }

    #[test]
    fn test_usage_deadline_is_fifteen_days() {
        let redeemed_at = Utc::now();
        let deadline = Redemption::usage_deadline(redeemed_at);
        assert_eq!(deadline - redeemed_at, Duration::days(15));
    }

    #[test]
    fn test_snapshot_copies_reward_fields() {
        let reward = sample_reward();
        let snapshot = reward.snapshot();

        assert_eq!(snapshot.reward_id, reward.id);
        assert_eq!(snapshot.title, reward.title);
        assert_eq!(snapshot.points_cost, 50);
        assert_eq!(snapshot.quantity_at_redemption, Some(2));

        let mut unlimited = sample_reward();
        unlimited.quantity = None;
        assert_eq!(unlimited.snapshot().quantity_at_redemption, None);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["pointsCost"], 50);
        assert_eq!(json["category"], "ARTICULOS");
    }
}
