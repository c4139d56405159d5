//! 积分账本实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::ChangeType;

/// 下限截断后的新余额：`max(0, current + delta)`
pub fn clamped_balance(current: i64, delta: i64) -> i64 {
    current.saturating_add(delta).max(0)
}

/// 一次余额变动的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceChange {
    pub previous_balance: i64,
    pub new_balance: i64,
    pub requested_delta: i64,
}

impl BalanceChange {
    pub fn compute(previous_balance: i64, requested_delta: i64) -> Self {
        Self {
            previous_balance,
            new_balance: clamped_balance(previous_balance, requested_delta),
            requested_delta,
        }
    }

    /// 实际生效的变动量，仅在下限截断吸收了部分扣减时与请求值不同
    pub fn applied_delta(&self) -> i64 {
        self.new_balance - self.previous_balance
    }

    pub fn is_noop(&self) -> bool {
        self.applied_delta() == 0
    }
}

/// 积分流水
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PointLedgerEntry {
    pub id: i64,
    pub user_id: String,
    pub change_type: ChangeType,
    pub requested_delta: i64,
    pub applied_delta: i64,
    pub balance_after: i64,
    /// 关联业务 ID（活动 ID、兑换凭证号等）
    #[sqlx(default)]
    pub ref_id: Option<String>,
    #[sqlx(default)]
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 余额变动的业务上下文，写入流水
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerContext {
    pub change_type: ChangeType,
    pub ref_id: Option<String>,
    pub remark: Option<String>,
}

impl LedgerContext {
    pub fn new(change_type: ChangeType) -> Self {
        Self {
            change_type,
            ref_id: None,
            remark: None,
        }
    }

    pub fn with_ref(mut self, ref_id: impl Into<String>) -> Self {
        self.ref_id = Some(ref_id.into());
        self
    }

    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = Some(remark.into());
        self
    }
}
