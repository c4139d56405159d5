//! 仓储 Trait 定义
//!
//! 定义仓储只读接口，便于服务层依赖抽象而非具体实现，支持 mock 测试。
//! 事务内写操作以关联函数形式提供在具体仓储上，由服务层持有事务。

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Activity, PlatformStats, PointLedgerEntry, Redemption, ReviewedStats, Reward, UserBadge,
};

/// 积分仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PointsRepositoryTrait: Send + Sync {
    /// 用户余额，用户不存在时返回 None
    async fn get_balance(&self, user_id: &str) -> Result<Option<i64>>;
    async fn list_entries(&self, user_id: &str, limit: i64) -> Result<Vec<PointLedgerEntry>>;
}

/// 活动仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityRepositoryTrait: Send + Sync {
    async fn get_activity(&self, id: i64) -> Result<Option<Activity>>;
    async fn list_user_activities(&self, user_id: &str) -> Result<Vec<Activity>>;
    /// 用户已审核活动的数量及按类型累计的 quantity
    async fn reviewed_stats(&self, user_id: &str) -> Result<ReviewedStats>;
    /// 基于提交快照的平台统计
    async fn platform_stats(&self) -> Result<PlatformStats>;
}

/// 用户徽章仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserBadgeRepositoryTrait: Send + Sync {
    async fn list_user_badges(&self, user_id: &str) -> Result<Vec<UserBadge>>;
    /// 批量追加徽章，已存在的跳过，返回实际新增的徽章 ID
    async fn grant_badges(&self, user_id: &str, badge_ids: &[i64]) -> Result<Vec<i64>>;
}

/// 奖励仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RewardRepositoryTrait: Send + Sync {
    async fn get_reward(&self, id: i64) -> Result<Option<Reward>>;
}

/// 兑换凭证仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RedemptionRepositoryTrait: Send + Sync {
    async fn get_by_folio(&self, folio: &str) -> Result<Option<Redemption>>;
    async fn list_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<Redemption>>;
}
