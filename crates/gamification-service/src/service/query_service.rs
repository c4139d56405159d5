//! 查询服务
//!
//! 只读查询：用户徽章墙、用户活动列表、平台统计

use std::collections::HashMap;
use std::sync::Arc;

use tracing::instrument;

use crate::catalog::BadgeCatalog;
use crate::error::{LedgerError, Result};
use crate::models::{Activity, BadgeStatusView, PlatformStats};
use crate::repository::{ActivityRepositoryTrait, PointsRepositoryTrait, UserBadgeRepositoryTrait};

/// 查询服务
pub struct QueryService<BR, AR, PR>
where
    BR: UserBadgeRepositoryTrait,
    AR: ActivityRepositoryTrait,
    PR: PointsRepositoryTrait,
{
    catalog: BadgeCatalog,
    badge_repo: Arc<BR>,
    activity_repo: Arc<AR>,
    points_repo: Arc<PR>,
}

impl<BR, AR, PR> QueryService<BR, AR, PR>
where
    BR: UserBadgeRepositoryTrait,
    AR: ActivityRepositoryTrait,
    PR: PointsRepositoryTrait,
{
    pub fn new(
        catalog: BadgeCatalog,
        badge_repo: Arc<BR>,
        activity_repo: Arc<AR>,
        points_repo: Arc<PR>,
    ) -> Self {
        Self {
            catalog,
            badge_repo,
            activity_repo,
            points_repo,
        }
    }

    /// 获取用户徽章墙
    ///
    /// 返回目录中的每个徽章及其获得状态，顺序与目录一致
    #[instrument(skip(self))]
    pub async fn get_badges(&self, user_id: &str) -> Result<Vec<BadgeStatusView>> {
        self.ensure_user(user_id).await?;

        let obtained: HashMap<i64, _> = self
            .badge_repo
            .list_user_badges(user_id)
            .await?
            .into_iter()
            .map(|badge| (badge.badge_id, badge.obtained_at))
            .collect();

        let views = self
            .catalog
            .definitions()
            .iter()
            .map(|def| {
                let obtained_at = obtained.get(&def.id).copied();
                BadgeStatusView {
                    badge: def.clone(),
                    obtained: obtained_at.is_some(),
                    obtained_at,
                }
            })
            .collect();

        Ok(views)
    }

    /// 获取用户的活动列表
    #[instrument(skip(self))]
    pub async fn list_user_activities(&self, user_id: &str) -> Result<Vec<Activity>> {
        self.ensure_user(user_id).await?;
        self.activity_repo.list_user_activities(user_id).await
    }

    /// 获取单个活动
    #[instrument(skip(self))]
    pub async fn get_activity(&self, activity_id: i64) -> Result<Activity> {
        self.activity_repo
            .get_activity(activity_id)
            .await?
            .ok_or(LedgerError::ActivityNotFound(activity_id))
    }

    /// 平台统计，基于提交快照，不受活动编辑或删除影响
    #[instrument(skip(self))]
    pub async fn platform_stats(&self) -> Result<PlatformStats> {
        self.activity_repo.platform_stats().await
    }

    async fn ensure_user(&self, user_id: &str) -> Result<()> {
        match self.points_repo.get_balance(user_id).await? {
            Some(_) => Ok(()),
            None => Err(LedgerError::UserNotFound(user_id.to_string())),
        }
    }
}
