//! 徽章评估器
//!
//! 在余额或活动状态变化后，根据用户当前聚合数据重新评估徽章目录，
//! 一次性追加新满足条件的徽章。已获得的徽章永不撤销，即使之后的
//! 活动删除或编辑使条件不再满足。
//!
//! 评估属于辅助流程：由触发方在主事务提交后调用，失败只记录日志，
//! 不影响已经提交的积分或活动变更。

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use eco_shared::observability::metrics as app_metrics;

use crate::catalog::{BadgeCatalog, BadgeDefinition, UserProgress};
use crate::error::{LedgerError, Result};
use crate::notification::NotificationSender;
use crate::repository::{ActivityRepositoryTrait, PointsRepositoryTrait, UserBadgeRepositoryTrait};

/// 徽章评估器
pub struct BadgeEvaluator {
    catalog: BadgeCatalog,
    badge_repo: Arc<dyn UserBadgeRepositoryTrait>,
    activity_repo: Arc<dyn ActivityRepositoryTrait>,
    points_repo: Arc<dyn PointsRepositoryTrait>,
    notification_sender: Option<NotificationSender>,
}

impl BadgeEvaluator {
    pub fn new(
        catalog: BadgeCatalog,
        badge_repo: Arc<dyn UserBadgeRepositoryTrait>,
        activity_repo: Arc<dyn ActivityRepositoryTrait>,
        points_repo: Arc<dyn PointsRepositoryTrait>,
    ) -> Self {
        Self {
            catalog,
            badge_repo,
            activity_repo,
            points_repo,
            notification_sender: None,
        }
    }

    /// 设置通知发送器，新获得徽章时通知用户
    pub fn with_notification_sender(mut self, sender: NotificationSender) -> Self {
        self.notification_sender = Some(sender);
        self
    }

    pub fn catalog(&self) -> &BadgeCatalog {
        &self.catalog
    }

    /// 重新评估用户徽章
    ///
    /// 1. 读取已获得徽章、余额和已审核活动聚合
    /// 2. 对未获得的徽章逐一判定条件
    /// 3. 批量追加新满足的徽章（已存在的跳过）
    /// 4. 为实际新增的徽章发送通知
    ///
    /// 返回本次实际新增的徽章
    #[instrument(skip(self))]
    pub async fn reevaluate(&self, user_id: &str) -> Result<Vec<BadgeDefinition>> {
        // 1. 读取当前状态
        let obtained: HashSet<i64> = self
            .badge_repo
            .list_user_badges(user_id)
            .await?
            .into_iter()
            .map(|badge| badge.badge_id)
            .collect();

        let balance = self
            .points_repo
            .get_balance(user_id)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(user_id.to_string()))?;

        let stats = self.activity_repo.reviewed_stats(user_id).await?;
        let progress = UserProgress::new(stats, balance);

        // 2. 判定
        let candidates = self.catalog.newly_satisfied(&progress, &obtained);
        if candidates.is_empty() {
            debug!(user_id = %user_id, "没有新满足条件的徽章");
            return Ok(Vec::new());
        }

        // 3. 批量追加
        let candidate_ids: Vec<i64> = candidates.iter().map(|def| def.id).collect();
        let inserted: HashSet<i64> = self
            .badge_repo
            .grant_badges(user_id, &candidate_ids)
            .await?
            .into_iter()
            .collect();

        let granted: Vec<BadgeDefinition> = candidates
            .into_iter()
            .filter(|def| inserted.contains(&def.id))
            .cloned()
            .collect();

        // 4. 指标与通知
        for def in &granted {
            app_metrics::record_badge_grant(def.code);
            if let Some(sender) = &self.notification_sender {
                sender.send_badge_earned(user_id, def.id, def.name);
            }
        }

        if !granted.is_empty() {
            info!(
                user_id = %user_id,
                badges = ?granted.iter().map(|def| def.code).collect::<Vec<_>>(),
                "徽章发放成功"
            );
        }

        Ok(granted)
    }

    /// 重新评估（失败只记录日志）
    pub async fn reevaluate_best_effort(&self, user_id: &str) -> Vec<BadgeDefinition> {
        match self.reevaluate(user_id).await {
            Ok(granted) => granted,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "徽章评估失败，已忽略");
                Vec::new()
            }
        }
    }
}
