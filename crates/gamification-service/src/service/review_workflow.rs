//! 活动审核流程
//!
//! 活动状态机：`PENDING_REVIEW` → `REVIEWED`，已审核活动可以再次评分，
//! 任一状态下都可以被删除。
//!
//! ## 原子性
//!
//! 评分与删除在单个数据库事务中完成活动变更和余额调整，活动行先加锁
//! （`FOR UPDATE`），同一活动的并发请求串行执行，后到者以前者提交后的
//! `points` 作为差额基准。
//!
//! 证据文件删除、通知和徽章评估在事务提交后执行，失败只记录日志。
//! 事务回滚时不会删除任何文件，也不会发送通知。

use std::sync::Arc;

use sqlx::PgPool;
use tracing::{info, instrument, warn};
use validator::Validate;

use eco_shared::observability::metrics as app_metrics;

use crate::error::{LedgerError, Result};
use crate::evidence::EvidenceStore;
use crate::models::{
    Activity, ActivityReviewed, ActivityStatus, ChangeType, LedgerContext, NewActivity,
};
use crate::notification::NotificationSender;
use crate::repository::{ActivityRepository, PointsRepository};
use crate::service::badge_evaluator::BadgeEvaluator;
use crate::service::dto::{DeleteOutcome, GradeActivityRequest, GradeOutcome, GradePlan};
use crate::service::points_ledger::PointsLedger;

/// 活动审核流程
pub struct ActivityReviewWorkflow {
    pool: PgPool,
    badge_evaluator: Arc<BadgeEvaluator>,
    evidence_store: Arc<dyn EvidenceStore>,
    notification_sender: NotificationSender,
}

impl ActivityReviewWorkflow {
    pub fn new(
        pool: PgPool,
        badge_evaluator: Arc<BadgeEvaluator>,
        evidence_store: Arc<dyn EvidenceStore>,
        notification_sender: NotificationSender,
    ) -> Self {
        Self {
            pool,
            badge_evaluator,
            evidence_store,
            notification_sender,
        }
    }

    /// 提交活动
    ///
    /// 创建待审核活动（积分为 0），并在同一事务中追加提交快照
    #[instrument(skip(self, new), fields(user_id = %new.user_id))]
    pub async fn submit(&self, new: NewActivity) -> Result<Activity> {
        new.validate()?;

        let mut tx = self.pool.begin().await?;

        if PointsRepository::get_balance_in_tx(&mut tx, &new.user_id)
            .await?
            .is_none()
        {
            return Err(LedgerError::UserNotFound(new.user_id));
        }

        let activity = ActivityRepository::create_in_tx(&mut tx, &new).await?;
        ActivityRepository::create_snapshot_in_tx(&mut tx, &ActivityReviewed::snapshot_of(&activity))
            .await?;

        tx.commit().await?;

        info!(
            user_id = %activity.user_id,
            activity_id = activity.id,
            activity_type = %activity.activity_type.as_str(),
            "活动已提交，等待审核"
        );

        Ok(activity)
    }

    /// 评分 / 编辑活动
    ///
    /// 1. 校验请求（面额、元数据字段、证据 key 归属）
    /// 2. 锁定活动行
    /// 3. 计算差额：新面额 - 活动当前记入的积分
    /// 4. 更新活动（状态、积分、元数据）
    /// 5. 按差额调整余额（同一事务）
    /// 6. 提交事务
    /// 7. 删除被移除的证据文件
    /// 8. 发送评分通知（首次评分 / 再次评分）
    /// 9. 触发徽章评估
    #[instrument(skip(self, request), fields(activity_id = request.activity_id))]
    pub async fn grade(&self, request: GradeActivityRequest) -> Result<GradeOutcome> {
        // 1. 请求校验
        request.validate()?;
        if request.points.is_none() && !request.has_metadata_changes() {
            return Err(LedgerError::Validation(
                "la solicitud no contiene cambios".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        // 2. 锁定活动
        let mut activity = ActivityRepository::get_for_update(&mut tx, request.activity_id)
            .await?
            .ok_or(LedgerError::ActivityNotFound(request.activity_id))?;

        if let Some(foreign) = request
            .remove_evidence
            .iter()
            .find(|key| !activity.evidence_keys.contains(*key))
        {
            return Err(LedgerError::Validation(format!(
                "la evidencia {} no pertenece a la actividad",
                foreign
            )));
        }

        // 3. 差额（评分前状态决定首次评分 / 再次评分）
        let plan = request
            .points
            .map(|points| GradePlan::compute(activity.status, activity.points, points));

        // 4. 更新活动
        request.apply_metadata(&mut activity);
        if let Some(plan) = &plan {
            activity.status = ActivityStatus::Reviewed;
            activity.points = plan.new_points;
        }
        let activity = ActivityRepository::update_in_tx(&mut tx, &activity).await?;

        // 5. 调整余额
        let mut balance_change = None;
        let balance = match &plan {
            Some(plan) => {
                let ctx = LedgerContext::new(ChangeType::from(plan.kind))
                    .with_ref(activity.id.to_string())
                    .with_remark(&activity.title);
                let change =
                    PointsLedger::adjust_balance_in_tx(&mut tx, &activity.user_id, plan.delta, &ctx)
                        .await?;
                if !change.is_noop() {
                    balance_change = Some(ctx.change_type);
                }
                Some(change.new_balance)
            }
            None => None,
        };

        // 6. 提交
        tx.commit().await?;

        if let Some(plan) = &plan {
            info!(
                activity_id = activity.id,
                user_id = %activity.user_id,
                kind = plan.kind.as_str(),
                previous_points = plan.previous_points,
                new_points = plan.new_points,
                delta = plan.delta,
                "活动评分成功"
            );
            app_metrics::record_grading(plan.kind.as_str());
        }
        if let Some(change_type) = balance_change {
            app_metrics::record_points_adjustment(change_type.as_str());
        }

        // 7. 证据清理
        if !request.remove_evidence.is_empty() {
            self.delete_evidence(activity.id, &request.remove_evidence)
                .await;
        }

        // 8. 通知
        if let Some(plan) = &plan {
            self.notification_sender.send_activity_graded(
                &activity.user_id,
                activity.id,
                &activity.title,
                plan.kind,
                plan.new_points,
            );
        }

        // 9. 徽章评估（已审核活动的元数据变化同样影响条件）
        if activity.is_reviewed() {
            self.badge_evaluator
                .reevaluate_best_effort(&activity.user_id)
                .await;
        }

        Ok(GradeOutcome {
            activity,
            plan,
            balance,
        })
    }

    /// 删除活动
    ///
    /// 1. 锁定活动行
    /// 2. 删除活动记录
    /// 3. 扣回活动记入的积分（下限截断）
    /// 4. 提交事务
    /// 5. 删除证据文件（逐个尽力执行）
    /// 6. 触发徽章评估（徽章不会被撤销）
    /// 7. 发送删除通知
    #[instrument(skip(self))]
    pub async fn delete(&self, activity_id: i64) -> Result<DeleteOutcome> {
        let mut tx = self.pool.begin().await?;

        // 1. 锁定
        let activity = ActivityRepository::get_for_update(&mut tx, activity_id)
            .await?
            .ok_or(LedgerError::ActivityNotFound(activity_id))?;

        // 2. 删除
        if !ActivityRepository::delete_in_tx(&mut tx, activity_id).await? {
            return Err(LedgerError::ActivityNotFound(activity_id));
        }

        // 3. 扣回积分
        let (points_removed, balance) = if activity.points > 0 {
            let ctx = LedgerContext::new(ChangeType::ActivityDeleted)
                .with_ref(activity_id.to_string())
                .with_remark(&activity.title);
            let change = PointsLedger::adjust_balance_in_tx(
                &mut tx,
                &activity.user_id,
                -i64::from(activity.points),
                &ctx,
            )
            .await?;
            (-change.applied_delta(), change.new_balance)
        } else {
            let balance = PointsRepository::get_balance_in_tx(&mut tx, &activity.user_id)
                .await?
                .ok_or_else(|| LedgerError::UserNotFound(activity.user_id.clone()))?;
            (0, balance)
        };

        // 4. 提交
        tx.commit().await?;

        info!(
            activity_id = activity_id,
            user_id = %activity.user_id,
            points_removed = points_removed,
            new_balance = balance,
            "活动已删除"
        );
        app_metrics::record_activity_deletion();
        if points_removed > 0 {
            app_metrics::record_points_adjustment(ChangeType::ActivityDeleted.as_str());
        }

        // 5. 证据清理
        if !activity.evidence_keys.is_empty() {
            self.delete_evidence(activity_id, &activity.evidence_keys)
                .await;
        }

        // 6. 徽章评估
        self.badge_evaluator
            .reevaluate_best_effort(&activity.user_id)
            .await;

        // 7. 通知
        self.notification_sender.send_activity_deleted(
            &activity.user_id,
            activity_id,
            &activity.title,
            points_removed,
        );

        Ok(DeleteOutcome {
            activity_id,
            user_id: activity.user_id,
            points_removed,
            balance,
        })
    }

    async fn delete_evidence(&self, activity_id: i64, keys: &[String]) {
        let outcome = self.evidence_store.delete_files(keys).await;
        if !outcome.is_complete() {
            warn!(
                activity_id = activity_id,
                failed = ?outcome.failed,
                "部分证据文件删除失败"
            );
        }
    }
}
