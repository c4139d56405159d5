//! 服务装配
//!
//! 由仓储、通知与证据存储组装出全部业务服务，二进制入口和集成测试共用

use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use eco_shared::config::GamificationSettings;

use crate::catalog::BadgeCatalog;
use crate::error::Result;
use crate::evidence::EvidenceStore;
use crate::notification::{NotificationSender, NotificationSink};
use crate::repository::{
    ActivityRepository, BadgeRepository, PointsRepository, RedemptionRepository, RewardRepository,
};
use crate::service::{
    ActivityReviewWorkflow, BadgeEvaluator, PointsLedger, QueryService, RedemptionEngine,
};

/// 查询服务的具体类型
pub type GamificationQueryService =
    QueryService<BadgeRepository, ActivityRepository, PointsRepository>;

/// 全部业务服务
pub struct GamificationServices {
    pub points_ledger: Arc<PointsLedger>,
    pub review_workflow: Arc<ActivityReviewWorkflow>,
    pub badge_evaluator: Arc<BadgeEvaluator>,
    pub redemption_engine: Arc<RedemptionEngine>,
    pub query_service: Arc<GamificationQueryService>,
    pub badge_repo: Arc<BadgeRepository>,
}

impl GamificationServices {
    /// 组装服务
    pub async fn build(
        pool: PgPool,
        settings: &GamificationSettings,
        sink: Arc<dyn NotificationSink>,
        evidence_store: Arc<dyn EvidenceStore>,
    ) -> Self {
        let catalog = BadgeCatalog::standard();

        // 1. 仓储
        let points_repo = Arc::new(PointsRepository::new(pool.clone()));
        let activity_repo = Arc::new(ActivityRepository::new(pool.clone()));
        let badge_repo = Arc::new(BadgeRepository::new(pool.clone()));
        let reward_repo = Arc::new(RewardRepository::new(pool.clone()));
        let redemption_repo = Arc::new(RedemptionRepository::new(pool.clone()));

        // 2. 通知
        let notification_sender = NotificationSender::new(sink);

        // 3. 徽章评估器
        let badge_evaluator = Arc::new(
            BadgeEvaluator::new(
                catalog.clone(),
                badge_repo.clone(),
                activity_repo.clone(),
                points_repo.clone(),
            )
            .with_notification_sender(notification_sender.clone()),
        );

        // 4. 业务服务
        let points_ledger = Arc::new(
            PointsLedger::new(pool.clone(), points_repo.clone())
                .with_history_limit(settings.ledger_history_limit),
        );
        points_ledger
            .set_badge_evaluator(badge_evaluator.clone())
            .await;

        let review_workflow = Arc::new(ActivityReviewWorkflow::new(
            pool.clone(),
            badge_evaluator.clone(),
            evidence_store,
            notification_sender.clone(),
        ));

        let redemption_engine = Arc::new(
            RedemptionEngine::new(
                pool,
                reward_repo,
                redemption_repo,
                points_repo.clone(),
                badge_evaluator.clone(),
                notification_sender,
            )
            .with_settings(settings),
        );

        let query_service = Arc::new(QueryService::new(
            catalog,
            badge_repo.clone(),
            activity_repo,
            points_repo,
        ));

        info!("积分玩法服务已初始化");

        Self {
            points_ledger,
            review_workflow,
            badge_evaluator,
            redemption_engine,
            query_service,
            badge_repo,
        }
    }

    /// 同步徽章目录到数据库（启动时执行一次）
    pub async fn seed_badge_catalog(&self) -> Result<u64> {
        self.badge_repo
            .seed_catalog(self.badge_evaluator.catalog())
            .await
    }
}
