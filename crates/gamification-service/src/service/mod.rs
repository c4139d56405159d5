//! 业务服务层
//!
//! - [`PointsLedger`]：余额变动（下限截断调整、条件扣减、手动调整、流水）
//! - [`ActivityReviewWorkflow`]：活动提交、评分 / 再次评分、删除
//! - [`BadgeEvaluator`]：余额或活动变化后的徽章评估
//! - [`RedemptionEngine`]：奖励兑换与凭证查询
//! - [`QueryService`]：徽章墙、活动列表、平台统计

pub mod badge_evaluator;
pub mod dto;
pub mod points_ledger;
pub mod query_service;
pub mod redemption_engine;
pub mod review_workflow;

pub use badge_evaluator::BadgeEvaluator;
pub use dto::{DeleteOutcome, GradeActivityRequest, GradeOutcome, GradePlan, ManualAdjustRequest};
pub use points_ledger::PointsLedger;
pub use query_service::QueryService;
pub use redemption_engine::RedemptionEngine;
pub use review_workflow::ActivityReviewWorkflow;
