//! 积分玩法领域模型
//!
//! 包含活动、积分账本、徽章、奖励与兑换凭证的核心实体定义

pub mod activity;
pub mod badge;
pub mod enums;
pub mod ledger;
pub mod reward;

// 重新导出常用类型
pub use activity::{Activity, ActivityReviewed, NewActivity, PlatformStats};
pub use badge::{BadgeStatusView, ReviewedStats, UserBadge};
pub use enums::{ActivityStatus, ActivityType, ChangeType, CriteriaType, GradeKind, GradePoints};
pub use ledger::{BalanceChange, LedgerContext, PointLedgerEntry, clamped_balance};
pub use reward::{REDEMPTION_USAGE_DAYS, Redemption, Reward, RewardSnapshot};
