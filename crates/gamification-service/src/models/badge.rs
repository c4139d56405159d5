//! 徽章持久化实体与查询视图

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::ActivityType;
use crate::catalog::BadgeDefinition;

/// 用户已获得的徽章
///
/// 只增不减，核心流程从不删除
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserBadge {
    pub user_id: String,
    pub badge_id: i64,
    pub obtained_at: DateTime<Utc>,
}

/// GetBadges 返回项：徽章定义 + 是否已获得
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeStatusView {
    pub badge: BadgeDefinition,
    pub obtained: bool,
    pub obtained_at: Option<DateTime<Utc>>,
}

/// 用户已审核活动的聚合数据
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewedStats {
    pub reviewed_count: i64,
    pub quantity_by_type: HashMap<ActivityType, f64>,
}
