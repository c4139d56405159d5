//! 活动相关实体定义

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::enums::{ActivityStatus, ActivityType};

/// 用户提交的环保活动
///
/// `points` 是当前计入用户余额的积分（待审核时为 0），只由审核流程修改
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    #[sqlx(default)]
    pub description: Option<String>,
    pub activity_type: ActivityType,
    pub quantity: f64,
    pub status: ActivityStatus,
    pub points: i32,
    /// 证据文件在对象存储中的 key
    pub evidence_keys: Vec<String>,
    /// 活动发生时间
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Activity {
    pub fn is_reviewed(&self) -> bool {
        self.status == ActivityStatus::Reviewed
    }
}

/// 新提交的活动
///
/// 证据文件由外部存储上传完成后，仅传入对象 key
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    #[validate(length(min = 1, max = 64))]
    pub user_id: String,
    #[validate(length(min = 1, max = 120, message = "título debe tener entre 1 y 120 caracteres"))]
    pub title: String,
    #[validate(length(max = 2000, message = "descripción demasiado larga"))]
    pub description: Option<String>,
    pub activity_type: ActivityType,
    #[validate(range(exclusive_min = 0.0, message = "la cantidad debe ser mayor a 0"))]
    pub quantity: f64,
    #[serde(default)]
    pub evidence_keys: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

/// 活动提交快照
///
/// 提交时刻的不可变副本，用于平台级统计，不随活动编辑或删除而变化
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActivityReviewed {
    pub id: i64,
    pub activity_id: i64,
    pub user_id: String,
    pub title: String,
    pub activity_type: ActivityType,
    pub quantity: f64,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ActivityReviewed {
    /// 由活动记录生成快照（id 由数据库分配）
    pub fn snapshot_of(activity: &Activity) -> Self {
        Self {
            id: 0,
            activity_id: activity.id,
            user_id: activity.user_id.clone(),
            title: activity.title.clone(),
            activity_type: activity.activity_type,
            quantity: activity.quantity,
            occurred_at: activity.occurred_at,
            created_at: activity.created_at,
        }
    }
}

/// 平台级提交统计，基于不可变快照
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub total_submissions: i64,
    pub submissions_by_type: HashMap<ActivityType, i64>,
    pub quantity_by_type: HashMap<ActivityType, f64>,
}
