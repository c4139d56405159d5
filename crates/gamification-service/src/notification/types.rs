//! 通知类型定义
//!
//! 面向用户的通知文案使用产品语言（西班牙语）

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::GradeKind;

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    ActivityGraded,
    ActivityRegraded,
    ActivityDeleted,
    RewardRedeemed,
    BadgeEarned,
}

/// 通知
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub notification_id: String,
    pub user_id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    /// 通知携带的业务数据
    pub data: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: impl Into<String>,
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            notification_id: Uuid::now_v7().to_string(),
            user_id: user_id.into(),
            notification_type,
            title: title.into(),
            message: message.into(),
            data: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}

/// 业务通知构建器
pub struct NotificationBuilder;

impl NotificationBuilder {
    /// 评分通知，根据评分前的状态区分首次评分与再次评分
    pub fn activity_graded(
        user_id: &str,
        activity_id: i64,
        activity_title: &str,
        kind: GradeKind,
        points: i32,
    ) -> Notification {
        let (notification_type, title, message) = match kind {
            GradeKind::Initial => (
                NotificationType::ActivityGraded,
                "Actividad calificada",
                format!(
                    "Tu actividad \"{}\" fue calificada con {} puntos.",
                    activity_title, points
                ),
            ),
            GradeKind::Regrade => (
                NotificationType::ActivityRegraded,
                "Actividad recalificada",
                format!(
                    "Tu actividad \"{}\" fue recalificada con {} puntos.",
                    activity_title, points
                ),
            ),
        };

        Notification::new(user_id, notification_type, title, message)
            .with_data("activityId", serde_json::json!(activity_id))
            .with_data("points", serde_json::json!(points))
    }

    /// 活动删除通知
    pub fn activity_deleted(
        user_id: &str,
        activity_id: i64,
        activity_title: &str,
        points_removed: i64,
    ) -> Notification {
        let message = if points_removed > 0 {
            format!(
                "Tu actividad \"{}\" fue eliminada y se descontaron {} puntos de tu saldo.",
                activity_title, points_removed
            )
        } else {
            format!("Tu actividad \"{}\" fue eliminada.", activity_title)
        };

        Notification::new(
            user_id,
            NotificationType::ActivityDeleted,
            "Actividad eliminada",
            message,
        )
        .with_data("activityId", serde_json::json!(activity_id))
        .with_data("pointsRemoved", serde_json::json!(points_removed))
    }

    /// 兑换成功通知
    pub fn reward_redeemed(
        user_id: &str,
        reward_title: &str,
        folio: &str,
        limit_to_use: DateTime<Utc>,
    ) -> Notification {
        Notification::new(
            user_id,
            NotificationType::RewardRedeemed,
            "Recompensa canjeada",
            format!(
                "Canjeaste \"{}\". Tu folio es {} y es válido hasta el {}.",
                reward_title,
                folio,
                limit_to_use.format("%d/%m/%Y")
            ),
        )
        .with_data("folio", serde_json::json!(folio))
    }

    /// 获得徽章通知
    pub fn badge_earned(user_id: &str, badge_id: i64, badge_name: &str) -> Notification {
        Notification::new(
            user_id,
            NotificationType::BadgeEarned,
            "¡Nueva insignia!",
            format!("Obtuviste la insignia \"{}\".", badge_name),
        )
        .with_data("badgeId", serde_json::json!(badge_id))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_graded_title_depends_on_kind() {
        let initial =
            NotificationBuilder::activity_graded("user-1", 1, "Reciclaje", GradeKind::Initial, 50);
        assert_eq!(initial.title, "Actividad calificada");
        assert_eq!(initial.notification_type, NotificationType::ActivityGraded);
        assert!(initial.message.contains("50"));

        let regrade =
            NotificationBuilder::activity_graded("user-1", 1, "Reciclaje", GradeKind::Regrade, 75);
        assert_eq!(regrade.title, "Actividad recalificada");
        assert_eq!(regrade.notification_type, NotificationType::ActivityRegraded);
        assert_eq!(regrade.data["points"], 75);
    }

    #[test]
    fn test_deleted_message_mentions_points_only_when_removed() {
        let with_points = NotificationBuilder::activity_deleted("user-1", 9, "Composta", 30);
        assert_eq!(with_points.title, "Actividad eliminada");
        assert!(with_points.message.contains("30 puntos"));

        let pending = NotificationBuilder::activity_deleted("user-1", 9, "Composta", 0);
        assert!(!pending.message.contains("puntos"));
    }

    #[test]
    fn test_redeemed_message_contains_folio_and_deadline() {
        let limit = Utc.with_ymd_and_hms(2026, 3, 16, 12, 0, 0).unwrap();
        let notification =
            NotificationBuilder::reward_redeemed("user-1", "Termo", "ABCD2345", limit);
        assert_eq!(notification.title, "Recompensa canjeada");
        assert!(notification.message.contains("ABCD2345"));
        assert!(notification.message.contains("16/03/2026"));
    }

    #[test]
    fn test_badge_earned() {
        let notification = NotificationBuilder::badge_earned("user-1", 1, "Primeros pasos");
        assert_eq!(notification.title, "¡Nueva insignia!");
        assert!(notification.message.contains("Primeros pasos"));
        assert_eq!(notification.user_id, "user-1");
    }
}
