//! 通知发送器
//!
//! 业务服务在事务提交后调用，异步投递通知，失败只记录日志

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use super::sink::NotificationSink;
use super::types::{Notification, NotificationBuilder};
use crate::models::GradeKind;

/// 通知发送器
#[derive(Clone)]
pub struct NotificationSender {
    sink: Arc<dyn NotificationSink>,
}

impl NotificationSender {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    pub fn send_activity_graded(
        &self,
        user_id: &str,
        activity_id: i64,
        activity_title: &str,
        kind: GradeKind,
        points: i32,
    ) {
        let notification =
            NotificationBuilder::activity_graded(user_id, activity_id, activity_title, kind, points);
        self.send_async(notification);
    }

    pub fn send_activity_deleted(
        &self,
        user_id: &str,
        activity_id: i64,
        activity_title: &str,
        points_removed: i64,
    ) {
        let notification = NotificationBuilder::activity_deleted(
            user_id,
            activity_id,
            activity_title,
            points_removed,
        );
        self.send_async(notification);
    }

    pub fn send_reward_redeemed(
        &self,
        user_id: &str,
        reward_title: &str,
        folio: &str,
        limit_to_use: DateTime<Utc>,
    ) {
        let notification =
            NotificationBuilder::reward_redeemed(user_id, reward_title, folio, limit_to_use);
        self.send_async(notification);
    }

    pub fn send_badge_earned(&self, user_id: &str, badge_id: i64, badge_name: &str) {
        let notification = NotificationBuilder::badge_earned(user_id, badge_id, badge_name);
        self.send_async(notification);
    }

    /// 异步发送通知（fire-and-forget）
    fn send_async(&self, notification: Notification) {
        let sink = self.sink.clone();

        tokio::spawn(async move {
            match sink.send(&notification).await {
                Ok(()) => {
                    info!(
                        notification_id = %notification.notification_id,
                        user_id = %notification.user_id,
                        notification_type = ?notification.notification_type,
                        "通知发送成功"
                    );
                }
                Err(e) => {
                    error!(
                        notification_id = %notification.notification_id,
                        user_id = %notification.user_id,
                        error = %e,
                        "通知发送失败"
                    );
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::notification::NotificationError;
    use crate::notification::sink::MemoryNotificationSink;
    use crate::notification::types::NotificationType;

    struct FailingSink;

    #[async_trait]
    impl NotificationSink for FailingSink {
        async fn send(&self, _notification: &Notification) -> Result<(), NotificationError> {
            Err(NotificationError::Delivery("canal caído".to_string()))
        }
    }

    #[tokio::test]
    async fn test_sender_delivers_asynchronously() {
        let sink = Arc::new(MemoryNotificationSink::new());
        let sender = NotificationSender::new(sink.clone());

        sender.send_activity_graded("user-1", 5, "Reciclaje", GradeKind::Initial, 50);
        sender.send_badge_earned("user-1", 1, "Primeros pasos");

        tokio::time::sleep(Duration::from_millis(50)).await;

        let sent = sink.sent().await;
        assert_eq!(sent.len(), 2);
        assert!(
            sent.iter()
                .any(|n| n.notification_type == NotificationType::BadgeEarned)
        );
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_panic() {
        let sender = NotificationSender::new(Arc::new(FailingSink));
        sender.send_activity_deleted("user-1", 5, "Reciclaje", 30);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
