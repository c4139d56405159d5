//! 通知投递端
//!
//! 实际的推送渠道由外部系统提供，这里只定义投递接口

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use super::NotificationError;
use super::types::Notification;

/// 通知投递接口
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// 只写日志的投递端，未接入推送渠道时使用
#[derive(Debug, Default)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        info!(
            notification_id = %notification.notification_id,
            user_id = %notification.user_id,
            notification_type = ?notification.notification_type,
            title = %notification.title,
            "通知已投递（日志）"
        );
        Ok(())
    }
}

/// 内存投递端，保存所有收到的通知
#[derive(Debug, Default)]
pub struct MemoryNotificationSink {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已收到通知的副本
    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }

    /// 指定用户收到的通知
    pub async fn sent_to(&self, user_id: &str) -> Vec<Notification> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationSink for MemoryNotificationSink {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::types::NotificationType;

    #[tokio::test]
    async fn test_memory_sink_records_by_user() {
        let sink = MemoryNotificationSink::new();
        sink.send(&Notification::new(
            "user-1",
            NotificationType::BadgeEarned,
            "a",
            "b",
        ))
        .await
        .unwrap();
        sink.send(&Notification::new(
            "user-2",
            NotificationType::RewardRedeemed,
            "c",
            "d",
        ))
        .await
        .unwrap();

        assert_eq!(sink.sent().await.len(), 2);
        let for_user = sink.sent_to("user-1").await;
        assert_eq!(for_user.len(), 1);
        assert_eq!(for_user[0].notification_type, NotificationType::BadgeEarned);
    }

    #[tokio::test]
    async fn test_log_sink_accepts_everything() {
        let sink = LogNotificationSink;
        let result = sink
            .send(&Notification::new(
                "user-1",
                NotificationType::ActivityDeleted,
                "t",
                "m",
            ))
            .await;
        assert!(result.is_ok());
    }
}
