//! 用户通知
//!
//! 评分、删除、兑换和获得徽章后向用户发送通知。
//! 通知在数据库事务提交后异步发送，发送失败不影响触发它的业务操作。

pub mod sender;
pub mod sink;
pub mod types;

use thiserror::Error;

pub use sender::NotificationSender;
pub use sink::{LogNotificationSink, MemoryNotificationSink, NotificationSink};
pub use types::{Notification, NotificationBuilder, NotificationType};

/// 通知投递错误
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("通知投递失败: {0}")]
    Delivery(String),
}
