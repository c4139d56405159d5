//! 积分玩法服务
//!
//! 用户提交环保活动，审核员评分后积分入账，满足条件时自动获得徽章，
//! 积分可兑换限量、限时的奖励。
//!
//! ## 核心功能
//!
//! - **积分账本**：权威余额与流水，余额永不为负
//! - **活动审核**：待审核 → 已审核（可再次评分），删除时冲回积分
//! - **徽章评估**：余额或活动变化后自动发放，徽章只增不减
//! - **奖励兑换**：库存扣减、扣分、凭证发放在同一事务内完成
//! - **通知发送**：事务提交后异步通知用户
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `catalog`: 静态徽章目录与条件判定
//! - `error`: 错误类型定义
//! - `repository`: 数据库仓储层
//! - `service`: 业务服务层
//! - `notification`: 用户通知
//! - `evidence`: 证据文件存储边界
//! - `app`: 服务装配

pub mod app;
pub mod catalog;
pub mod error;
pub mod evidence;
pub mod models;
pub mod notification;
pub mod repository;
pub mod service;

/// 内嵌的数据库迁移
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

pub use app::GamificationServices;
pub use catalog::{BADGE_CATALOG, BadgeCatalog, BadgeCriteria, BadgeDefinition, UserProgress};
pub use error::{ErrorKind, LedgerError, Result};
pub use evidence::{EvidenceDeletion, EvidenceStore, LocalEvidenceStore};
pub use models::*;
pub use notification::{
    LogNotificationSink, MemoryNotificationSink, Notification, NotificationSender,
    NotificationSink, NotificationType,
};
pub use service::{
    ActivityReviewWorkflow, BadgeEvaluator, PointsLedger, QueryService, RedemptionEngine, dto,
};
