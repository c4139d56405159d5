//! 积分玩法服务错误类型
//!
//! 定义服务层的业务错误和系统错误，并映射到统一的错误分类：
//! 资源不存在、参数校验、业务规则、并发冲突、存储不可用。
//! 徽章评估、通知、证据文件清理等辅助路径的失败不在此处建模，只记录日志。

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    BusinessRule,
    ConcurrencyConflict,
    Unavailable,
}

/// 积分玩法服务错误类型
#[derive(Debug, Error)]
pub enum LedgerError {
    // === 资源不存在 ===
    #[error("活动不存在: {0}")]
    ActivityNotFound(i64),

    #[error("用户不存在: {0}")]
    UserNotFound(String),

    #[error("奖励不存在: {0}")]
    RewardNotFound(i64),

    #[error("兑换凭证不存在: {0}")]
    RedemptionNotFound(String),

    // === 参数校验 ===
    #[error("无效的评分分值: {0}，允许的分值为 10/30/50/75/100")]
    InvalidGradePoints(i32),

    #[error("参数校验失败: {0}")]
    Validation(String),

    // === 业务规则 ===
    #[error("奖励不可兑换: reward_id={0}")]
    RewardUnavailable(i64),

    #[error("奖励已过期: reward_id={reward_id}, expired_at={expired_at}")]
    RewardExpired {
        reward_id: i64,
        expired_at: DateTime<Utc>,
    },

    #[error("积分不足: 需要 {required}, 可用 {available}")]
    InsufficientPoints { required: i64, available: i64 },

    // === 系统错误 ===
    #[error("并发冲突，请重试")]
    ConcurrencyConflict,

    #[error("数据库错误: {0}")]
    Database(sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 积分玩法服务 Result 类型别名
pub type Result<T> = std::result::Result<T, LedgerError>;

/// PostgreSQL 中表示事务竞争失败的 SQLSTATE
///
/// - 40001: serialization_failure
/// - 40P01: deadlock_detected
/// - 55P03: lock_not_available（NOWAIT）
const CONFLICT_SQLSTATES: [&str; 3] = ["40001", "40P01", "55P03"];

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        let is_conflict = err
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| CONFLICT_SQLSTATES.iter().any(|state| *state == code));

        if is_conflict {
            Self::ConcurrencyConflict
        } else {
            Self::Database(err)
        }
    }
}

impl From<validator::ValidationErrors> for LedgerError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl LedgerError {
    /// 错误分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ActivityNotFound(_)
            | Self::UserNotFound(_)
            | Self::RewardNotFound(_)
            | Self::RedemptionNotFound(_) => ErrorKind::NotFound,
            Self::InvalidGradePoints(_) | Self::Validation(_) => ErrorKind::Validation,
            Self::RewardUnavailable(_)
            | Self::RewardExpired { .. }
            | Self::InsufficientPoints { .. } => ErrorKind::BusinessRule,
            Self::ConcurrencyConflict => ErrorKind::ConcurrencyConflict,
            Self::Database(_) | Self::Serialization(_) | Self::Internal(_) => {
                ErrorKind::Unavailable
            }
        }
    }

    /// 检查是否为可重试的错误
    ///
    /// 核心保证失败时不留下部分写入，因此并发冲突和存储故障可以整体重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ConcurrencyConflict | ErrorKind::Unavailable
        ) && !matches!(self, Self::Serialization(_))
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotFound | ErrorKind::Validation | ErrorKind::BusinessRule
        )
    }

    /// 对应的 HTTP 语义状态码
    pub fn http_status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Validation | ErrorKind::BusinessRule => StatusCode::BAD_REQUEST,
            ErrorKind::ConcurrencyConflict => StatusCode::CONFLICT,
            ErrorKind::Unavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ActivityNotFound(_) => "ACTIVITY_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::RewardNotFound(_) => "REWARD_NOT_FOUND",
            Self::RedemptionNotFound(_) => "REDEMPTION_NOT_FOUND",
            Self::InvalidGradePoints(_) => "INVALID_GRADE_POINTS",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::RewardUnavailable(_) => "REWARD_UNAVAILABLE",
            Self::RewardExpired { .. } => "REWARD_EXPIRED",
            Self::InsufficientPoints { .. } => "INSUFFICIENT_POINTS",
            Self::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
