//! 积分玩法枚举类型定义
//!
//! 所有持久化枚举都支持数据库（sqlx）和 JSON（serde）序列化

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// 环保活动类型
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    /// 回收（按公斤计）
    Recycling,
    /// 植树（按棵计）
    TreePlanting,
    /// 堆肥（按公斤计）
    Composting,
    /// 节水（按升计）
    WaterSaving,
    /// 绿色出行（按公里计）
    SustainableTransport,
    /// 社区清洁（按次计）
    Cleanup,
    /// 节能（按千瓦时计）
    EnergySaving,
}

impl ActivityType {
    pub const ALL: [ActivityType; 7] = [
        Self::Recycling,
        Self::TreePlanting,
        Self::Composting,
        Self::WaterSaving,
        Self::SustainableTransport,
        Self::Cleanup,
        Self::EnergySaving,
    ];

    /// 数据库存储值
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recycling => "RECYCLING",
            Self::TreePlanting => "TREE_PLANTING",
            Self::Composting => "COMPOSTING",
            Self::WaterSaving => "WATER_SAVING",
            Self::SustainableTransport => "SUSTAINABLE_TRANSPORT",
            Self::Cleanup => "CLEANUP",
            Self::EnergySaving => "ENERGY_SAVING",
        }
    }
}

/// 活动审核状态
///
/// PENDING_REVIEW 为初始状态；REVIEWED 可被再次评分，删除直接移除记录
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityStatus {
    /// 待审核 - 提交后尚未评分，积分为 0
    #[default]
    PendingReview,
    /// 已审核 - 已评分并计入用户积分
    Reviewed,
}

/// 评分面额
///
/// 评分只能取固定面额，在边界处完成校验，内部不再出现任意整数分值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum GradePoints {
    Ten,
    Thirty,
    Fifty,
    SeventyFive,
    Hundred,
}

impl GradePoints {
    pub const ALL: [GradePoints; 5] = [
        Self::Ten,
        Self::Thirty,
        Self::Fifty,
        Self::SeventyFive,
        Self::Hundred,
    ];

    /// 面额对应的积分
    pub fn value(self) -> i32 {
        match self {
            Self::Ten => 10,
            Self::Thirty => 30,
            Self::Fifty => 50,
            Self::SeventyFive => 75,
            Self::Hundred => 100,
        }
    }
}

impl TryFrom<i32> for GradePoints {
    type Error = LedgerError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|grade| grade.value() == value)
            .ok_or(LedgerError::InvalidGradePoints(value))
    }
}

impl From<GradePoints> for i32 {
    fn from(grade: GradePoints) -> Self {
        grade.value()
    }
}

/// 评分类型
///
/// 由评分前的活动状态决定：待审核为首次评分，已审核为再次评分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GradeKind {
    Initial,
    Regrade,
}

impl GradeKind {
    pub fn from_status(status: ActivityStatus) -> Self {
        match status {
            ActivityStatus::PendingReview => Self::Initial,
            ActivityStatus::Reviewed => Self::Regrade,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Regrade => "regrade",
        }
    }
}

/// 积分流水变动类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    /// 首次评分入账
    Grade,
    /// 再次评分的差额调整
    Regrade,
    /// 删除已评分活动的冲回
    ActivityDeleted,
    /// 兑换奖励扣减
    Redemption,
    /// 运营手动调整
    ManualAdjustment,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grade => "GRADE",
            Self::Regrade => "REGRADE",
            Self::ActivityDeleted => "ACTIVITY_DELETED",
            Self::Redemption => "REDEMPTION",
            Self::ManualAdjustment => "MANUAL_ADJUSTMENT",
        }
    }
}

impl From<GradeKind> for ChangeType {
    fn from(kind: GradeKind) -> Self {
        match kind {
            GradeKind::Initial => Self::Grade,
            GradeKind::Regrade => Self::Regrade,
        }
    }
}

/// 徽章条件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CriteriaType {
    /// 已审核活动数量
    ActivityCount,
    /// 指定类型活动的累计数量
    SpecificActivityTypeCount,
    /// 积分余额
    TotalPoints,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_points_accepts_only_fixed_denominations() {
        for value in [10, 30, 50, 75, 100] {
            let grade = GradePoints::try_from(value).unwrap();
            assert_eq!(grade.value(), value);
        }

        for value in [0, -10, 20, 40, 99, 101] {
            assert!(matches!(
                GradePoints::try_from(value),
                Err(LedgerError::InvalidGradePoints(v)) if v == value
            ));
        }
    }

    #[test]
    fn test_grade_points_serde() {
        let grade: GradePoints = serde_json::from_str("75").unwrap();
        assert_eq!(grade, GradePoints::SeventyFive);
        assert_eq!(serde_json::to_string(&GradePoints::Ten).unwrap(), "10");
        assert!(serde_json::from_str::<GradePoints>("60").is_err());
    }

    #[test]
    fn test_grade_kind_follows_previous_status() {
        assert_eq!(
            GradeKind::from_status(ActivityStatus::PendingReview),
            GradeKind::Initial
        );
        assert_eq!(
            GradeKind::from_status(ActivityStatus::Reviewed),
            GradeKind::Regrade
        );
        assert_eq!(ChangeType::from(GradeKind::Regrade), ChangeType::Regrade);
    }

    #[test]
    fn test_activity_type_serialization_matches_storage() {
        for activity_type in ActivityType::ALL {
            let json = serde_json::to_value(activity_type).unwrap();
            assert_eq!(json, activity_type.as_str());
        }
        assert_eq!(
            serde_json::to_value(ActivityStatus::PendingReview).unwrap(),
            "PENDING_REVIEW"
        );
    }
}
