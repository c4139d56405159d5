//! 服务层数据传输对象
//!
//! 定义服务层与外部交互使用的请求与结果，与内部领域模型解耦

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Activity, ActivityStatus, ActivityType, GradeKind, GradePoints};

/// 活动评分 / 编辑请求
///
/// `points` 为空时只更新元数据；元数据与评分可以在同一请求中同时修改
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GradeActivityRequest {
    pub activity_id: i64,
    pub points: Option<GradePoints>,
    #[validate(length(min = 1, max = 120, message = "título debe tener entre 1 y 120 caracteres"))]
    pub title: Option<String>,
    #[validate(length(max = 2000, message = "descripción demasiado larga"))]
    pub description: Option<String>,
    pub activity_type: Option<ActivityType>,
    #[validate(range(exclusive_min = 0.0, message = "la cantidad debe ser mayor a 0"))]
    pub quantity: Option<f64>,
    pub occurred_at: Option<DateTime<Utc>>,
    /// 需要移除的证据 key，必须属于该活动
    #[serde(default)]
    pub remove_evidence: Vec<String>,
}

impl GradeActivityRequest {
    pub fn new(activity_id: i64) -> Self {
        Self {
            activity_id,
            ..Default::default()
        }
    }

    pub fn with_points(mut self, points: GradePoints) -> Self {
        self.points = Some(points);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_activity_type(mut self, activity_type: ActivityType) -> Self {
        self.activity_type = Some(activity_type);
        self
    }

    pub fn removing_evidence(mut self, keys: Vec<String>) -> Self {
        self.remove_evidence = keys;
        self
    }

    pub fn has_metadata_changes(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.activity_type.is_some()
            || self.quantity.is_some()
            || self.occurred_at.is_some()
            || !self.remove_evidence.is_empty()
    }

    /// 将元数据修改应用到活动上
    pub fn apply_metadata(&self, activity: &mut Activity) {
        if let Some(title) = &self.title {
            activity.title = title.clone();
        }
        if let Some(description) = &self.description {
            activity.description = Some(description.clone());
        }
        if let Some(activity_type) = self.activity_type {
            activity.activity_type = activity_type;
        }
        if let Some(quantity) = self.quantity {
            activity.quantity = quantity;
        }
        if let Some(occurred_at) = self.occurred_at {
            activity.occurred_at = occurred_at;
        }
        if !self.remove_evidence.is_empty() {
            activity
                .evidence_keys
                .retain(|key| !self.remove_evidence.contains(key));
        }
    }
}

/// 评分计划
///
/// 由评分前的活动状态与新面额计算，差额基于活动当前记入的积分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradePlan {
    pub kind: GradeKind,
    pub previous_points: i32,
    pub new_points: i32,
    pub delta: i64,
}

impl GradePlan {
    pub fn compute(status: ActivityStatus, previous_points: i32, awarded: GradePoints) -> Self {
        let new_points = awarded.value();
        Self {
            kind: GradeKind::from_status(status),
            previous_points,
            new_points,
            delta: i64::from(new_points) - i64::from(previous_points),
        }
    }
}

/// 评分 / 编辑结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeOutcome {
    pub activity: Activity,
    /// 只编辑元数据时为 None
    pub plan: Option<GradePlan>,
    /// 评分后用户余额，只编辑元数据时为 None
    pub balance: Option<i64>,
}

/// 删除结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub activity_id: i64,
    pub user_id: String,
    /// 从余额中扣回的积分（经下限截断后的实际值）
    pub points_removed: i64,
    pub balance: i64,
}

/// 手动调整积分请求
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ManualAdjustRequest {
    #[validate(length(min = 1, max = 64))]
    pub user_id: String,
    #[validate(range(min = -1_000_000, max = 1_000_000, message = "ajuste fuera de rango"))]
    pub delta: i64,
    #[validate(length(min = 1, max = 200, message = "se requiere un motivo"))]
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_activity() -> Activity {
        let now = Utc::now();
        Activity {
            id: 1,
            user_id: "user-1".to_string(),
            title: "Reciclaje".to_string(),
            description: None,
            activity_type: ActivityType::Recycling,
            quantity: 2.0,
            status: ActivityStatus::Reviewed,
            points: 30,
            evidence_keys: vec!["a.jpg".to_string(), "b.jpg".to_string()],
            occurred_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_grade_plan_initial_uses_zero_baseline() {
        let plan = GradePlan::compute(ActivityStatus::PendingReview, 0, GradePoints::Fifty);
        assert_eq!(plan.kind, GradeKind::Initial);
        assert_eq!(plan.delta, 50);
    }

    #[test]
    fn test_grade_plan_regrade_is_delta() {
        let plan = GradePlan::compute(ActivityStatus::Reviewed, 30, GradePoints::SeventyFive);
        assert_eq!(plan.kind, GradeKind::Regrade);
        assert_eq!(plan.delta, 45);

        let down = GradePlan::compute(ActivityStatus::Reviewed, 100, GradePoints::Ten);
        assert_eq!(down.delta, -90);

        let same = GradePlan::compute(ActivityStatus::Reviewed, 50, GradePoints::Fifty);
        assert_eq!(same.delta, 0);
    }

    #[test]
    fn test_regrade_sequence_matches_direct_grade() {
        let first = GradePlan::compute(ActivityStatus::PendingReview, 0, GradePoints::Thirty);
        let second = GradePlan::compute(ActivityStatus::Reviewed, first.new_points, GradePoints::Fifty);
        let direct = GradePlan::compute(ActivityStatus::PendingReview, 0, GradePoints::Fifty);
        assert_eq!(first.delta + second.delta, direct.delta);
    }

    #[test]
    fn test_validation_rejects_bad_metadata() {
        let mut request = GradeActivityRequest::new(1).with_title("");
        assert!(request.validate().is_err());

        request = GradeActivityRequest::new(1).with_quantity(0.0);
        assert!(request.validate().is_err());

        request = GradeActivityRequest::new(1)
            .with_title("Composta casera")
            .with_quantity(3.5);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_has_metadata_changes() {
        assert!(!GradeActivityRequest::new(1).has_metadata_changes());
        assert!(
            !GradeActivityRequest::new(1)
                .with_points(GradePoints::Ten)
                .has_metadata_changes()
        );
        assert!(
            GradeActivityRequest::new(1)
                .removing_evidence(vec!["a.jpg".to_string()])
                .has_metadata_changes()
        );
    }

    #[test]
    fn test_apply_metadata() {
        let mut activity = sample_activity();
        GradeActivityRequest::new(1)
            .with_title("Reciclaje de vidrio")
            .with_activity_type(ActivityType::Composting)
            .removing_evidence(vec!["a.jpg".to_string()])
            .apply_metadata(&mut activity);

        assert_eq!(activity.title, "Reciclaje de vidrio");
        assert_eq!(activity.activity_type, ActivityType::Composting);
        assert_eq!(activity.evidence_keys, vec!["b.jpg".to_string()]);
        assert_eq!(activity.points, 30);
    }

    #[test]
    fn test_request_deserializes_points_denomination() {
        let request: GradeActivityRequest =
            serde_json::from_str(r#"{"activityId": 4, "points": 75}"#).unwrap();
        assert_eq!(request.points, Some(GradePoints::SeventyFive));

        let invalid = serde_json::from_str::<GradeActivityRequest>(r#"{"activityId": 4, "points": 60}"#);
        assert!(invalid.is_err());
    }

    #[test]
    fn test_manual_adjust_requires_reason() {
        let request = ManualAdjustRequest {
            user_id: "user-1".to_string(),
            delta: -20,
            reason: String::new(),
        };
        assert!(request.validate().is_err());
    }
}
