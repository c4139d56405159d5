//! 徽章目录
//!
//! 静态徽章定义及其条件判定。条件是封闭的标签联合，
//! 由 [`BadgeCriteria::is_satisfied`] 统一判定，不依赖任何存储。
//!
//! 目录在服务启动时通过幂等 upsert 写入 `badges` 表，之后只读。

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::models::{ActivityType, CriteriaType, ReviewedStats};

/// 徽章获得条件
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(
    tag = "criteriaType",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum BadgeCriteria {
    /// 已审核活动数量达到阈值
    ActivityCount { threshold: i64 },
    /// 指定类型已审核活动的数量（quantity）累计达到阈值
    SpecificActivityTypeCount {
        activity_type: ActivityType,
        threshold: f64,
    },
    /// 积分余额达到阈值
    TotalPoints { threshold: i64 },
}

impl BadgeCriteria {
    pub fn criteria_type(&self) -> CriteriaType {
        match self {
            Self::ActivityCount { .. } => CriteriaType::ActivityCount,
            Self::SpecificActivityTypeCount { .. } => CriteriaType::SpecificActivityTypeCount,
            Self::TotalPoints { .. } => CriteriaType::TotalPoints,
        }
    }

    /// 阈值（入库统一为浮点）
    pub fn threshold(&self) -> f64 {
        match self {
            Self::ActivityCount { threshold } | Self::TotalPoints { threshold } => {
                *threshold as f64
            }
            Self::SpecificActivityTypeCount { threshold, .. } => *threshold,
        }
    }

    pub fn activity_type(&self) -> Option<ActivityType> {
        match self {
            Self::SpecificActivityTypeCount { activity_type, .. } => Some(*activity_type),
            _ => None,
        }
    }

    /// 判定当前进度是否满足条件
    pub fn is_satisfied(&self, progress: &UserProgress) -> bool {
        match self {
            Self::ActivityCount { threshold } => progress.reviewed_count >= *threshold,
            Self::TotalPoints { threshold } => progress.balance >= *threshold,
            Self::SpecificActivityTypeCount {
                activity_type,
                threshold,
            } => progress.quantity_of(*activity_type) >= *threshold,
        }
    }
}

/// 徽章定义
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeDefinition {
    pub id: i64,
    pub code: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub criteria: BadgeCriteria,
}

/// 用户当前进度，徽章评估的输入
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProgress {
    pub reviewed_count: i64,
    pub balance: i64,
    pub quantity_by_type: HashMap<ActivityType, f64>,
}

impl UserProgress {
    pub fn new(stats: ReviewedStats, balance: i64) -> Self {
        Self {
            reviewed_count: stats.reviewed_count,
            balance,
            quantity_by_type: stats.quantity_by_type,
        }
    }

    pub fn quantity_of(&self, activity_type: ActivityType) -> f64 {
        self.quantity_by_type
            .get(&activity_type)
            .copied()
            .unwrap_or(0.0)
    }
}

/// 标准徽章目录
///
/// id 与 code 一经发布不可修改，已发放的 user_badges 依赖它们
pub static BADGE_CATALOG: &[BadgeDefinition] = &[
    BadgeDefinition {
        id: 1,
        code: "FIRST_STEPS",
        name: "Primeros pasos",
        description: "Tu primera actividad ecológica fue revisada",
        criteria: BadgeCriteria::ActivityCount { threshold: 1 },
    },
    BadgeDefinition {
        id: 2,
        code: "ECO_CONSISTENT",
        name: "Eco constante",
        description: "10 actividades revisadas",
        criteria: BadgeCriteria::ActivityCount { threshold: 10 },
    },
    BadgeDefinition {
        id: 3,
        code: "ECO_HERO",
        name: "Eco héroe",
        description: "50 actividades revisadas",
        criteria: BadgeCriteria::ActivityCount { threshold: 50 },
    },
    BadgeDefinition {
        id: 4,
        code: "POINT_COLLECTOR",
        name: "Recolector de puntos",
        description: "Alcanza 500 puntos",
        criteria: BadgeCriteria::TotalPoints { threshold: 500 },
    },
    BadgeDefinition {
        id: 5,
        code: "GREEN_MILLIONAIRE",
        name: "Millonario verde",
        description: "Alcanza 1000 puntos",
        criteria: BadgeCriteria::TotalPoints { threshold: 1000 },
    },
    BadgeDefinition {
        id: 6,
        code: "RECYCLER",
        name: "Reciclador",
        description: "Recicla 50 kg de residuos",
        criteria: BadgeCriteria::SpecificActivityTypeCount {
            activity_type: ActivityType::Recycling,
            threshold: 50.0,
        },
    },
    BadgeDefinition {
        id: 7,
        code: "FOREST_GUARDIAN",
        name: "Guardián del bosque",
        description: "Planta 10 árboles",
        criteria: BadgeCriteria::SpecificActivityTypeCount {
            activity_type: ActivityType::TreePlanting,
            threshold: 10.0,
        },
    },
    BadgeDefinition {
        id: 8,
        code: "COMPOSTER",
        name: "Compostero",
        description: "Composta 20 kg de residuos orgánicos",
        criteria: BadgeCriteria::SpecificActivityTypeCount {
            activity_type: ActivityType::Composting,
            threshold: 20.0,
        },
    },
];

/// 徽章目录
#[derive(Debug, Clone)]
pub struct BadgeCatalog {
    definitions: Vec<BadgeDefinition>,
}

impl Default for BadgeCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl BadgeCatalog {
    pub fn standard() -> Self {
        Self::new(BADGE_CATALOG.to_vec())
    }

    pub fn new(definitions: Vec<BadgeDefinition>) -> Self {
        Self { definitions }
    }

    pub fn definitions(&self) -> &[BadgeDefinition] {
        &self.definitions
    }

    /// 尚未获得且当前已满足条件的徽章
    pub fn newly_satisfied<'a>(
        &'a self,
        progress: &UserProgress,
        obtained: &HashSet<i64>,
    ) -> Vec<&'a BadgeDefinition> {
        self.definitions
            .iter()
            .filter(|def| !obtained.contains(&def.id))
            .filter(|def| def.criteria.is_satisfied(progress))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(count: i64, balance: i64, quantities: &[(ActivityType, f64)]) -> UserProgress {
        UserProgress {
            reviewed_count: count,
            balance,
            quantity_by_type: quantities.iter().copied().collect(),
        }
    }

    #[test]
    fn test_catalog_ids_and_codes_are_unique() {
        let ids: HashSet<i64> = BADGE_CATALOG.iter().map(|def| def.id).collect();
        let codes: HashSet<&str> = BADGE_CATALOG.iter().map(|def| def.code).collect();
        assert_eq!(ids.len(), BADGE_CATALOG.len());
        assert_eq!(codes.len(), BADGE_CATALOG.len());
    }

    #[test]
    fn test_activity_count_threshold_is_inclusive() {
        let criteria = BadgeCriteria::ActivityCount { threshold: 10 };
        assert!(!criteria.is_satisfied(&progress(9, 0, &[])));
        assert!(criteria.is_satisfied(&progress(10, 0, &[])));
    }

    #[test]
    fn test_total_points_uses_balance() {
        let criteria = BadgeCriteria::TotalPoints { threshold: 500 };
        assert!(!criteria.is_satisfied(&progress(100, 499, &[])));
        assert!(criteria.is_satisfied(&progress(0, 500, &[])));
    }

    #[test]
    fn test_specific_type_sums_quantity_of_matching_type() {
        let criteria = BadgeCriteria::SpecificActivityTypeCount {
            activity_type: ActivityType::Recycling,
            threshold: 50.0,
        };
        assert!(!criteria.is_satisfied(&progress(
            3,
            0,
            &[(ActivityType::Recycling, 49.5), (ActivityType::Composting, 100.0)]
        )));
        assert!(criteria.is_satisfied(&progress(3, 0, &[(ActivityType::Recycling, 50.0)])));
        assert!(!criteria.is_satisfied(&progress(3, 0, &[])));
    }

    #[test]
    fn test_newly_satisfied_skips_obtained() {
        let catalog = BadgeCatalog::standard();
        let current = progress(1, 600, &[]);

        let fresh = catalog.newly_satisfied(&current, &HashSet::new());
        let codes: Vec<&str> = fresh.iter().map(|def| def.code).collect();
        assert_eq!(codes, vec!["FIRST_STEPS", "POINT_COLLECTOR"]);

        let obtained: HashSet<i64> = [1].into_iter().collect();
        let fresh = catalog.newly_satisfied(&current, &obtained);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].code, "POINT_COLLECTOR");
    }

    #[test]
    fn test_criteria_storage_columns() {
        let def = catalog_entry("FOREST_GUARDIAN");
        assert_eq!(
            def.criteria.criteria_type(),
            CriteriaType::SpecificActivityTypeCount
        );
        assert_eq!(def.criteria.threshold(), 10.0);
        assert_eq!(def.criteria.activity_type(), Some(ActivityType::TreePlanting));

        let def = catalog_entry("ECO_HERO");
        assert_eq!(def.criteria.threshold(), 50.0);
        assert_eq!(def.criteria.activity_type(), None);
    }

    #[test]
    fn test_criteria_serialization() {
        let json = serde_json::to_value(catalog_entry("RECYCLER").criteria).unwrap();
        assert_eq!(json["criteriaType"], "SPECIFIC_ACTIVITY_TYPE_COUNT");
        assert_eq!(json["activityType"], "RECYCLING");
        assert_eq!(json["threshold"], 50.0);
    }

    fn catalog_entry(code: &str) -> BadgeDefinition {
        BADGE_CATALOG
            .iter()
            .find(|def| def.code == code)
            .cloned()
            .unwrap()
    }
}
