//! 数据库仓储层
//!
//! 提供所有实体的数据访问接口，封装 SQL 操作细节。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - 事务控制由调用方（服务层）决定，事务内操作以 `*_in_tx` 关联函数提供
//! - 读接口定义 trait 以支持 mock 测试

mod activity_repo;
mod badge_repo;
mod points_repo;
mod redemption_repo;
mod reward_repo;
mod traits;

pub use activity_repo::ActivityRepository;
pub use badge_repo::BadgeRepository;
pub use points_repo::PointsRepository;
pub use redemption_repo::{NewRedemption, RedemptionRepository};
pub use reward_repo::RewardRepository;
pub use traits::*;
