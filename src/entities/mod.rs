//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod goal;
pub mod idempotency_key;
pub mod kambio;
pub mod member;
pub mod pool_contribution;
pub mod pool_request;
pub mod user_savings;

// Re-export specific types to avoid conflicts
pub use goal::{Column as GoalColumn, Entity as Goal, Model as GoalModel};
pub use idempotency_key::{
    Column as IdempotencyKeyColumn, Entity as IdempotencyKey, Model as IdempotencyKeyModel,
};
pub use kambio::{Column as KambioColumn, Entity as Kambio, KambioKind, Model as KambioModel};
pub use member::{Column as MemberColumn, Entity as Member, Model as MemberModel};
pub use pool_contribution::{
    Column as PoolContributionColumn, Entity as PoolContribution, Model as PoolContributionModel,
};
pub use pool_request::{
    Column as PoolRequestColumn, Entity as PoolRequest, Model as PoolRequestModel, RequestStatus,
};
pub use user_savings::{
    Column as UserSavingsColumn, Entity as UserSavings, Model as UserSavingsModel,
};
