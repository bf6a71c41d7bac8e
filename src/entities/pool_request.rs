//! Pool request entity - A member's ask for collective funding.
//!
//! `funded_cents` caches the sum of the request's non-refunded contributions and is
//! only written inside the same database transaction that writes those contributions.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a pool request. `Completed` and `Cancelled` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Accepting contributions
    #[sea_orm(string_value = "active")]
    Active,
    /// Fully funded and paid out
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Deleted by its owner, all contributions refunded
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Pool request database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pool_requests")]
pub struct Model {
    /// Unique identifier for the request
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Requesting member
    pub user_id: i64,
    /// Requested amount in cents
    pub amount_cents: i64,
    /// Sum of active contributions in cents
    pub funded_cents: i64,
    /// Why the member needs the money
    pub description: String,
    /// Current lifecycle state
    pub status: RequestStatus,
    /// When the request was created
    pub created_at: DateTimeUtc,
    /// When the request was fully funded
    pub completed_at: Option<DateTimeUtc>,
    /// When the request was cancelled
    pub cancelled_at: Option<DateTimeUtc>,
}

impl Model {
    /// Amount still needed, never negative.
    #[must_use]
    pub fn remaining_cents(&self) -> i64 {
        (self.amount_cents - self.funded_cents).max(0)
    }
}

/// Defines relationships between PoolRequest and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each request belongs to its requesting member
    #[sea_orm(
        belongs_to = "super::member::Entity",
        from = "Column::UserId",
        to = "super::member::Column::Id",
        on_delete = "Cascade"
    )]
    Member,
    /// Contributions pledged to this request
    #[sea_orm(has_many = "super::pool_contribution::Entity")]
    Contributions,
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl Related<super::pool_contribution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contributions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
