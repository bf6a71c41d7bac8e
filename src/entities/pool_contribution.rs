//! Pool contribution entity - One member's pledge toward a pool request.
//!
//! Contributions are never deleted by the service; a cancelled request flags them
//! refunded instead.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Pool contribution database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pool_contributions")]
pub struct Model {
    /// Unique identifier for the contribution
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Contributing member
    pub user_id: i64,
    /// Request this contribution funds
    pub pool_request_id: i64,
    /// Contributed amount in cents
    pub amount_cents: i64,
    /// Set once the contribution has been returned to its member
    pub is_refunded: bool,
    /// When the contribution was made
    pub created_at: DateTimeUtc,
    /// When the contribution was refunded
    pub refunded_at: Option<DateTimeUtc>,
}

/// Defines relationships between PoolContribution and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each contribution belongs to its contributing member
    #[sea_orm(
        belongs_to = "super::member::Entity",
        from = "Column::UserId",
        to = "super::member::Column::Id",
        on_delete = "Cascade"
    )]
    Member,
    /// Each contribution targets one request
    #[sea_orm(
        belongs_to = "super::pool_request::Entity",
        from = "Column::PoolRequestId",
        to = "super::pool_request::Column::Id",
        on_delete = "Cascade"
    )]
    PoolRequest,
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl Related<super::pool_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PoolRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
