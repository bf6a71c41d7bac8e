//! Member entity - A user taking part in the savings pool.
//!
//! Members own their ledger entries, goals, pool requests and contributions; all of
//! them are removed with the member. The savings balance is never stored here, it is
//! derived from the `kambios` ledger.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Member database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the member
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name shown to other pool members
    #[sea_orm(unique)]
    pub name: String,
    /// When the member joined
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Member and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One member has many ledger entries
    #[sea_orm(has_many = "super::kambio::Entity")]
    Kambios,
    /// One member has many goals
    #[sea_orm(has_many = "super::goal::Entity")]
    Goals,
    /// One member has many pool requests
    #[sea_orm(has_many = "super::pool_request::Entity")]
    PoolRequests,
    /// One member has many pool contributions
    #[sea_orm(has_many = "super::pool_contribution::Entity")]
    PoolContributions,
}

impl Related<super::kambio::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Kambios.def()
    }
}

impl Related<super::goal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Goals.def()
    }
}

impl Related<super::pool_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PoolRequests.def()
    }
}

impl Related<super::pool_contribution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PoolContributions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
