//! User savings entity - Monthly aggregate of logged savings per member.
//!
//! One row per `(user_id, month, year)`; the uniqueness is enforced by an index
//! created alongside the table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Monthly savings aggregate model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_savings")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Member the aggregate belongs to
    pub user_id: i64,
    /// Calendar month (1-12)
    pub month: i32,
    /// Calendar year
    pub year: i32,
    /// Total logged savings for the period in cents
    pub total_saved_cents: i64,
    /// Number of kambios logged in the period
    pub kambio_count: i32,
    /// Last time the aggregate changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between UserSavings and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each aggregate belongs to one member
    #[sea_orm(
        belongs_to = "super::member::Entity",
        from = "Column::UserId",
        to = "super::member::Column::Id",
        on_delete = "Cascade"
    )]
    Member,
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
