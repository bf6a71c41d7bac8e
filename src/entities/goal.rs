//! Goal entity - A named personal savings target.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Goal database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "goals")]
pub struct Model {
    /// Unique identifier for the goal
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning member
    pub user_id: i64,
    /// Name of the goal (e.g., "New headphones")
    pub name: String,
    /// Target amount in cents
    pub target_cents: i64,
    /// Amount actually spent when the goal was completed
    pub completed_cents: Option<i64>,
    /// When the goal was created
    pub created_at: DateTimeUtc,
    /// When the goal was completed, if it has been
    pub completed_at: Option<DateTimeUtc>,
}

/// Defines relationships between Goal and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each goal belongs to one member
    #[sea_orm(
        belongs_to = "super::member::Entity",
        from = "Column::UserId",
        to = "super::member::Column::Id",
        on_delete = "Cascade"
    )]
    Member,
    /// Savings logged toward this goal
    #[sea_orm(has_many = "super::kambio::Entity")]
    Kambios,
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl Related<super::kambio::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Kambios.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
