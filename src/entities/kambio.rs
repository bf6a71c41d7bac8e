//! Kambio entity - The immutable savings ledger.
//!
//! Every change to a member's savings is one signed row here: logged savings,
//! completed goals, pool contributions, pool payouts and refunds. Rows are never
//! updated; corrections are new offsetting rows. The member's savings balance is
//! the sum of `amount_cents` over their rows.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What produced a ledger entry. The kind fixes the sign of the amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum KambioKind {
    /// A logged avoided purchase
    #[sea_orm(string_value = "save")]
    Save,
    /// Savings spent on a completed goal
    #[sea_orm(string_value = "complete_goal")]
    CompleteGoal,
    /// Savings pledged to a pool request
    #[sea_orm(string_value = "pool_contribution")]
    PoolContribution,
    /// Payout of a fully funded pool request
    #[sea_orm(string_value = "pool_receive")]
    PoolReceive,
    /// Return of a contribution from a cancelled request
    #[sea_orm(string_value = "pool_refund")]
    PoolRefund,
}

/// Credit/debit view of a [`KambioKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Increases savings
    Credit,
    /// Decreases savings
    Debit,
}

impl KambioKind {
    /// Whether entries of this kind add to or take from savings.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::Save | Self::PoolReceive | Self::PoolRefund => Direction::Credit,
            Self::CompleteGoal | Self::PoolContribution => Direction::Debit,
        }
    }

    /// Applies the kind's sign to an unsigned magnitude.
    #[must_use]
    pub const fn signed(self, magnitude_cents: i64) -> i64 {
        match self.direction() {
            Direction::Credit => magnitude_cents,
            Direction::Debit => -magnitude_cents,
        }
    }
}

/// Ledger entry database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "kambios")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Member whose savings this entry changes
    pub user_id: i64,
    /// Signed amount in cents (positive credits, negative debits)
    pub amount_cents: i64,
    /// What produced the entry
    pub transaction_type: KambioKind,
    /// Human-readable description
    pub description: String,
    /// Goal this saving was earmarked for, if any
    pub goal_id: Option<i64>,
    /// Pool request this entry relates to, if any
    pub pool_request_id: Option<i64>,
    /// Pool contribution this entry relates to, if any
    pub pool_contribution_id: Option<i64>,
    /// When the entry was recorded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Kambio and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one member
    #[sea_orm(
        belongs_to = "super::member::Entity",
        from = "Column::UserId",
        to = "super::member::Column::Id",
        on_delete = "Cascade"
    )]
    Member,
    /// Entries may reference a goal
    #[sea_orm(
        belongs_to = "super::goal::Entity",
        from = "Column::GoalId",
        to = "super::goal::Column::Id",
        on_delete = "SetNull"
    )]
    Goal,
    /// Entries may reference a pool request
    #[sea_orm(
        belongs_to = "super::pool_request::Entity",
        from = "Column::PoolRequestId",
        to = "super::pool_request::Column::Id",
        on_delete = "SetNull"
    )]
    PoolRequest,
    /// Entries may reference a pool contribution
    #[sea_orm(
        belongs_to = "super::pool_contribution::Entity",
        from = "Column::PoolContributionId",
        to = "super::pool_contribution::Column::Id",
        on_delete = "SetNull"
    )]
    PoolContribution,
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl Related<super::goal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Goal.def()
    }
}

impl Related<super::pool_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PoolRequest.def()
    }
}

impl Related<super::pool_contribution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PoolContribution.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
