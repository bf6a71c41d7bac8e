//! Ledger Store - append-only access to the `kambios` table.
//!
//! Nothing in this module updates or deletes a ledger row. Every entry is written
//! with the sign implied by its [`KambioKind`], so callers pass magnitudes only.

use crate::{
    entities::{Kambio, KambioKind, Member, kambio, member},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// An entry about to be appended.
#[derive(Debug, Clone)]
pub struct NewEntry {
    /// Member whose savings change
    pub member_id: i64,
    /// What produced the entry
    pub kind: KambioKind,
    /// Unsigned amount in cents
    pub magnitude_cents: i64,
    /// Human-readable description
    pub description: String,
    /// Linked goal, if any
    pub goal_id: Option<i64>,
    /// Linked pool request, if any
    pub pool_request_id: Option<i64>,
    /// Linked pool contribution, if any
    pub pool_contribution_id: Option<i64>,
}

impl NewEntry {
    /// Entry with no links; use the `with_*` helpers to attach them.
    pub fn new(
        member_id: i64,
        kind: KambioKind,
        magnitude_cents: i64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            member_id,
            kind,
            magnitude_cents,
            description: description.into(),
            goal_id: None,
            pool_request_id: None,
            pool_contribution_id: None,
        }
    }

    /// Links the entry to a goal.
    #[must_use]
    pub const fn with_goal(mut self, goal_id: Option<i64>) -> Self {
        self.goal_id = goal_id;
        self
    }

    /// Links the entry to a pool request.
    #[must_use]
    pub const fn with_request(mut self, request_id: i64) -> Self {
        self.pool_request_id = Some(request_id);
        self
    }

    /// Links the entry to a pool contribution.
    #[must_use]
    pub const fn with_contribution(mut self, contribution_id: i64) -> Self {
        self.pool_contribution_id = Some(contribution_id);
        self
    }
}

/// Appends one signed entry to the ledger.
pub async fn append_entry<C>(conn: &C, entry: NewEntry) -> Result<kambio::Model>
where
    C: ConnectionTrait,
{
    if entry.magnitude_cents <= 0 {
        return Err(Error::InvariantViolation {
            message: format!(
                "ledger entries need a positive magnitude, got {} for {:?}",
                entry.magnitude_cents, entry.kind
            ),
        });
    }

    let model = kambio::ActiveModel {
        user_id: Set(entry.member_id),
        amount_cents: Set(entry.kind.signed(entry.magnitude_cents)),
        transaction_type: Set(entry.kind),
        description: Set(entry.description),
        goal_id: Set(entry.goal_id),
        pool_request_id: Set(entry.pool_request_id),
        pool_contribution_id: Set(entry.pool_contribution_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    model.insert(conn).await.map_err(Into::into)
}

/// Loads a member or fails with [`Error::MemberNotFound`].
pub async fn require_member<C>(conn: &C, member_id: i64) -> Result<member::Model>
where
    C: ConnectionTrait,
{
    Member::find_by_id(member_id)
        .one(conn)
        .await?
        .ok_or(Error::MemberNotFound { id: member_id })
}

/// All ledger entries for a member, newest first.
pub async fn entries_for_member<C>(conn: &C, member_id: i64) -> Result<Vec<kambio::Model>>
where
    C: ConnectionTrait,
{
    Kambio::find()
        .filter(kambio::Column::UserId.eq(member_id))
        .order_by_desc(kambio::Column::Id)
        .all(conn)
        .await
        .map_err(Into::into)
}

/// Ledger entries linked to a pool request, oldest first.
pub async fn entries_for_request<C>(conn: &C, request_id: i64) -> Result<Vec<kambio::Model>>
where
    C: ConnectionTrait,
{
    Kambio::find()
        .filter(kambio::Column::PoolRequestId.eq(request_id))
        .order_by_asc(kambio::Column::Id)
        .all(conn)
        .await
        .map_err(Into::into)
}
