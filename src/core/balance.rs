//! Balance Calculator - a member's savings, derived from the ledger.
//!
//! There is no stored balance column: available savings are the signed sum of the
//! member's `kambios` rows. Refunds are offsetting credits, so a refunded
//! contribution and its refund cancel out in the sum. Call these functions with the
//! same transaction the caller writes through so reads and writes share a snapshot.

use crate::{
    core::ledger,
    entities::{Kambio, PoolContribution, PoolRequest, RequestStatus, kambio, pool_contribution, pool_request},
    errors::Result,
};
use sea_orm::{QuerySelect, prelude::*, sea_query::Expr};

/// A member's savings split into what is spendable and what is pledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberSavings {
    /// Member the figures belong to
    pub member_id: i64,
    /// Signed ledger sum in cents
    pub available_cents: i64,
    /// Non-refunded contributions sitting in still-active requests, in cents
    pub committed_cents: i64,
}

impl MemberSavings {
    /// Savings before active pledges were taken out.
    #[must_use]
    pub const fn total_cents(&self) -> i64 {
        self.available_cents + self.committed_cents
    }
}

/// `availableSavings(memberId)`: the signed sum of the member's ledger entries.
///
/// # Errors
/// [`crate::errors::Error::MemberNotFound`] for an unknown member.
pub async fn available_savings<C>(conn: &C, member_id: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    ledger::require_member(conn, member_id).await?;
    ledger_sum(conn, member_id).await
}

/// Available and committed savings for a member.
pub async fn member_savings<C>(conn: &C, member_id: i64) -> Result<MemberSavings>
where
    C: ConnectionTrait,
{
    let available_cents = available_savings(conn, member_id).await?;
    let committed_cents = committed_cents(conn, member_id).await?;
    Ok(MemberSavings {
        member_id,
        available_cents,
        committed_cents,
    })
}

async fn ledger_sum<C>(conn: &C, member_id: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    let total: Option<Option<i64>> = Kambio::find()
        .select_only()
        .column_as(Expr::col(kambio::Column::AmountCents).sum(), "total")
        .filter(kambio::Column::UserId.eq(member_id))
        .into_tuple()
        .one(conn)
        .await?;
    Ok(total.flatten().unwrap_or(0))
}

/// Sum of the member's non-refunded contributions on `active` requests.
pub async fn committed_cents<C>(conn: &C, member_id: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    let pledges = PoolContribution::find()
        .inner_join(PoolRequest)
        .filter(pool_contribution::Column::UserId.eq(member_id))
        .filter(pool_contribution::Column::IsRefunded.eq(false))
        .filter(pool_request::Column::Status.eq(RequestStatus::Active))
        .all(conn)
        .await?;
    Ok(pledges.iter().map(|c| c.amount_cents).sum())
}
