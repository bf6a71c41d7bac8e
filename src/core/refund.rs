//! Refund/Reversal Engine - returns every pledge on a request to its contributor.
//!
//! A refund never touches the original `pool_contribution` debit. It appends a
//! `pool_refund` credit linked to the contribution and flips the contribution's
//! `is_refunded` flag, guarded on the flag still being unset, so a contribution can
//! be refunded at most once however often the engine runs.

use crate::{
    core::{
        PoolService,
        ledger::{self, NewEntry},
        locks::LockKey,
        money,
        request::{load_request, verify_funding},
        retry::with_retry,
    },
    entities::{KambioKind, PoolContribution, PoolRequest, RequestStatus, pool_contribution, pool_request},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{info, instrument};

/// One contribution handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refund {
    /// Refunded contribution
    pub contribution_id: i64,
    /// Member who got the money back
    pub member_id: i64,
    /// Amount returned in cents
    pub amount_cents: i64,
}

/// Outcome of a refund pass over one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundSummary {
    /// The request whose contributions were reversed
    pub request_id: i64,
    /// Request status after the pass
    pub status: RequestStatus,
    /// Contributions refunded by this pass (empty when nothing was pending)
    pub refunds: Vec<Refund>,
}

impl RefundSummary {
    /// Total handed back by this pass.
    #[must_use]
    pub fn total_refunded_cents(&self) -> i64 {
        self.refunds.iter().map(|r| r.amount_cents).sum()
    }
}

/// Refunds every non-refunded contribution on `request` and zeroes its funded
/// amount. Must run inside the caller's transaction and under the request lock.
pub async fn refund_contributions<C>(
    conn: &C,
    request: &pool_request::Model,
) -> Result<RefundSummary>
where
    C: ConnectionTrait,
{
    let pending = PoolContribution::find()
        .filter(pool_contribution::Column::PoolRequestId.eq(request.id))
        .filter(pool_contribution::Column::IsRefunded.eq(false))
        .order_by_asc(pool_contribution::Column::Id)
        .all(conn)
        .await?;

    let now = Utc::now();
    let mut refunds = Vec::with_capacity(pending.len());
    for contribution in pending {
        let flagged = PoolContribution::update_many()
            .col_expr(pool_contribution::Column::IsRefunded, Expr::value(true))
            .col_expr(pool_contribution::Column::RefundedAt, Expr::value(now))
            .filter(pool_contribution::Column::Id.eq(contribution.id))
            .filter(pool_contribution::Column::IsRefunded.eq(false))
            .exec(conn)
            .await?;
        if flagged.rows_affected != 1 {
            return Err(Error::Concurrency {
                message: format!("contribution {} was refunded concurrently", contribution.id),
            });
        }

        ledger::append_entry(
            conn,
            NewEntry::new(
                contribution.user_id,
                KambioKind::PoolRefund,
                contribution.amount_cents,
                format!("Refund from pool request #{}", request.id),
            )
            .with_request(request.id)
            .with_contribution(contribution.id),
        )
        .await?;

        refunds.push(Refund {
            contribution_id: contribution.id,
            member_id: contribution.user_id,
            amount_cents: contribution.amount_cents,
        });
    }

    PoolRequest::update_many()
        .col_expr(pool_request::Column::FundedCents, Expr::value(0_i64))
        .filter(pool_request::Column::Id.eq(request.id))
        .exec(conn)
        .await?;

    Ok(RefundSummary {
        request_id: request.id,
        status: request.status,
        refunds,
    })
}

impl PoolService {
    /// `refundAll(requestId)`: reverses every outstanding contribution on the
    /// request without changing its status.
    ///
    /// Idempotent on `active` and `cancelled` requests; a second call refunds
    /// nothing. Completed requests have paid out and cannot be refunded.
    ///
    /// # Errors
    /// [`Error::RequestNotFound`], or [`Error::InvalidState`] for a completed request.
    #[instrument(skip(self))]
    pub async fn refund_all(&self, request_id: i64) -> Result<RefundSummary> {
        with_retry(self.rules.retry, "refund_all", move || {
            self.refund_all_once(request_id)
        })
        .await
    }

    async fn refund_all_once(&self, request_id: i64) -> Result<RefundSummary> {
        let _request_guard = self.locks.acquire(LockKey::Request(request_id)).await;
        let txn = self.db.begin().await?;

        let request = load_request(&txn, request_id).await?;
        if request.status == RequestStatus::Completed {
            return Err(Error::invalid_state(format!(
                "Pool request {request_id} is completed and its contributions were paid out"
            )));
        }

        let summary = refund_contributions(&txn, &request).await?;
        verify_funding(&txn, request_id).await?;
        txn.commit().await?;

        if !summary.refunds.is_empty() {
            info!(
                request_id,
                refunds = summary.refunds.len(),
                "Refunded ${}",
                money::format_cents(summary.total_refunded_cents())
            );
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::balance::{available_savings, committed_cents};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_refund_all_restores_balances_and_keeps_request_active() -> Result<()> {
        let (db, service) = setup_service().await?;
        let requester = create_test_member(&db, "ana").await?;
        let first = create_test_member(&db, "luis").await?;
        let second = create_test_member(&db, "marta").await?;
        give_savings(&db, first.id, 10_000).await?;
        give_savings(&db, second.id, 4_000).await?;
        let details = create_test_request(&service, requester.id, 10_000).await?;
        contribute_cents(&service, details.request.id, first.id, 3_000).await?;
        contribute_cents(&service, details.request.id, second.id, 1_500).await?;

        let summary = service.refund_all(details.request.id).await?;
        assert_eq!(summary.status, RequestStatus::Active);
        assert_eq!(summary.total_refunded_cents(), 4_500);
        assert_eq!(summary.refunds.len(), 2);

        assert_eq!(available_savings(&db, first.id).await?, 10_000);
        assert_eq!(available_savings(&db, second.id).await?, 4_000);
        assert_eq!(committed_cents(&db, first.id).await?, 0);

        let request = load_request(&db, details.request.id).await?;
        assert_eq!(request.funded_cents, 0);
        assert_eq!(request.status, RequestStatus::Active);
        Ok(())
    }

    #[tokio::test]
    async fn test_refund_all_is_idempotent() -> Result<()> {
        let (db, service) = setup_service().await?;
        let requester = create_test_member(&db, "ana").await?;
        let contributor = create_test_member(&db, "luis").await?;
        give_savings(&db, contributor.id, 10_000).await?;
        let details = create_test_request(&service, requester.id, 10_000).await?;
        contribute_cents(&service, details.request.id, contributor.id, 2_500).await?;

        let first = service.refund_all(details.request.id).await?;
        let after_first = available_savings(&db, contributor.id).await?;
        let entries_after_first = ledger::entries_for_request(&db, details.request.id).await?;

        let second = service.refund_all(details.request.id).await?;
        assert_eq!(first.total_refunded_cents(), 2_500);
        assert!(second.refunds.is_empty());
        assert_eq!(available_savings(&db, contributor.id).await?, after_first);
        assert_eq!(
            ledger::entries_for_request(&db, details.request.id).await?,
            entries_after_first
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_refund_all_after_cancel_refunds_nothing() -> Result<()> {
        let (db, service) = setup_service().await?;
        let requester = create_test_member(&db, "ana").await?;
        let contributor = create_test_member(&db, "luis").await?;
        give_savings(&db, contributor.id, 10_000).await?;
        let details = create_test_request(&service, requester.id, 10_000).await?;
        contribute_cents(&service, details.request.id, contributor.id, 2_000).await?;
        service.delete_request(details.request.id, requester.id).await?;

        let summary = service.refund_all(details.request.id).await?;
        assert_eq!(summary.status, RequestStatus::Cancelled);
        assert!(summary.refunds.is_empty());
        assert_eq!(available_savings(&db, contributor.id).await?, 10_000);
        Ok(())
    }

    #[tokio::test]
    async fn test_refund_all_rejects_completed_request() -> Result<()> {
        let (db, service) = setup_service().await?;
        let requester = create_test_member(&db, "ana").await?;
        let contributor = create_test_member(&db, "luis").await?;
        give_savings(&db, contributor.id, 10_000).await?;
        let details = create_test_request(&service, requester.id, 1_000).await?;
        contribute_cents(&service, details.request.id, contributor.id, 1_000).await?;

        let result = service.refund_all(details.request.id).await;
        assert!(matches!(result, Err(Error::InvalidState { .. })));
        assert_eq!(available_savings(&db, requester.id).await?, 1_000);
        Ok(())
    }

    #[tokio::test]
    async fn test_refund_entries_link_to_contribution() -> Result<()> {
        let (db, service) = setup_service().await?;
        let requester = create_test_member(&db, "ana").await?;
        let contributor = create_test_member(&db, "luis").await?;
        give_savings(&db, contributor.id, 10_000).await?;
        let details = create_test_request(&service, requester.id, 10_000).await?;
        let funded = contribute_cents(&service, details.request.id, contributor.id, 700).await?;
        let contribution_id = funded.contributions[0].id;

        service.refund_all(details.request.id).await?;

        let entries = ledger::entries_for_request(&db, details.request.id).await?;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].transaction_type, KambioKind::PoolContribution);
        assert_eq!(entries[0].amount_cents, -700);
        assert_eq!(entries[1].transaction_type, KambioKind::PoolRefund);
        assert_eq!(entries[1].amount_cents, 700);
        assert_eq!(entries[1].pool_contribution_id, Some(contribution_id));

        let contribution = PoolContribution::find_by_id(contribution_id)
            .one(&db)
            .await?
            .unwrap();
        assert!(contribution.is_refunded);
        assert!(contribution.refunded_at.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_refund_all_unknown_request() -> Result<()> {
        let (_db, service) = setup_service().await?;
        let result = service.refund_all(404).await;
        assert!(matches!(result, Err(Error::RequestNotFound { id: 404 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_refund_pass_rolls_back_every_contribution() -> Result<()> {
        let (db, service) = setup_service().await?;
        let requester = create_test_member(&db, "ana").await?;
        let first = create_test_member(&db, "luis").await?;
        let second = create_test_member(&db, "marta").await?;
        give_savings(&db, first.id, 10_000).await?;
        give_savings(&db, second.id, 10_000).await?;
        let details = create_test_request(&service, requester.id, 10_000).await?;
        let request_id = details.request.id;
        contribute_cents(&service, request_id, first.id, 3_000).await?;
        contribute_cents(&service, request_id, second.id, 2_000).await?;

        // The first contribution is flagged and credited before the second credit fails
        db.execute_unprepared(&format!(
            "CREATE TRIGGER reject_refund BEFORE INSERT ON kambios \
             WHEN NEW.transaction_type = 'pool_refund' AND NEW.user_id = {} \
             BEGIN SELECT RAISE(ABORT, 'ledger unavailable'); END;",
            second.id
        ))
        .await?;

        let refund = service.refund_all(request_id).await;
        assert!(matches!(&refund, Err(err) if err.kind() == crate::errors::ErrorKind::Internal));
        let delete = service.delete_request(request_id, requester.id).await;
        assert!(delete.is_err());

        let contributions = PoolContribution::find()
            .filter(pool_contribution::Column::PoolRequestId.eq(request_id))
            .all(&db)
            .await?;
        assert_eq!(contributions.len(), 2);
        assert!(contributions.iter().all(|c| !c.is_refunded && c.refunded_at.is_none()));

        let request = load_request(&db, request_id).await?;
        assert_eq!(request.funded_cents, 5_000);
        assert_eq!(request.status, RequestStatus::Active);
        assert_eq!(available_savings(&db, first.id).await?, 7_000);
        assert_eq!(available_savings(&db, second.id).await?, 8_000);
        assert_eq!(ledger::entries_for_request(&db, request_id).await?.len(), 2);

        // Once the ledger accepts writes again the same pass goes through
        db.execute_unprepared("DROP TRIGGER reject_refund;").await?;
        let summary = service.refund_all(request_id).await?;
        assert_eq!(summary.total_refunded_cents(), 5_000);
        assert_eq!(available_savings(&db, second.id).await?, 10_000);
        Ok(())
    }
}
