//! Request Lifecycle Manager - pool requests from creation to `completed`/`cancelled`.
//!
//! ```text
//! active ──(funded == requested)──> completed
//!    └────(deleted by owner)──────> cancelled
//! ```
//!
//! Every mutation runs under the request's lock (and the contributor's lock for
//! contributions) inside one database transaction, and the funded amount is
//! written with a compare-and-set on the value read in that transaction. Two
//! contributions can therefore never both see the same `remaining`, and a
//! contribution racing a delete either lands before the refund (and is refunded)
//! or finds the request no longer active.

use crate::{
    core::{
        PoolService, allocator, balance, idempotency,
        ledger::{self, NewEntry},
        locks::LockKey,
        money,
        refund::{self, RefundSummary},
        retry::with_retry,
    },
    entities::{
        KambioKind, Member, PoolContribution, PoolRequest, RequestStatus, pool_contribution,
        pool_request,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{debug, info, instrument};

/// A request with everything the client shows next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDetails {
    /// The request row
    pub request: pool_request::Model,
    /// Name of the requesting member
    pub requester_name: String,
    /// All contributions, refunded ones included, oldest first
    pub contributions: Vec<pool_contribution::Model>,
}

/// A contribution together with the request it went to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionRecord {
    /// The contribution row
    pub contribution: pool_contribution::Model,
    /// The request it funds
    pub request: pool_request::Model,
}

/// Loads a request or fails with [`Error::RequestNotFound`].
pub async fn load_request<C>(conn: &C, request_id: i64) -> Result<pool_request::Model>
where
    C: ConnectionTrait,
{
    PoolRequest::find_by_id(request_id)
        .one(conn)
        .await?
        .ok_or(Error::RequestNotFound { id: request_id })
}

/// Fails with a state conflict unless the request accepts contributions.
pub fn ensure_active(request: &pool_request::Model) -> Result<()> {
    if request.status != RequestStatus::Active {
        return Err(Error::invalid_state(format!(
            "Pool request {} is {:?}, not active",
            request.id, request.status
        )));
    }
    Ok(())
}

/// Attaches requester name and contributions to a request.
pub async fn load_details<C>(conn: &C, request: pool_request::Model) -> Result<RequestDetails>
where
    C: ConnectionTrait,
{
    let requester_name = Member::find_by_id(request.user_id)
        .one(conn)
        .await?
        .map(|m| m.name)
        .ok_or(Error::MemberNotFound {
            id: request.user_id,
        })?;

    let contributions = PoolContribution::find()
        .filter(pool_contribution::Column::PoolRequestId.eq(request.id))
        .order_by_asc(pool_contribution::Column::Id)
        .all(conn)
        .await?;

    Ok(RequestDetails {
        request,
        requester_name,
        contributions,
    })
}

/// Loads a request with its details.
pub async fn get_request_details<C>(conn: &C, request_id: i64) -> Result<RequestDetails>
where
    C: ConnectionTrait,
{
    let request = load_request(conn, request_id).await?;
    load_details(conn, request).await
}

/// Requests in `status`, newest first.
pub async fn list_requests_by_status<C>(
    conn: &C,
    status: RequestStatus,
) -> Result<Vec<RequestDetails>>
where
    C: ConnectionTrait,
{
    let requests = PoolRequest::find()
        .filter(pool_request::Column::Status.eq(status))
        .order_by_desc(pool_request::Column::Id)
        .all(conn)
        .await?;
    with_details(conn, requests).await
}

/// Requests made by `member_id`, newest first.
pub async fn list_requests_for_member<C>(conn: &C, member_id: i64) -> Result<Vec<RequestDetails>>
where
    C: ConnectionTrait,
{
    ledger::require_member(conn, member_id).await?;
    let requests = PoolRequest::find()
        .filter(pool_request::Column::UserId.eq(member_id))
        .order_by_desc(pool_request::Column::Id)
        .all(conn)
        .await?;
    with_details(conn, requests).await
}

async fn with_details<C>(conn: &C, requests: Vec<pool_request::Model>) -> Result<Vec<RequestDetails>>
where
    C: ConnectionTrait,
{
    let mut details = Vec::with_capacity(requests.len());
    for request in requests {
        details.push(load_details(conn, request).await?);
    }
    Ok(details)
}

/// Contributions made by `member_id`, newest first.
pub async fn list_contributions_for_member<C>(
    conn: &C,
    member_id: i64,
) -> Result<Vec<ContributionRecord>>
where
    C: ConnectionTrait,
{
    ledger::require_member(conn, member_id).await?;
    let rows = PoolContribution::find()
        .filter(pool_contribution::Column::UserId.eq(member_id))
        .order_by_desc(pool_contribution::Column::Id)
        .find_also_related(PoolRequest)
        .all(conn)
        .await?;

    rows.into_iter()
        .map(|(contribution, request)| {
            let request = request.ok_or(Error::RequestNotFound {
                id: contribution.pool_request_id,
            })?;
            Ok(ContributionRecord {
                contribution,
                request,
            })
        })
        .collect()
}

/// Checks that the request's funded amount matches its active contributions and
/// stays within the requested amount.
pub async fn verify_funding<C>(conn: &C, request_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let request = load_request(conn, request_id).await?;
    let active_cents: i64 = PoolContribution::find()
        .filter(pool_contribution::Column::PoolRequestId.eq(request_id))
        .filter(pool_contribution::Column::IsRefunded.eq(false))
        .all(conn)
        .await?
        .iter()
        .map(|c| c.amount_cents)
        .sum();

    let exact_when_completed =
        request.status != RequestStatus::Completed || request.funded_cents == request.amount_cents;

    if active_cents != request.funded_cents
        || request.funded_cents > request.amount_cents
        || request.funded_cents < 0
        || !exact_when_completed
    {
        return Err(Error::InvariantViolation {
            message: format!(
                "pool request {request_id}: funded {} / requested {} / active contributions {} ({:?})",
                request.funded_cents, request.amount_cents, active_cents, request.status
            ),
        });
    }
    Ok(())
}

impl PoolService {
    /// `createRequest(memberId, amount, description)`.
    ///
    /// # Errors
    /// [`Error::Validation`] if the amount is below the configured minimum or the
    /// description is too short; [`Error::MemberNotFound`] for an unknown member.
    #[instrument(skip(self, description))]
    pub async fn create_request(
        &self,
        member_id: i64,
        amount: Decimal,
        description: &str,
        idempotency_key: Option<&str>,
    ) -> Result<RequestDetails> {
        let amount_cents = money::to_cents(amount, "amount")?;
        if amount_cents < self.rules.min_request_cents {
            return Err(Error::validation(
                "amount",
                format!(
                    "must be at least ${}",
                    money::format_cents(self.rules.min_request_cents)
                ),
            ));
        }

        let description = description.trim();
        if description.chars().count() < self.rules.min_description_length {
            return Err(Error::validation(
                "description",
                format!(
                    "must be at least {} characters",
                    self.rules.min_description_length
                ),
            ));
        }

        with_retry(self.rules.retry, "create_request", move || {
            self.create_request_once(member_id, amount_cents, description, idempotency_key)
        })
        .await
    }

    async fn create_request_once(
        &self,
        member_id: i64,
        amount_cents: i64,
        description: &str,
        idempotency_key: Option<&str>,
    ) -> Result<RequestDetails> {
        let txn = self.db.begin().await?;
        ledger::require_member(&txn, member_id).await?;

        if let Some(existing) =
            idempotency::find_replay(&txn, idempotency_key, member_id, idempotency::CREATE_REQUEST)
                .await?
        {
            let details = get_request_details(&txn, existing).await?;
            txn.commit().await?;
            debug!(request_id = existing, "Replayed create_request");
            return Ok(details);
        }

        let request = pool_request::ActiveModel {
            user_id: Set(member_id),
            amount_cents: Set(amount_cents),
            funded_cents: Set(0),
            description: Set(description.to_string()),
            status: Set(RequestStatus::Active),
            created_at: Set(Utc::now()),
            completed_at: Set(None),
            cancelled_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        idempotency::remember(
            &txn,
            idempotency_key,
            member_id,
            idempotency::CREATE_REQUEST,
            request.id,
        )
        .await?;
        let details = load_details(&txn, request).await?;
        txn.commit().await?;

        info!(
            request_id = details.request.id,
            member_id,
            "Created pool request for ${}",
            money::format_cents(amount_cents)
        );
        Ok(details)
    }

    /// `contribute(requestId, memberId, amount)`. Without an amount the suggested
    /// contribution is used.
    ///
    /// Request state, remaining amount and the member's cap are all re-derived
    /// inside the transaction; nothing the client read earlier is trusted.
    ///
    /// # Errors
    /// - [`Error::Validation`] for a non-positive amount
    /// - [`Error::RequestNotFound`] / [`Error::MemberNotFound`]
    /// - [`Error::InvalidState`] if the request is not active or is the member's own
    /// - [`Error::ContributionUnavailable`] if the member's cap is below the minimum
    /// - [`Error::CapExceeded`] if the amount exceeds the cap or what is remaining
    #[instrument(skip(self))]
    pub async fn contribute(
        &self,
        request_id: i64,
        member_id: i64,
        amount: Option<Decimal>,
        idempotency_key: Option<&str>,
    ) -> Result<RequestDetails> {
        let amount_cents = amount.map(|a| money::to_cents(a, "amount")).transpose()?;
        if amount_cents.is_some_and(|cents| cents <= 0) {
            return Err(Error::validation("amount", "must be greater than zero"));
        }

        with_retry(self.rules.retry, "contribute", move || {
            self.contribute_once(request_id, member_id, amount_cents, idempotency_key)
        })
        .await
    }

    async fn contribute_once(
        &self,
        request_id: i64,
        member_id: i64,
        amount_cents: Option<i64>,
        idempotency_key: Option<&str>,
    ) -> Result<RequestDetails> {
        let _request_guard = self.locks.acquire(LockKey::Request(request_id)).await;
        let _member_guard = self.locks.acquire(LockKey::Member(member_id)).await;
        let txn = self.db.begin().await?;

        if let Some(replayed) =
            idempotency::find_replay(&txn, idempotency_key, member_id, idempotency::CONTRIBUTE)
                .await?
        {
            if replayed != request_id {
                return Err(Error::validation(
                    "idempotency_key",
                    "already used for another pool request",
                ));
            }
            let details = get_request_details(&txn, request_id).await?;
            txn.commit().await?;
            debug!(request_id, member_id, "Replayed contribute");
            return Ok(details);
        }

        let request = load_request(&txn, request_id).await?;
        ensure_active(&request)?;
        allocator::ensure_not_requester(&request, member_id)?;

        let savings = balance::member_savings(&txn, member_id).await?;
        let quote = allocator::quote(&savings, &request, &self.rules)?;
        let amount_cents = amount_cents.unwrap_or(quote.suggested_cents);
        if amount_cents > quote.remaining_cents || amount_cents > quote.max_possible_cents {
            return Err(Error::CapExceeded {
                attempted_cents: amount_cents,
                max_possible_cents: quote.max_possible_cents,
                remaining_cents: quote.remaining_cents,
            });
        }

        let now = Utc::now();
        let contribution = pool_contribution::ActiveModel {
            user_id: Set(member_id),
            pool_request_id: Set(request_id),
            amount_cents: Set(amount_cents),
            is_refunded: Set(false),
            created_at: Set(now),
            refunded_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        ledger::append_entry(
            &txn,
            NewEntry::new(
                member_id,
                KambioKind::PoolContribution,
                amount_cents,
                format!("Contribution to pool request #{request_id}"),
            )
            .with_request(request_id)
            .with_contribution(contribution.id),
        )
        .await?;

        let funded_cents = request.funded_cents + amount_cents;
        let completes = funded_cents == request.amount_cents;

        let mut update = PoolRequest::update_many()
            .col_expr(pool_request::Column::FundedCents, Expr::value(funded_cents))
            .filter(pool_request::Column::Id.eq(request_id))
            .filter(pool_request::Column::Status.eq(RequestStatus::Active))
            .filter(pool_request::Column::FundedCents.eq(request.funded_cents));
        if completes {
            update = update
                .col_expr(
                    pool_request::Column::Status,
                    Expr::value(RequestStatus::Completed),
                )
                .col_expr(pool_request::Column::CompletedAt, Expr::value(now));
        }
        if update.exec(&txn).await?.rows_affected != 1 {
            return Err(Error::Concurrency {
                message: format!("pool request {request_id} changed during contribution"),
            });
        }

        verify_funding(&txn, request_id).await?;

        if completes {
            ledger::append_entry(
                &txn,
                NewEntry::new(
                    request.user_id,
                    KambioKind::PoolReceive,
                    request.amount_cents,
                    format!("Payout for pool request #{request_id}"),
                )
                .with_request(request_id),
            )
            .await?;
        }

        idempotency::remember(
            &txn,
            idempotency_key,
            member_id,
            idempotency::CONTRIBUTE,
            request_id,
        )
        .await?;
        let details = get_request_details(&txn, request_id).await?;
        txn.commit().await?;

        info!(
            request_id,
            member_id,
            contribution_id = contribution.id,
            "Contributed ${} ({} of {} funded)",
            money::format_cents(amount_cents),
            money::format_cents(funded_cents),
            money::format_cents(request.amount_cents)
        );
        if completes {
            info!(
                request_id,
                requester_id = request.user_id,
                "Pool request completed, paid out ${}",
                money::format_cents(request.amount_cents)
            );
        }
        Ok(details)
    }

    /// `deleteRequest(requestId, requesterId)`: refunds every contribution and
    /// cancels the request, atomically.
    ///
    /// # Errors
    /// - [`Error::RequestNotFound`]
    /// - [`Error::NotRequestOwner`] if `requester_id` did not create the request
    /// - [`Error::InvalidState`] if the request is already completed or cancelled
    #[instrument(skip(self))]
    pub async fn delete_request(&self, request_id: i64, requester_id: i64) -> Result<RefundSummary> {
        with_retry(self.rules.retry, "delete_request", move || {
            self.delete_request_once(request_id, requester_id)
        })
        .await
    }

    async fn delete_request_once(&self, request_id: i64, requester_id: i64) -> Result<RefundSummary> {
        let _request_guard = self.locks.acquire(LockKey::Request(request_id)).await;
        let txn = self.db.begin().await?;

        let request = load_request(&txn, request_id).await?;
        if request.user_id != requester_id {
            return Err(Error::NotRequestOwner {
                request_id,
                member_id: requester_id,
            });
        }
        if request.status != RequestStatus::Active {
            return Err(Error::invalid_state(format!(
                "Pool request {request_id} is {:?} and can no longer be deleted",
                request.status
            )));
        }

        let mut summary = refund::refund_contributions(&txn, &request).await?;

        let mut cancelled: pool_request::ActiveModel = request.into();
        cancelled.status = Set(RequestStatus::Cancelled);
        cancelled.funded_cents = Set(0);
        cancelled.cancelled_at = Set(Some(Utc::now()));
        cancelled.update(&txn).await?;

        verify_funding(&txn, request_id).await?;
        txn.commit().await?;

        summary.status = RequestStatus::Cancelled;
        info!(
            request_id,
            refunds = summary.refunds.len(),
            "Cancelled pool request, refunded ${}",
            money::format_cents(summary.total_refunded_cents())
        );
        Ok(summary)
    }

    /// Read-only `calculateContribution` against the live database.
    pub async fn calculate_contribution(
        &self,
        request_id: i64,
        member_id: i64,
    ) -> Result<allocator::ContributionQuote> {
        allocator::calculate_contribution(&self.db, &self.rules, request_id, member_id).await
    }

    /// Proportional split of what `request_id` still needs.
    pub async fn distribution(&self, request_id: i64) -> Result<Vec<allocator::Share>> {
        allocator::distribution(&self.db, &self.rules, request_id).await
    }
}
