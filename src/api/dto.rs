//! JSON shapes of the HTTP API. Money leaves the service as decimal dollars.

use crate::{
    core::{
        allocator::{ContributionQuote, Share},
        balance::MemberSavings,
        member::MemberSummary,
        money::from_cents,
        refund::{Refund, RefundSummary},
        request::{ContributionRecord, RequestDetails},
        snapshot::PoolSnapshot,
    },
    entities::{
        KambioKind, RequestStatus, goal, kambio, member, pool_contribution, pool_request,
        user_savings,
    },
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateMemberBody {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    pub amount: Decimal,
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContributeBody {
    pub request_id: Option<i64>,
    pub amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKambioBody {
    pub amount: Decimal,
    pub description: String,
    #[serde(default)]
    pub goal_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoalBody {
    pub name: String,
    pub target_amount: Decimal,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CompleteGoalBody {
    pub amount: Option<Decimal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub id: i64,
    pub name: String,
    pub savings: Decimal,
    pub committed: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<MemberSummary> for MemberView {
    fn from(summary: MemberSummary) -> Self {
        Self {
            id: summary.member.id,
            name: summary.member.name,
            savings: from_cents(summary.savings.available_cents),
            committed: from_cents(summary.savings.committed_cents),
            created_at: summary.member.created_at,
        }
    }
}

impl From<member::Model> for MemberView {
    fn from(member: member::Model) -> Self {
        Self {
            id: member.id,
            name: member.name,
            savings: Decimal::ZERO,
            committed: Decimal::ZERO,
            created_at: member.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsView {
    pub available: Decimal,
    pub committed: Decimal,
    pub total: Decimal,
}

impl From<MemberSavings> for SavingsView {
    fn from(savings: MemberSavings) -> Self {
        Self {
            available: from_cents(savings.available_cents),
            committed: from_cents(savings.committed_cents),
            total: from_cents(savings.total_cents()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionView {
    pub id: i64,
    pub user_id: i64,
    pub pool_request_id: i64,
    pub amount: Decimal,
    pub is_refunded: bool,
    pub created_at: DateTime<Utc>,
    pub refunded_at: Option<DateTime<Utc>>,
}

impl From<pool_contribution::Model> for ContributionView {
    fn from(c: pool_contribution::Model) -> Self {
        Self {
            id: c.id,
            user_id: c.user_id,
            pool_request_id: c.pool_request_id,
            amount: from_cents(c.amount_cents),
            is_refunded: c.is_refunded,
            created_at: c.created_at,
            refunded_at: c.refunded_at,
        }
    }
}

/// A request without its contribution list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSummaryView {
    pub id: i64,
    pub user_id: i64,
    pub amount: Decimal,
    pub funded_amount: Decimal,
    pub remaining: Decimal,
    pub description: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl From<pool_request::Model> for RequestSummaryView {
    fn from(r: pool_request::Model) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            amount: from_cents(r.amount_cents),
            funded_amount: from_cents(r.funded_cents),
            remaining: from_cents(r.remaining_cents()),
            description: r.description,
            status: r.status,
            created_at: r.created_at,
            completed_at: r.completed_at,
            cancelled_at: r.cancelled_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestView {
    #[serde(flatten)]
    pub request: RequestSummaryView,
    pub requester_name: String,
    pub contributions: Vec<ContributionView>,
}

impl From<RequestDetails> for RequestView {
    fn from(details: RequestDetails) -> Self {
        Self {
            request: details.request.into(),
            requester_name: details.requester_name,
            contributions: details.contributions.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionRecordView {
    #[serde(flatten)]
    pub contribution: ContributionView,
    pub request: RequestSummaryView,
}

impl From<ContributionRecord> for ContributionRecordView {
    fn from(record: ContributionRecord) -> Self {
        Self {
            contribution: record.contribution.into(),
            request: record.request.into(),
        }
    }
}

/// `calculate-contribution` response; `amount` is the suggestion.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteView {
    pub amount: Decimal,
    pub max_possible: Decimal,
    pub remaining: Decimal,
}

impl From<ContributionQuote> for QuoteView {
    fn from(quote: ContributionQuote) -> Self {
        Self {
            amount: from_cents(quote.suggested_cents),
            max_possible: from_cents(quote.max_possible_cents),
            remaining: from_cents(quote.remaining_cents),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareView {
    pub member_id: i64,
    pub amount: Decimal,
}

impl From<Share> for ShareView {
    fn from(share: Share) -> Self {
        Self {
            member_id: share.member_id,
            amount: from_cents(share.amount_cents),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundView {
    pub contribution_id: i64,
    pub member_id: i64,
    pub amount: Decimal,
}

impl From<Refund> for RefundView {
    fn from(refund: Refund) -> Self {
        Self {
            contribution_id: refund.contribution_id,
            member_id: refund.member_id,
            amount: from_cents(refund.amount_cents),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundSummaryView {
    pub request_id: i64,
    pub status: RequestStatus,
    pub total_refunded: Decimal,
    pub refunds: Vec<RefundView>,
}

impl From<RefundSummary> for RefundSummaryView {
    fn from(summary: RefundSummary) -> Self {
        Self {
            request_id: summary.request_id,
            status: summary.status,
            total_refunded: from_cents(summary.total_refunded_cents()),
            refunds: summary.refunds.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotView {
    pub members: Vec<MemberView>,
    pub active_requests: Vec<RequestView>,
    pub completed_requests: Vec<RequestView>,
    pub user_savings: SavingsView,
}

impl From<PoolSnapshot> for SnapshotView {
    fn from(snapshot: PoolSnapshot) -> Self {
        Self {
            members: snapshot.members.into_iter().map(Into::into).collect(),
            active_requests: snapshot.active_requests.into_iter().map(Into::into).collect(),
            completed_requests: snapshot
                .completed_requests
                .into_iter()
                .map(Into::into)
                .collect(),
            user_savings: snapshot.user_savings.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KambioView {
    pub id: i64,
    pub amount: Decimal,
    pub transaction_type: KambioKind,
    pub description: String,
    pub goal_id: Option<i64>,
    pub pool_request_id: Option<i64>,
    pub pool_contribution_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<kambio::Model> for KambioView {
    fn from(k: kambio::Model) -> Self {
        Self {
            id: k.id,
            amount: from_cents(k.amount_cents),
            transaction_type: k.transaction_type,
            description: k.description,
            goal_id: k.goal_id,
            pool_request_id: k.pool_request_id,
            pool_contribution_id: k.pool_contribution_id,
            created_at: k.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalView {
    pub id: i64,
    pub name: String,
    pub target_amount: Decimal,
    pub completed_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<goal::Model> for GoalView {
    fn from(g: goal::Model) -> Self {
        Self {
            id: g.id,
            name: g.name,
            target_amount: from_cents(g.target_cents),
            completed_amount: g.completed_cents.map(from_cents),
            created_at: g.created_at,
            completed_at: g.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySavingsView {
    pub month: i32,
    pub year: i32,
    pub total_saved: Decimal,
    pub kambio_count: i32,
}

impl From<user_savings::Model> for MonthlySavingsView {
    fn from(row: user_savings::Model) -> Self {
        Self {
            month: row.month,
            year: row.year,
            total_saved: from_cents(row.total_saved_cents),
            kambio_count: row.kambio_count,
        }
    }
}
