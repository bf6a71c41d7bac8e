//! Contribution Allocator - how much a member may and should put into a request.
//!
//! The cap: a member's non-refunded contributions on active requests may never
//! exceed `contribution_cap_percent` of their savings (available plus what is
//! already pledged). With nothing pledged this is exactly
//! `floor2(available * cap%)`; with earlier pledges the remaining headroom shrinks
//! accordingly.

use crate::{
    core::{
        PoolRules,
        balance::{self, MemberSavings},
        money,
        request::{ensure_active, load_request},
    },
    entities::{RequestStatus, pool_request},
    errors::{Error, Result},
};
use sea_orm::ConnectionTrait;

/// Result of `calculateContribution`, all in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContributionQuote {
    /// `min(remaining, max_possible)`
    pub suggested_cents: i64,
    /// Largest contribution the cap allows right now
    pub max_possible_cents: i64,
    /// What the request still needs
    pub remaining_cents: i64,
}

/// One member's slice of a proportional split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Share {
    /// Contributing member
    pub member_id: i64,
    /// Amount assigned to the member in cents
    pub amount_cents: i64,
}

/// Largest contribution `savings` allows under a `cap_percent` cap.
#[must_use]
pub fn max_possible_cents(savings: &MemberSavings, cap_percent: u8) -> i64 {
    let allowed_total = money::percent_of(savings.total_cents(), cap_percent);
    (allowed_total - savings.committed_cents)
        .min(money::percent_of(savings.available_cents, cap_percent))
        .max(0)
}

/// Builds the quote for `savings` against `request`.
///
/// # Errors
/// [`Error::ContributionUnavailable`] when the cap is below the minimum contribution.
pub fn quote(
    savings: &MemberSavings,
    request: &pool_request::Model,
    rules: &PoolRules,
) -> Result<ContributionQuote> {
    let remaining_cents = request.remaining_cents();
    let max_possible_cents = max_possible_cents(savings, rules.cap_percent);

    if max_possible_cents < rules.min_contribution_cents {
        return Err(Error::ContributionUnavailable {
            max_possible_cents,
            remaining_cents,
        });
    }

    Ok(ContributionQuote {
        suggested_cents: remaining_cents.min(max_possible_cents).max(0),
        max_possible_cents,
        remaining_cents,
    })
}

/// `calculateContribution(requestId, memberId)` read through `conn`.
pub async fn calculate_contribution<C>(
    conn: &C,
    rules: &PoolRules,
    request_id: i64,
    member_id: i64,
) -> Result<ContributionQuote>
where
    C: ConnectionTrait,
{
    let request = load_request(conn, request_id).await?;
    ensure_active(&request)?;
    ensure_not_requester(&request, member_id)?;
    let savings = balance::member_savings(conn, member_id).await?;
    quote(&savings, &request, rules)
}

/// Rejects a member acting as contributor on their own request.
pub fn ensure_not_requester(request: &pool_request::Model, member_id: i64) -> Result<()> {
    if request.user_id == member_id {
        return Err(Error::invalid_state(format!(
            "Member {member_id} cannot contribute to their own pool request {}",
            request.id
        )));
    }
    Ok(())
}

/// Splits `remaining_cents` equally across `caps` (`(member_id, max_possible)`),
/// never giving anyone more than their cap.
///
/// Members whose cap is below the equal share get their cap and the surplus is
/// shared among the rest. Leftover cents go one each to the lowest member ids.
/// The result is ordered by member id and sums to `min(remaining, Σ caps)`.
#[must_use]
pub fn proportional_shares(remaining_cents: i64, caps: &[(i64, i64)]) -> Vec<Share> {
    let mut open: Vec<(i64, i64)> = caps
        .iter()
        .copied()
        .filter(|&(_, cap)| cap > 0)
        .collect();
    open.sort_unstable_by_key(|&(member_id, _)| member_id);

    let mut shares: Vec<Share> = Vec::with_capacity(open.len());
    let mut left = remaining_cents.max(0);

    loop {
        if open.is_empty() || left == 0 {
            break;
        }
        let count = i64::try_from(open.len()).unwrap_or(i64::MAX);
        let equal = left / count;

        let (capped, uncapped): (Vec<_>, Vec<_>) =
            open.iter().copied().partition(|&(_, cap)| cap <= equal);

        if capped.is_empty() {
            let mut extra = left % count;
            for (member_id, _) in uncapped {
                let bonus = i64::from(extra > 0);
                extra -= bonus;
                shares.push(Share {
                    member_id,
                    amount_cents: equal + bonus,
                });
            }
            break;
        }

        for (member_id, cap) in capped {
            left -= cap;
            shares.push(Share {
                member_id,
                amount_cents: cap,
            });
        }
        open = uncapped;
    }

    shares.retain(|share| share.amount_cents > 0);
    shares.sort_unstable_by_key(|share| share.member_id);
    shares
}

/// Proportional split of what `request_id` still needs among every other member
/// able to contribute.
pub async fn distribution<C>(conn: &C, rules: &PoolRules, request_id: i64) -> Result<Vec<Share>>
where
    C: ConnectionTrait,
{
    let request = load_request(conn, request_id).await?;
    if request.status != RequestStatus::Active {
        return Ok(Vec::new());
    }

    let members = crate::core::member::list_members(conn).await?;
    let mut caps = Vec::with_capacity(members.len());
    for member in members.iter().filter(|m| m.id != request.user_id) {
        let savings = balance::member_savings(conn, member.id).await?;
        let cap = max_possible_cents(&savings, rules.cap_percent);
        if cap >= rules.min_contribution_cents {
            caps.push((member.id, cap));
        }
    }

    Ok(proportional_shares(request.remaining_cents(), &caps))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use chrono::Utc;

    fn savings(available_cents: i64, committed_cents: i64) -> MemberSavings {
        MemberSavings {
            member_id: 1,
            available_cents,
            committed_cents,
        }
    }

    fn request(amount_cents: i64, funded_cents: i64) -> pool_request::Model {
        pool_request::Model {
            id: 1,
            user_id: 99,
            amount_cents,
            funded_cents,
            description: "Need help with rent".to_string(),
            status: RequestStatus::Active,
            created_at: Utc::now(),
            completed_at: None,
            cancelled_at: None,
        }
    }

    fn shares(pairs: &[(i64, i64)]) -> Vec<Share> {
        pairs
            .iter()
            .map(|&(member_id, amount_cents)| Share {
                member_id,
                amount_cents,
            })
            .collect()
    }

    #[test]
    fn test_quote_member_with_100_on_request_needing_40() {
        let quote = quote(&savings(10_000, 0), &request(4_000, 0), &PoolRules::default()).unwrap();
        assert_eq!(
            quote,
            ContributionQuote {
                suggested_cents: 4_000,
                max_possible_cents: 5_000,
                remaining_cents: 4_000,
            }
        );
    }

    #[test]
    fn test_quote_suggests_cap_when_remaining_is_larger() {
        let quote = quote(&savings(3_000, 0), &request(10_000, 2_000), &PoolRules::default()).unwrap();
        assert_eq!(quote.remaining_cents, 8_000);
        assert_eq!(quote.max_possible_cents, 1_500);
        assert_eq!(quote.suggested_cents, 1_500);
    }

    #[test]
    fn test_max_possible_floors_to_cents() {
        assert_eq!(max_possible_cents(&savings(1_001, 0), 50), 500);
        assert_eq!(max_possible_cents(&savings(0, 0), 50), 0);
        assert_eq!(max_possible_cents(&savings(-300, 0), 50), 0);
    }

    #[test]
    fn test_max_possible_accounts_for_existing_pledges() {
        // Saved 100, pledged 30 already: 50 total allowed, 20 left.
        assert_eq!(max_possible_cents(&savings(7_000, 3_000), 50), 2_000);
        // Already at the cap.
        assert_eq!(max_possible_cents(&savings(5_000, 5_000), 50), 0);
    }

    #[test]
    fn test_quote_below_minimum_is_unavailable() {
        let result = quote(&savings(150, 0), &request(4_000, 0), &PoolRules::default());
        assert!(matches!(
            result,
            Err(Error::ContributionUnavailable {
                max_possible_cents: 75,
                remaining_cents: 4_000
            })
        ));
    }

    #[test]
    fn test_proportional_equal_split() {
        assert_eq!(
            proportional_shares(9_000, &[(3, 10_000), (1, 10_000), (2, 10_000)]),
            shares(&[(1, 3_000), (2, 3_000), (3, 3_000)])
        );
    }

    #[test]
    fn test_proportional_redistributes_capped_surplus() {
        // 100 over three members, one can only give 10: the other two split 90.
        assert_eq!(
            proportional_shares(10_000, &[(1, 1_000), (2, 8_000), (3, 8_000)]),
            shares(&[(1, 1_000), (2, 4_500), (3, 4_500)])
        );
    }

    #[test]
    fn test_proportional_leftover_cents_to_lowest_ids() {
        assert_eq!(
            proportional_shares(100, &[(7, 1_000), (5, 1_000), (6, 1_000)]),
            shares(&[(5, 34), (6, 33), (7, 33)])
        );
    }

    #[test]
    fn test_proportional_total_capacity_below_remaining() {
        let result = proportional_shares(10_000, &[(1, 1_000), (2, 2_000)]);
        assert_eq!(result, shares(&[(1, 1_000), (2, 2_000)]));
    }

    #[test]
    fn test_proportional_edge_cases() {
        assert!(proportional_shares(10_000, &[]).is_empty());
        assert!(proportional_shares(0, &[(1, 1_000)]).is_empty());
        assert_eq!(
            proportional_shares(1, &[(1, 1_000), (2, 1_000)]),
            shares(&[(1, 1)])
        );
    }

    #[tokio::test]
    async fn test_calculate_contribution_integration() -> Result<()> {
        let (db, service) = setup_service().await?;
        let requester = create_test_member(&db, "ana").await?;
        let contributor = create_test_member(&db, "luis").await?;
        give_savings(&db, contributor.id, 10_000).await?;
        let details = create_test_request(&service, requester.id, 4_000).await?;

        let quote =
            calculate_contribution(&db, service.rules(), details.request.id, contributor.id).await?;
        assert_eq!(quote.suggested_cents, 4_000);
        assert_eq!(quote.max_possible_cents, 5_000);
        assert_eq!(quote.remaining_cents, 4_000);

        let own = calculate_contribution(&db, service.rules(), details.request.id, requester.id).await;
        assert!(matches!(own, Err(Error::InvalidState { .. })));

        let missing = calculate_contribution(&db, service.rules(), 999, contributor.id).await;
        assert!(matches!(missing, Err(Error::RequestNotFound { id: 999 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_distribution_skips_requester_and_broke_members() -> Result<()> {
        let (db, service) = setup_service().await?;
        let requester = create_test_member(&db, "ana").await?;
        let rich = create_test_member(&db, "luis").await?;
        let modest = create_test_member(&db, "marta").await?;
        let broke = create_test_member(&db, "pablo").await?;
        give_savings(&db, requester.id, 50_000).await?;
        give_savings(&db, rich.id, 40_000).await?;
        give_savings(&db, modest.id, 2_000).await?;
        give_savings(&db, broke.id, 100).await?;
        let details = create_test_request(&service, requester.id, 6_000).await?;

        let split = distribution(&db, service.rules(), details.request.id).await?;
        assert_eq!(
            split,
            vec![
                Share {
                    member_id: rich.id,
                    amount_cents: 5_000
                },
                Share {
                    member_id: modest.id,
                    amount_cents: 1_000
                },
            ]
        );
        Ok(())
    }
}
