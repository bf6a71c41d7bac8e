//! Kambio logging - a member records an avoided purchase as savings.

use crate::{
    core::{
        PoolService, goal,
        ledger::{self, NewEntry},
        locks::LockKey,
        money,
        retry::with_retry,
        savings,
    },
    entities::{KambioKind, kambio},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{info, instrument};

/// A savings event as submitted by a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewKambio {
    /// Amount saved, must be positive
    pub amount: Decimal,
    /// What the member did not buy
    pub description: String,
    /// Goal the saving is earmarked for
    pub goal_id: Option<i64>,
}

impl PoolService {
    /// Appends a `save` credit and bumps the member's monthly aggregate.
    ///
    /// Holds the member lock, so it serializes with goal completion and
    /// contributions by the same member.
    ///
    /// # Errors
    /// [`Error::Validation`] for a non-positive amount or empty description,
    /// [`Error::MemberNotFound`], [`Error::GoalNotFound`] for a goal the member does not
    /// own, and [`Error::InvalidState`] if that goal is already completed.
    #[instrument(skip(self, input))]
    pub async fn log_kambio(&self, member_id: i64, input: NewKambio) -> Result<kambio::Model> {
        let amount_cents = money::to_cents(input.amount, "amount")?;
        if amount_cents <= 0 {
            return Err(Error::validation("amount", "must be greater than zero"));
        }
        let description = input.description.trim();
        if description.is_empty() {
            return Err(Error::validation("description", "must not be empty"));
        }
        let goal_id = input.goal_id;

        with_retry(self.rules.retry, "log_kambio", move || {
            self.log_kambio_once(member_id, amount_cents, description, goal_id)
        })
        .await
    }

    async fn log_kambio_once(
        &self,
        member_id: i64,
        amount_cents: i64,
        description: &str,
        goal_id: Option<i64>,
    ) -> Result<kambio::Model> {
        let _member_guard = self.locks.acquire(LockKey::Member(member_id)).await;
        let txn = self.db.begin().await?;
        ledger::require_member(&txn, member_id).await?;
        if let Some(goal_id) = goal_id {
            let goal = goal::load_owned_goal(&txn, goal_id, member_id).await?;
            goal::ensure_open(&goal)?;
        }

        let entry = ledger::append_entry(
            &txn,
            NewEntry::new(member_id, KambioKind::Save, amount_cents, description)
                .with_goal(goal_id),
        )
        .await?;
        savings::record_saving(&txn, member_id, entry.created_at, amount_cents).await?;
        txn.commit().await?;

        info!(
            member_id,
            kambio_id = entry.id,
            "Logged kambio of ${}",
            money::format_cents(amount_cents)
        );
        Ok(entry)
    }
}

/// The member's full ledger, newest first.
pub async fn list_kambios(db: &DatabaseConnection, member_id: i64) -> Result<Vec<kambio::Model>> {
    ledger::require_member(db, member_id).await?;
    ledger::entries_for_member(db, member_id).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    use super::*;
    use crate::core::{balance::available_savings, goal::create_goal, savings::monthly_savings};
    use crate::test_utils::*;
    use rust_decimal_macros::dec;

    fn kambio(amount: Decimal, description: &str, goal_id: Option<i64>) -> NewKambio {
        NewKambio {
            amount,
            description: description.to_string(),
            goal_id,
        }
    }

    #[tokio::test]
    async fn test_log_kambio_credits_savings_and_aggregate() -> Result<()> {
        let (db, service) = setup_service().await?;
        let member = create_test_member(&db, "ana").await?;

        let entry = service.log_kambio(member.id, kambio(dec!(4.50), "Skipped coffee", None)).await?;
        assert_eq!(entry.amount_cents, 450);
        assert_eq!(entry.transaction_type, KambioKind::Save);
        service.log_kambio(member.id, kambio(dec!(12), "No takeout", None)).await?;

        assert_eq!(available_savings(&db, member.id).await?, 1_650);
        let months = monthly_savings(&db, member.id).await?;
        assert_eq!(months.len(), 1);
        assert_eq!(months[0].total_saved_cents, 1_650);
        assert_eq!(months[0].kambio_count, 2);

        let history = list_kambios(&db, member.id).await?;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].description, "No takeout");
        Ok(())
    }

    #[tokio::test]
    async fn test_log_kambio_validation() -> Result<()> {
        let (db, service) = setup_service().await?;
        let member = create_test_member(&db, "ana").await?;

        let zero = service.log_kambio(member.id, kambio(dec!(0), "Nothing", None)).await;
        assert!(matches!(zero, Err(Error::Validation { field, .. }) if field == "amount"));

        let blank = service.log_kambio(member.id, kambio(dec!(3), "   ", None)).await;
        assert!(matches!(blank, Err(Error::Validation { field, .. }) if field == "description"));

        let unknown = service.log_kambio(404, kambio(dec!(3), "Coffee", None)).await;
        assert!(matches!(unknown, Err(Error::MemberNotFound { id: 404 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_log_kambio_toward_goal() -> Result<()> {
        let (db, service) = setup_service().await?;
        let member = create_test_member(&db, "ana").await?;
        let other = create_test_member(&db, "luis").await?;
        let goal = create_goal(&db, member.id, "Bike", dec!(10)).await?;

        let entry = service.log_kambio(member.id, kambio(dec!(10), "Walked", Some(goal.id))).await?;
        assert_eq!(entry.goal_id, Some(goal.id));

        let foreign = service.log_kambio(other.id, kambio(dec!(1), "Walked", Some(goal.id))).await;
        assert!(matches!(foreign, Err(Error::GoalNotFound { .. })));

        service.complete_goal(goal.id, member.id, None).await?;
        let closed = service.log_kambio(member.id, kambio(dec!(1), "Walked", Some(goal.id))).await;
        assert!(matches!(closed, Err(Error::InvalidState { .. })));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_kambios_share_one_month_row() -> Result<()> {
        let (db, service) = setup_service().await?;
        let member = create_test_member(&db, "ana").await?;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            let member_id = member.id;
            handles.push(tokio::spawn(async move {
                service
                    .log_kambio(member_id, kambio(dec!(2.50), "Skipped a snack", None))
                    .await
            }));
        }
        for handle in handles {
            handle.await.expect("task panicked")?;
        }

        let months = monthly_savings(&db, member.id).await?;
        assert_eq!(months.len(), 1);
        assert_eq!(months[0].kambio_count, 8);
        assert_eq!(months[0].total_saved_cents, 2_000);
        assert_eq!(available_savings(&db, member.id).await?, 2_000);
        Ok(())
    }
}
