//! Goal business logic - personal savings targets and their completion.
//!
//! Completing a goal spends savings, so it runs under the member's lock like a
//! contribution does and checks the balance inside the same transaction as the
//! debit.

use crate::{
    core::{
        PoolService, balance,
        ledger::{self, NewEntry},
        locks::LockKey,
        money,
        retry::with_retry,
    },
    entities::{Goal, KambioKind, goal},
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Creates a goal for `member_id`.
pub async fn create_goal<C>(
    conn: &C,
    member_id: i64,
    name: &str,
    target: Decimal,
) -> Result<goal::Model>
where
    C: ConnectionTrait,
{
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("name", "must not be empty"));
    }
    let target_cents = money::to_cents(target, "targetAmount")?;
    if target_cents <= 0 {
        return Err(Error::validation("targetAmount", "must be greater than zero"));
    }
    ledger::require_member(conn, member_id).await?;

    goal::ActiveModel {
        user_id: Set(member_id),
        name: Set(name.to_string()),
        target_cents: Set(target_cents),
        completed_cents: Set(None),
        created_at: Set(Utc::now()),
        completed_at: Set(None),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(Into::into)
}

/// The member's goals, newest first.
pub async fn list_goals<C>(conn: &C, member_id: i64) -> Result<Vec<goal::Model>>
where
    C: ConnectionTrait,
{
    ledger::require_member(conn, member_id).await?;
    Goal::find()
        .filter(goal::Column::UserId.eq(member_id))
        .order_by_desc(goal::Column::Id)
        .all(conn)
        .await
        .map_err(Into::into)
}

/// Loads a goal owned by `member_id`. Other members' goals are reported as not found.
pub async fn load_owned_goal<C>(conn: &C, goal_id: i64, member_id: i64) -> Result<goal::Model>
where
    C: ConnectionTrait,
{
    Goal::find_by_id(goal_id)
        .one(conn)
        .await?
        .filter(|g| g.user_id == member_id)
        .ok_or(Error::GoalNotFound { id: goal_id })
}

/// Fails if the goal has already been completed.
pub fn ensure_open(goal: &goal::Model) -> Result<()> {
    if goal.completed_at.is_some() {
        return Err(Error::invalid_state(format!(
            "Goal '{}' is already completed",
            goal.name
        )));
    }
    Ok(())
}

impl PoolService {
    /// Completes a goal, spending `amount` (the target when omitted) from savings.
    ///
    /// # Errors
    /// - [`Error::GoalNotFound`] for an unknown or foreign goal
    /// - [`Error::InvalidState`] if the goal is already completed
    /// - [`Error::Validation`] for a non-positive amount
    /// - [`Error::InsufficientSavings`] if the member cannot cover the amount
    #[instrument(skip(self))]
    pub async fn complete_goal(
        &self,
        goal_id: i64,
        member_id: i64,
        amount: Option<Decimal>,
    ) -> Result<goal::Model> {
        let amount_cents = amount.map(|a| money::to_cents(a, "amount")).transpose()?;
        if amount_cents.is_some_and(|cents| cents <= 0) {
            return Err(Error::validation("amount", "must be greater than zero"));
        }

        with_retry(self.rules.retry, "complete_goal", move || {
            self.complete_goal_once(goal_id, member_id, amount_cents)
        })
        .await
    }

    async fn complete_goal_once(
        &self,
        goal_id: i64,
        member_id: i64,
        amount_cents: Option<i64>,
    ) -> Result<goal::Model> {
        let _member_guard = self.locks.acquire(LockKey::Member(member_id)).await;
        let txn = self.db.begin().await?;

        let goal = load_owned_goal(&txn, goal_id, member_id).await?;
        ensure_open(&goal)?;

        let spend_cents = amount_cents.unwrap_or(goal.target_cents);
        let available_cents = balance::available_savings(&txn, member_id).await?;
        if spend_cents > available_cents {
            return Err(Error::InsufficientSavings {
                available_cents,
                required_cents: spend_cents,
            });
        }

        ledger::append_entry(
            &txn,
            NewEntry::new(
                member_id,
                KambioKind::CompleteGoal,
                spend_cents,
                format!("Completed goal: {}", goal.name),
            )
            .with_goal(Some(goal_id)),
        )
        .await?;

        let mut completed: goal::ActiveModel = goal.into();
        completed.completed_cents = Set(Some(spend_cents));
        completed.completed_at = Set(Some(Utc::now()));
        let completed = completed.update(&txn).await?;
        txn.commit().await?;

        info!(
            goal_id,
            member_id,
            "Completed goal, spent ${}",
            money::format_cents(spend_cents)
        );
        Ok(completed)
    }
}
