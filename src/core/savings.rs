//! Monthly savings aggregate kept in `user_savings`.
//!
//! One row per member and calendar month (UTC). Only `save` entries count toward
//! the aggregate; pool movements and goal spending are not "saved" money.

use crate::{
    entities::{UserSavings, user_savings},
    errors::{Error, Result},
};
use chrono::{DateTime, Datelike, Utc};
use sea_orm::{QueryOrder, Set, SqlErr, prelude::*, sea_query::Expr};

/// Adds one logged saving of `amount_cents` made at `at` to the member's aggregate.
///
/// Runs inside the caller's transaction so the aggregate and the ledger row land
/// together.
pub async fn record_saving<C>(
    conn: &C,
    member_id: i64,
    at: DateTime<Utc>,
    amount_cents: i64,
) -> Result<user_savings::Model>
where
    C: ConnectionTrait,
{
    let month = i32::try_from(at.month()).unwrap_or(1);
    let year = at.year();

    let existing = UserSavings::find()
        .filter(user_savings::Column::UserId.eq(member_id))
        .filter(user_savings::Column::Month.eq(month))
        .filter(user_savings::Column::Year.eq(year))
        .one(conn)
        .await?;

    if let Some(row) = existing {
        // Atomic increment: total = total + amount, count = count + 1
        UserSavings::update_many()
            .col_expr(
                user_savings::Column::TotalSavedCents,
                Expr::col(user_savings::Column::TotalSavedCents).add(amount_cents),
            )
            .col_expr(
                user_savings::Column::KambioCount,
                Expr::col(user_savings::Column::KambioCount).add(1),
            )
            .col_expr(user_savings::Column::UpdatedAt, Expr::value(at))
            .filter(user_savings::Column::Id.eq(row.id))
            .exec(conn)
            .await?;

        return UserSavings::find_by_id(row.id)
            .one(conn)
            .await?
            .ok_or_else(|| Error::InvariantViolation {
                message: format!("user_savings row {} vanished during update", row.id),
            });
    }

    user_savings::ActiveModel {
        user_id: Set(member_id),
        month: Set(month),
        year: Set(year),
        total_saved_cents: Set(amount_cents),
        kambio_count: Set(1),
        updated_at: Set(at),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(|err| match err.sql_err() {
        // Another writer created the month row first; a retry takes the update path
        Some(SqlErr::UniqueConstraintViolation(_)) => Error::Concurrency {
            message: format!("monthly savings row for member {member_id} created concurrently"),
        },
        _ => err.into(),
    })
}

/// The member's monthly aggregates, most recent period first.
pub async fn monthly_savings<C>(conn: &C, member_id: i64) -> Result<Vec<user_savings::Model>>
where
    C: ConnectionTrait,
{
    crate::core::ledger::require_member(conn, member_id).await?;
    UserSavings::find()
        .filter(user_savings::Column::UserId.eq(member_id))
        .order_by_desc(user_savings::Column::Year)
        .order_by_desc(user_savings::Column::Month)
        .all(conn)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_record_saving_creates_then_increments() -> Result<()> {
        let (db, member) = setup_with_member("ana").await?;
        let march = Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap();
        let later_in_march = Utc.with_ymd_and_hms(2026, 3, 28, 9, 30, 0).unwrap();

        let first = record_saving(&db, member.id, march, 450).await?;
        assert_eq!(first.month, 3);
        assert_eq!(first.year, 2026);
        assert_eq!(first.total_saved_cents, 450);
        assert_eq!(first.kambio_count, 1);

        let second = record_saving(&db, member.id, later_in_march, 1_050).await?;
        assert_eq!(second.id, first.id);
        assert_eq!(second.total_saved_cents, 1_500);
        assert_eq!(second.kambio_count, 2);
        assert_eq!(second.updated_at, later_in_march);
        Ok(())
    }

    #[tokio::test]
    async fn test_monthly_savings_newest_period_first() -> Result<()> {
        let (db, member) = setup_with_member("ana").await?;
        let other = create_test_member(&db, "luis").await?;
        let december = Utc.with_ymd_and_hms(2025, 12, 20, 0, 0, 0).unwrap();
        let january = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        let february = Utc.with_ymd_and_hms(2026, 2, 2, 0, 0, 0).unwrap();

        record_saving(&db, member.id, january, 100).await?;
        record_saving(&db, member.id, december, 200).await?;
        record_saving(&db, member.id, february, 300).await?;
        record_saving(&db, other.id, february, 999).await?;

        let rows = monthly_savings(&db, member.id).await?;
        let periods: Vec<(i32, i32)> = rows.iter().map(|r| (r.year, r.month)).collect();
        assert_eq!(periods, vec![(2026, 2), (2026, 1), (2025, 12)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_monthly_savings_unknown_member() -> Result<()> {
        let db = setup_test_db().await?;
        let result = monthly_savings(&db, 7).await;
        assert!(matches!(result, Err(Error::MemberNotFound { id: 7 })));
        Ok(())
    }
}
