//! Member business logic - registration, seeding and lookups.

use crate::{
    config::MemberSeed,
    core::balance::{self, MemberSavings},
    entities::{Member, member},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{info, warn};

/// A member together with their current savings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSummary {
    /// The member
    pub member: member::Model,
    /// Savings derived from the ledger
    pub savings: MemberSavings,
}

/// Registers a new member. Names are trimmed and must be unique.
pub async fn create_member<C>(conn: &C, name: &str) -> Result<member::Model>
where
    C: ConnectionTrait,
{
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("name", "must not be empty"));
    }

    if get_member_by_name(conn, name).await?.is_some() {
        return Err(Error::validation("name", format!("'{name}' is already taken")));
    }

    let member = member::ActiveModel {
        name: Set(name.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    member.insert(conn).await.map_err(Into::into)
}

/// Finds a member by exact name.
pub async fn get_member_by_name<C>(conn: &C, name: &str) -> Result<Option<member::Model>>
where
    C: ConnectionTrait,
{
    Member::find()
        .filter(member::Column::Name.eq(name))
        .one(conn)
        .await
        .map_err(Into::into)
}

/// All members ordered by id.
pub async fn list_members<C>(conn: &C) -> Result<Vec<member::Model>>
where
    C: ConnectionTrait,
{
    Member::find()
        .order_by_asc(member::Column::Id)
        .all(conn)
        .await
        .map_err(Into::into)
}

/// All members with their savings, ordered by id.
pub async fn list_members_with_savings<C>(conn: &C) -> Result<Vec<MemberSummary>>
where
    C: ConnectionTrait,
{
    let members = list_members(conn).await?;
    let mut summaries = Vec::with_capacity(members.len());
    for member in members {
        let savings = balance::member_savings(conn, member.id).await?;
        summaries.push(MemberSummary { member, savings });
    }
    Ok(summaries)
}

/// One member with savings.
pub async fn member_summary<C>(conn: &C, member_id: i64) -> Result<MemberSummary>
where
    C: ConnectionTrait,
{
    let member = crate::core::ledger::require_member(conn, member_id).await?;
    let savings = balance::member_savings(conn, member_id).await?;
    Ok(MemberSummary { member, savings })
}

/// Creates configured members that do not exist yet. Existing names are left alone.
pub async fn seed_members(db: &DatabaseConnection, seeds: &[MemberSeed]) -> Result<usize> {
    let mut created = 0;
    for seed in seeds {
        if get_member_by_name(db, seed.name.trim()).await?.is_some() {
            warn!("Member '{}' already exists. Skipping.", seed.name);
            continue;
        }
        create_member(db, &seed.name).await?;
        info!("Seeded member '{}'", seed.name);
        created += 1;
    }
    Ok(created)
}
