//! Database configuration module for the pool service.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so foreign keys and their referential actions
//! come straight from the entity relations. Creation is idempotent, which lets the
//! service run it on every start.

use crate::entities::{
    Goal, IdempotencyKey, Kambio, Member, PoolContribution, PoolRequest, UserSavings, user_savings,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, TableCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/kambio.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database at `database_url`.
///
/// For file-backed `SQLite` URLs the parent directory is created first so a fresh
/// checkout can start without manual setup.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    if let Some(parent) = sqlite_file_parent(database_url) {
        std::fs::create_dir_all(parent)?;
    }
    debug!("Connecting to database at {database_url}");
    Ok(Database::connect(database_url).await?)
}

fn sqlite_file_parent(database_url: &str) -> Option<&Path> {
    let path = database_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next()?;
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Path::new(path).parent().filter(|p| !p.as_os_str().is_empty())
}

/// Creates all tables (and the monthly savings uniqueness index) if missing.
///
/// Order matters: referenced tables come before the tables pointing at them.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let tables: [TableCreateStatement; 7] = [
        schema.create_table_from_entity(Member),
        schema.create_table_from_entity(Goal),
        schema.create_table_from_entity(PoolRequest),
        schema.create_table_from_entity(PoolContribution),
        schema.create_table_from_entity(Kambio),
        schema.create_table_from_entity(UserSavings),
        schema.create_table_from_entity(IdempotencyKey),
    ];

    for mut table in tables {
        table.if_not_exists();
        db.execute(builder.build(&table)).await?;
    }

    let period_index = Index::create()
        .name("idx_user_savings_period")
        .table(UserSavings)
        .col(user_savings::Column::UserId)
        .col(user_savings::Column::Month)
        .col(user_savings::Column::Year)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&period_index)).await?;

    info!("Database schema is up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::{
        goal::Model as GoalModel, kambio::Model as KambioModel, member::Model as MemberModel,
        pool_contribution::Model as PoolContributionModel,
        pool_request::Model as PoolRequestModel, user_savings::Model as UserSavingsModel,
    };
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<MemberModel> = Member::find().limit(1).all(&db).await?;
        let _: Vec<GoalModel> = Goal::find().limit(1).all(&db).await?;
        let _: Vec<PoolRequestModel> = PoolRequest::find().limit(1).all(&db).await?;
        let _: Vec<PoolContributionModel> = PoolContribution::find().limit(1).all(&db).await?;
        let _: Vec<KambioModel> = Kambio::find().limit(1).all(&db).await?;
        let _: Vec<UserSavingsModel> = UserSavings::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[test]
    fn test_sqlite_file_parent() {
        assert_eq!(
            sqlite_file_parent("sqlite://data/kambio.sqlite?mode=rwc"),
            Some(Path::new("data"))
        );
        assert_eq!(sqlite_file_parent("sqlite::memory:"), None);
        assert_eq!(sqlite_file_parent("sqlite://kambio.sqlite"), None);
        assert_eq!(sqlite_file_parent("postgres://localhost/db"), None);
    }
}
